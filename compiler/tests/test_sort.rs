mod common;

use common::{assert_single_error, single_file};
use idlc::Compilation;
use idlc::flat::LibraryId;
use raw_ast::builder::FileBuilder;

fn names_in_order(compilation: &Compilation, library: LibraryId) -> Vec<String> {
    compilation
        .library(library)
        .declaration_order
        .iter()
        .map(|decl| compilation.decl(*decl).name.decl_name().to_string())
        .collect()
}

#[test]
fn test_inline_cycle_is_rejected() {
    let compilation = single_file(|f| {
        f.push(f.struct_decl("A", vec![f.struct_member(f.ty("B"), "b")]));
        f.push(f.struct_decl("B", vec![f.struct_member(f.ty("A"), "a")]));
    })
    .compile_err();

    let error = assert_single_error(
        &compilation,
        "E4006",
        "There is an includes-cycle in declarations",
    );
    assert_eq!(error.notes.len(), 1);
    assert!(error.notes[0].contains("example/A"), "note: {}", error.notes[0]);
    assert!(error.notes[0].contains("example/B"), "note: {}", error.notes[0]);
}

#[test]
fn test_nullable_reference_breaks_cycle() {
    let (compilation, library) = single_file(|f| {
        f.push(f.struct_decl("A", vec![f.struct_member(f.ty("B"), "b")]));
        f.push(f.struct_decl("B", vec![f.struct_member(f.ty("A").nullable(), "a")]));
    })
    .compile_ok();

    // A stores B inline, so B comes first.
    assert_eq!(names_in_order(&compilation, library), vec!["B", "A"]);
}

#[test]
fn test_self_reference_through_vector_is_a_cycle() {
    let compilation = single_file(|f| {
        let members = vec![
            f.struct_member(f.ty("uint32"), "value"),
            f.struct_member(f.ty("vector").with_arg(f.ty("Node")), "children"),
        ];
        f.push(f.struct_decl("Node", members));
    })
    .compile_err();

    // Only nullability takes the element out of the graph.
    let error = assert_single_error(&compilation, "E4006", "includes-cycle");
    assert!(error.notes[0].contains("example/Node -> example/Node"));
}

#[test]
fn test_self_reference_through_nullable_box() {
    let (compilation, _) = single_file(|f| {
        let members = vec![
            f.struct_member(f.ty("uint32"), "value"),
            f.struct_member(f.ty("Node").nullable(), "next"),
        ];
        f.push(f.struct_decl("Node", members));
        f.push(f.struct_decl("Leaf", vec![f.struct_member(f.ty("uint32"), "value")]));
    })
    .compile_ok();

    let node = compilation.find_decl("example", "Node").unwrap();
    assert!(compilation.decl(node).recursive);
    let leaf = compilation.find_decl("example", "Leaf").unwrap();
    assert!(!compilation.decl(leaf).recursive);

    let shape = compilation.typeshape(node);
    assert_eq!(shape.inline_size, 16);
    assert_eq!(shape.max_out_of_line, u32::MAX);
}

#[test]
fn test_protocol_references_create_no_edges() {
    let (compilation, library) = single_file(|f| {
        let method = f.method("Ping", Some(vec![f.param(f.ty("Holder"), "holder")]), None);
        f.push(f.protocol("Pinger", &[], vec![method]));
        f.push(f.struct_decl("Holder", vec![f.struct_member(f.ty("Pinger"), "pinger")]));
    })
    .compile_ok();

    let order = names_in_order(&compilation, library);
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("Holder") < position("Pinger_Ping_Request"));
    assert!(position("Pinger_Ping_Request") < position("Pinger"));
}

#[test]
fn test_constant_reference_orders_declarations() {
    let (compilation, library) = single_file(|f| {
        f.push(f.const_decl("A", f.ty("uint32"), f.const_ref("Z")));
        f.push(f.const_decl("Z", f.ty("uint32"), f.num("7")));
    })
    .compile_ok();

    assert_eq!(names_in_order(&compilation, library), vec!["Z", "A"]);
}

#[test]
fn test_order_is_topological_for_every_edge() {
    let (compilation, library) = single_file(|f| {
        f.push(f.struct_decl("Outer", vec![f.struct_member(f.ty("Middle"), "m")]));
        f.push(f.struct_decl(
            "Middle",
            vec![f.struct_member(f.ty("array").with_arg(f.ty("Inner")).with_size(f.num("2")), "i")],
        ));
        f.push(f.struct_decl("Inner", vec![f.struct_member(f.ty("Flags"), "flags")]));
        f.push(f.bits("Flags", None, vec![f.bits_member("A", f.num("1"))]));
        f.push(f.struct_decl("Loose", vec![f.struct_member(f.ty("uint8"), "x")]));
    })
    .compile_ok();

    let library_data = compilation.library(library);
    let order = &library_data.declaration_order;
    assert_eq!(order.len(), library_data.declarations.len());
    for (index, decl) in order.iter().enumerate() {
        for dependency in library_data.dependency_graph.get_direct_dependencies(*decl) {
            let dependency_index = library_data.order_of(dependency).unwrap();
            assert!(
                dependency_index < index,
                "{} must precede {}",
                compilation.decl(dependency).name,
                compilation.decl(*decl).name
            );
        }
    }
}

fn build_shuffled(f: &mut FileBuilder, reversed: bool) {
    let mut decls = vec!["Delta", "Alpha", "Charlie", "Bravo"];
    if reversed {
        decls.reverse();
    }
    for name in decls {
        let member = if name == "Alpha" {
            f.struct_member(f.ty("Charlie"), "c")
        } else {
            f.struct_member(f.ty("uint8"), "x")
        };
        f.push(f.struct_decl(name, vec![member]));
    }
}

#[test]
fn test_order_is_independent_of_declaration_order() {
    let (first, first_library) = single_file(|f| build_shuffled(f, false)).compile_ok();
    let (second, second_library) = single_file(|f| build_shuffled(f, true)).compile_ok();

    let first_order = names_in_order(&first, first_library);
    assert_eq!(first_order, names_in_order(&second, second_library));
    // Ties are broken by name.
    assert_eq!(first_order, vec!["Bravo", "Charlie", "Alpha", "Delta"]);
}
