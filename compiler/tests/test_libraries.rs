mod common;

use common::{assert_has_error, assert_single_error, TestWorkspace};
use idlc::flat::{DeclKind, Type};
use idlc::CompilationConfig;

/// `other.lib` with one struct and one enum
fn add_dependency(workspace: &mut TestWorkspace) {
    let mut f = workspace.file("other.fidl", "other.lib");
    f.push(f.struct_decl("Point", vec![f.struct_member(f.ty("int32"), "x")]));
    let members = vec![f.enum_member("RED", f.num("1")), f.enum_member("BLUE", f.num("2"))];
    f.push(f.enum_decl("Color", Some(f.ty("uint8")), members));
    workspace.add_library(vec![f.finish()]);
}

#[test]
fn test_imported_type_is_resolved() {
    let mut workspace = TestWorkspace::new();
    add_dependency(&mut workspace);
    let mut f = workspace.file("example.fidl", "example");
    f.using("other.lib");
    f.push(f.struct_decl("Line", vec![f.struct_member(f.ty("other.lib.Point"), "start")]));
    workspace.add_library(vec![f.finish()]);

    let (compilation, library) = workspace.compile_ok();
    let line = compilation.find_decl("example", "Line").unwrap();
    let point = compilation.find_decl("other.lib", "Point").unwrap();
    let member = &compilation.decl(line).as_struct().unwrap().members[0];
    assert!(matches!(
        compilation.type_of(member.type_ctor.type_id()),
        Type::Identifier { decl, .. } if *decl == point
    ));
    // Imported declarations are not part of this library's order.
    assert_eq!(compilation.library(library).declaration_order.len(), 1);
    assert!(compilation.library(library).dependency_libraries().any(|dependency| {
        compilation.library(dependency).name.to_string() == "other.lib"
    }));
}

#[test]
fn test_aliased_import_and_member_constant() {
    let mut workspace = TestWorkspace::new();
    add_dependency(&mut workspace);
    let mut f = workspace.file("example.fidl", "example");
    f.using_as("other.lib", "other");
    f.push(f.const_decl("FAVORITE", f.ty("other.Color"), f.const_ref("other.Color.BLUE")));
    workspace.add_library(vec![f.finish()]);

    let (compilation, _) = workspace.compile_ok();
    let favorite = compilation.find_decl("example", "FAVORITE").unwrap();
    let constant = &compilation.decl(favorite).as_const().unwrap().value;
    assert_eq!(constant.value().as_u64(), Some(2));
}

#[test]
fn test_unused_import_names_the_library() {
    let mut workspace = TestWorkspace::new();
    add_dependency(&mut workspace);
    let mut f = workspace.file("example.fidl", "example");
    f.using("other.lib");
    f.push(f.struct_decl("Lonely", vec![f.struct_member(f.ty("bool"), "b")]));
    workspace.add_library(vec![f.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(
        &compilation,
        "E9003",
        "Library example imports other.lib but does not use it. Either use other.lib, or remove import.",
    );
}

#[test]
fn test_unused_import_check_can_be_disabled() {
    let config = CompilationConfig {
        verify_unused_imports: false,
        ..CompilationConfig::default()
    };
    let mut workspace = TestWorkspace::new().with_config(config);
    add_dependency(&mut workspace);
    let mut f = workspace.file("example.fidl", "example");
    f.using("other.lib");
    f.push(f.struct_decl("Lonely", vec![f.struct_member(f.ty("bool"), "b")]));
    workspace.add_library(vec![f.finish()]);

    workspace.compile_ok();
}

#[test]
fn test_imports_are_per_file() {
    let mut workspace = TestWorkspace::new();
    add_dependency(&mut workspace);
    let mut first = workspace.file("first.fidl", "example");
    first.using("other.lib");
    first.push(first.struct_decl("A", vec![first.struct_member(first.ty("other.lib.Point"), "p")]));
    let second = {
        let mut f = workspace.file("second.fidl", "example");
        f.push(f.struct_decl("B", vec![f.struct_member(f.ty("other.lib.Point"), "p")]));
        f
    };
    workspace.add_library(vec![first.finish(), second.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(
        &compilation,
        "E1002",
        "unknown dependent library other.lib; did you forget `using`?",
    );
}

#[test]
fn test_unknown_library_import() {
    let mut workspace = TestWorkspace::new();
    let mut f = workspace.file("example.fidl", "example");
    f.using("does.not.exist");
    workspace.add_library(vec![f.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(&compilation, "E1003", "could not find library named does.not.exist");
}

#[test]
fn test_duplicate_import() {
    let mut workspace = TestWorkspace::new();
    add_dependency(&mut workspace);
    let mut f = workspace.file("example.fidl", "example");
    f.using("other.lib");
    f.using("other.lib");
    f.push(f.struct_decl("Line", vec![f.struct_member(f.ty("other.lib.Point"), "start")]));
    workspace.add_library(vec![f.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(&compilation, "E1004", "library other.lib already imported");
}

#[test]
fn test_failed_dependency_cannot_be_imported() {
    let mut workspace = TestWorkspace::new();
    let mut broken = workspace.file("broken.fidl", "broken");
    broken.push(broken.struct_decl("Bad", vec![broken.struct_member(broken.ty("Missing"), "m")]));
    workspace.add_library(vec![broken.finish()]);
    let mut f = workspace.file("example.fidl", "example");
    f.using("broken");
    workspace.add_library(vec![f.finish()]);

    let (compilation, results) = workspace.compile();
    assert!(results.iter().all(Result::is_err));
    assert_has_error(&compilation, "E9004", "library broken failed to compile");
}

#[test]
fn test_declaration_conflicts_with_import() {
    let mut workspace = TestWorkspace::new();
    let mut dependency = workspace.file("dep.fidl", "dep");
    dependency.push(dependency.struct_decl(
        "S",
        vec![dependency.struct_member(dependency.ty("bool"), "b")],
    ));
    workspace.add_library(vec![dependency.finish()]);
    let mut f = workspace.file("example.fidl", "example");
    f.using("dep");
    f.push(f.struct_decl("dep", vec![f.struct_member(f.ty("dep.S"), "s")]));
    workspace.add_library(vec![f.finish()]);

    let compilation = workspace.compile_err();
    assert_has_error(
        &compilation,
        "E1005",
        "declaration name 'dep' conflicts with a library import",
    );
}

#[test]
fn test_files_must_agree_on_library_name() {
    let mut workspace = TestWorkspace::new();
    let a = workspace.file("a.fidl", "example");
    let b = workspace.file("b.fidl", "example.other");
    workspace.add_library(vec![a.finish(), b.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(
        &compilation,
        "E9001",
        "two files in the library disagree about the name of the library",
    );
}

#[test]
fn test_invalid_library_name_component() {
    let mut workspace = TestWorkspace::new();
    let f = workspace.file("a.fidl", "example.Bad_Name");
    workspace.add_library(vec![f.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(&compilation, "E9002", "invalid library name component Bad_Name");
}

#[test]
fn test_library_compiled_twice() {
    let mut workspace = TestWorkspace::new();
    let a = workspace.file("a.fidl", "example");
    let b = workspace.file("b.fidl", "example");
    workspace.add_library(vec![a.finish()]);
    workspace.add_library(vec![b.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(&compilation, "E9005", "multiple libraries with the same name example");
}

#[test]
fn test_declarations_across_files_share_a_namespace() {
    let mut workspace = TestWorkspace::new();
    let mut a = workspace.file("a.fidl", "example");
    a.push(a.struct_decl("Shared", vec![a.struct_member(a.ty("bool"), "b")]));
    let mut b = workspace.file("b.fidl", "example");
    b.push(b.table("Shared", vec![b.table_member(1, b.ty("bool"), "b")]));
    workspace.add_library(vec![a.finish(), b.finish()]);

    let compilation = workspace.compile_err();
    let error = assert_single_error(
        &compilation,
        "E1001",
        "multiple declarations named example/Shared; previous was at a.fidl:",
    );
    assert_eq!(error.labels.len(), 2);
}

#[test]
fn test_library_attributes_merge_across_files() {
    let mut workspace = TestWorkspace::new();
    let mut a = workspace.file("a.fidl", "example");
    a.library_attribute(a.attr("Doc", "first"));
    let mut b = workspace.file("b.fidl", "example");
    b.library_attribute(b.attr("Doc", "second"));
    workspace.add_library(vec![a.finish(), b.finish()]);

    let compilation = workspace.compile_err();
    assert_single_error(&compilation, "E6004", "duplicate attribute with name 'Doc'");
}

#[test]
fn test_by_kind_lists_every_declaration() {
    let mut workspace = TestWorkspace::new();
    add_dependency(&mut workspace);
    let (compilation, _) = workspace.compile_ok();

    let library = compilation.library(compilation.libraries()[0].id);
    assert_eq!(library.by_kind.structs.len(), 1);
    assert_eq!(library.by_kind.enums.len(), 1);
    assert_eq!(library.by_kind.len(), 2);
    assert!(library
        .by_kind
        .enums
        .iter()
        .all(|decl| matches!(compilation.decl(*decl).kind, DeclKind::Enum(_))));
}
