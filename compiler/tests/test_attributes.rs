mod common;

use common::{assert_has_error, assert_single_error, single_file};
use idlc::flat::{AttributeSchema, DeclId, Placement};
use idlc::{Compilation, CompilationConfig, ErrorReported};

#[test]
fn test_doc_is_allowed_everywhere() {
    single_file(|f| {
        f.library_attribute(f.attr("Doc", "the library"));
        let member = f.struct_member(f.ty("bool"), "b").with_attribute(f.attr("Doc", "a flag"));
        f.push(f.struct_decl("S", vec![member]).with_attribute(f.attr("Doc", "a struct")));
    })
    .compile_ok();
}

#[test]
fn test_placement_is_checked() {
    let compilation = single_file(|f| {
        f.push(
            f.struct_decl("S", vec![f.struct_member(f.ty("bool"), "b")])
                .with_attribute(f.attr("Transport", "Channel")),
        );
    })
    .compile_err();

    assert_single_error(
        &compilation,
        "E6001",
        "placement of attribute 'Transport' disallowed here",
    );
}

#[test]
fn test_value_is_checked() {
    let compilation = single_file(|f| {
        let protocol = f.protocol("P", &[], vec![]).with_attribute(f.attr("Layout", "Complex"));
        f.push(protocol);
    })
    .compile_err();

    assert_single_error(
        &compilation,
        "E6002",
        "attribute 'Layout' has invalid value 'Complex', should be one of 'Simple'",
    );
}

#[test]
fn test_duplicate_attribute_on_declaration() {
    let compilation = single_file(|f| {
        let decl = f
            .struct_decl("S", vec![f.struct_member(f.ty("bool"), "b")])
            .with_attribute(f.attr("Doc", "one"))
            .with_attribute(f.attr("Doc", "two"));
        f.push(decl);
    })
    .compile_err();

    let error = assert_single_error(&compilation, "E6004", "duplicate attribute with name 'Doc'");
    assert_eq!(error.labels.len(), 2);
}

#[test]
fn test_typo_is_a_warning() {
    let (compilation, _) = single_file(|f| {
        f.push(
            f.struct_decl("S", vec![f.struct_member(f.ty("bool"), "b")])
                .with_attribute(f.attr("Dc", "")),
        );
    })
    .compile_ok();

    let warnings: Vec<_> = compilation.diagnostics().warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("suspect attribute with name 'Dc'; did you mean 'Doc'?"));
}

#[test]
fn test_typo_fails_in_strict_mode() {
    let compilation = single_file(|f| {
        f.push(
            f.struct_decl("S", vec![f.struct_member(f.ty("bool"), "b")])
                .with_attribute(f.attr("Dc", "")),
        );
    })
    .with_config(CompilationConfig::strict())
    .compile_err();

    assert_single_error(&compilation, "E6005", "suspect attribute with name 'Dc'");
}

#[test]
fn test_unrelated_unknown_attribute_is_silent() {
    let (compilation, _) = single_file(|f| {
        f.push(
            f.struct_decl("S", vec![f.struct_member(f.ty("bool"), "b")])
                .with_attribute(f.attr("Frobnicate", "")),
        );
    })
    .compile_ok();

    assert_eq!(compilation.diagnostics().warnings().count(), 0);
}

#[test]
fn test_max_bytes_on_struct() {
    let compilation = single_file(|f| {
        let members = vec![
            f.struct_member(f.ty("uint64"), "a"),
            f.struct_member(f.ty("uint64"), "b"),
        ];
        f.push(f.struct_decl("Big", members).with_attribute(f.attr("MaxBytes", "8")));
        let members = vec![f.struct_member(f.ty("uint64"), "a")];
        f.push(f.struct_decl("Fits", members).with_attribute(f.attr("MaxBytes", "8")));
    })
    .compile_err();

    assert_single_error(
        &compilation,
        "E6007",
        "too large: only 8 bytes allowed, but 16 bytes found",
    );
}

#[test]
fn test_max_bytes_unbounded() {
    let compilation = single_file(|f| {
        let members = vec![f.struct_member(f.ty("string"), "name")];
        f.push(f.struct_decl("Named", members).with_attribute(f.attr("MaxBytes", "64")));
    })
    .compile_err();

    assert_single_error(&compilation, "E6007", "but unbounded bytes found");
}

#[test]
fn test_max_bytes_on_protocol_checks_messages() {
    let compilation = single_file(|f| {
        let method = f.method("Send", Some(vec![f.param(f.ty("uint64"), "value")]), None);
        f.push(f.protocol("P", &[], vec![method]).with_attribute(f.attr("MaxBytes", "16")));
    })
    .compile_err();

    // 16 bytes of header and 8 of payload.
    assert_single_error(&compilation, "E6007", "only 16 bytes allowed, but 24 bytes found");
}

#[test]
fn test_max_handles() {
    let compilation = single_file(|f| {
        let members = vec![
            f.struct_member(f.ty("handle"), "a"),
            f.struct_member(f.ty("handle"), "b"),
        ];
        f.push(f.struct_decl("Handles", members).with_attribute(f.attr("MaxHandles", "1")));
    })
    .compile_err();

    assert_single_error(&compilation, "E6008", "too many handles: only 1 allowed, but 2 found");
}

#[test]
fn test_unparsable_bound() {
    let compilation = single_file(|f| {
        let members = vec![f.struct_member(f.ty("uint8"), "a")];
        f.push(f.struct_decl("S", members).with_attribute(f.attr("MaxHandles", "lots")));
    })
    .compile_err();

    assert_single_error(&compilation, "E6006", "unable to parse bound 'lots'");
}

#[test]
fn test_max_bytes_on_method() {
    let compilation = single_file(|f| {
        let method = f
            .method("Send", Some(vec![f.param(f.ty("uint64"), "value")]), Some(vec![]))
            .with_attribute(f.attr("MaxBytes", "20"));
        f.push(f.protocol("P", &[], vec![method]));
    })
    .compile_err();

    // The request is too big, the empty response fits.
    assert_single_error(&compilation, "E6007", "only 20 bytes allowed, but 24 bytes found");
}

#[test]
fn test_simple_layout() {
    let compilation = single_file(|f| {
        let ok = f.method(
            "Ok",
            Some(vec![f.param(f.ty("string").with_size(f.num("32")), "name")]),
            None,
        );
        let bad = f.method(
            "Bad",
            Some(vec![f.param(
                f.ty("vector").with_arg(f.ty("string")).with_size(f.num("4")),
                "names",
            )]),
            None,
        );
        f.push(f.protocol("P", &[], vec![ok, bad]).with_attribute(f.attr("Layout", "Simple")));
    })
    .compile_err();

    assert_single_error(&compilation, "E6011", "member 'names' is not simple");
}

#[test]
fn test_transport() {
    let compilation = single_file(|f| {
        f.push(
            f.protocol("Good", &[], vec![])
                .with_attribute(f.attr("Transport", "Channel, SocketControl")),
        );
        f.push(f.protocol("Bad", &[], vec![]).with_attribute(f.attr("Transport", "Pigeon")));
    })
    .compile_err();

    assert_single_error(
        &compilation,
        "E6010",
        "invalid transport type: got Pigeon expected one of Channel, SocketControl, OvernetInternal",
    );
}

#[test]
fn test_selector_placement() {
    let compilation = single_file(|f| {
        let member = f
            .table_member(1, f.ty("bool"), "b")
            .with_attribute(f.attr("Selector", "other"));
        f.push(f.table("T", vec![member]));
    })
    .compile_err();

    assert_single_error(&compilation, "E6001", "placement of attribute 'Selector' disallowed here");
}

fn must_be_empty(
    compilation: &mut Compilation,
    _attribute: &raw_ast::Attribute,
    decl: DeclId,
) -> Result<(), Option<ErrorReported>> {
    match compilation.decl(decl).as_struct() {
        Some(struct_decl) if !struct_decl.members.is_empty() => Err(None),
        _ => Ok(()),
    }
}

#[test]
fn test_custom_schema_failure_is_reported() {
    let mut workspace = common::TestWorkspace::new();
    let mut f = workspace.file("example.fidl", "example");
    f.push(
        f.struct_decl("Full", vec![f.struct_member(f.ty("bool"), "b")])
            .with_attribute(f.attr("Empty", "")),
    );
    workspace.add_library(vec![f.finish()]);
    let mut g = workspace.file("second.fidl", "second");
    g.push(
        g.struct_decl("Full", vec![g.struct_member(g.ty("bool"), "b")])
            .with_attribute(g.attr("Empty", "")),
    );
    let second = g.finish();

    let (mut compilation, results) = workspace.compile();
    // Unknown attributes are accepted until a schema is registered.
    assert!(results[0].is_ok());
    compilation.add_attribute_schema(
        AttributeSchema::new("Empty", &[Placement::StructDecl], &[""])
            .with_constraint(must_be_empty),
    );
    assert!(compilation.attribute_schema("Empty").is_some());
    assert!(compilation.compile_library(vec![second]).is_err());
    assert_has_error(
        &compilation,
        "E6003",
        "declaration did not satisfy constraint of attribute 'Empty' with value ''",
    );
}
