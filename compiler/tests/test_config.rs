mod common;

use common::single_file;
use idlc::CompilationConfig;

fn two_broken_structs(f: &mut raw_ast::builder::FileBuilder) {
    f.push(f.struct_decl("A", vec![f.struct_member(f.ty("Missing"), "a")]));
    f.push(f.struct_decl("B", vec![f.struct_member(f.ty("AlsoMissing"), "b")]));
}

#[test]
fn test_max_errors_caps_recorded_diagnostics() {
    let config = CompilationConfig::default().with_max_errors(1);
    let compilation = single_file(two_broken_structs).with_config(config).compile_err();

    assert_eq!(compilation.reporter().error_count(), 2);
    assert_eq!(compilation.diagnostics().errors().count(), 1);
}

#[test]
fn test_config_file_drives_compilation() {
    let config = CompilationConfig::from_toml_str(
        r#"
warnings-as-errors = true
attribute-typo-warnings = false
"#,
    )
    .unwrap();
    assert_eq!(config.max_errors, 0);

    // Typo warnings are off, so strict mode has nothing to promote.
    let (compilation, _) = single_file(|f| {
        f.push(
            f.struct_decl("S", vec![f.struct_member(f.ty("bool"), "b")])
                .with_attribute(f.attr("Dc", "")),
        );
    })
    .with_config(config)
    .compile_ok();
    assert!(compilation.config().warnings_as_errors);
    assert!(compilation.diagnostics().is_empty());
}
