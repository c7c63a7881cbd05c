//! Shared helpers for the integration tests
#![allow(dead_code)]

use diagnostics::{Diagnostic, SourceMap};
use idlc::{Compilation, CompilationConfig, CompileResult};
use idlc::flat::LibraryId;
use raw_ast::builder::FileBuilder;
use raw_ast::File;

/// Files are built first, then compiled library by library in the order
/// they were added.
pub struct TestWorkspace {
    source_map: SourceMap,
    config: CompilationConfig,
    libraries: Vec<Vec<File>>,
}

impl TestWorkspace {
    pub fn new() -> Self {
        idlc::logging::init_test();
        Self {
            source_map: SourceMap::new(),
            config: CompilationConfig::default(),
            libraries: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CompilationConfig) -> Self {
        self.config = config;
        self
    }

    /// A builder for a file of `library`; hand it back with `add_library`.
    pub fn file(&mut self, file_name: &str, library: &str) -> FileBuilder {
        FileBuilder::in_source_map(&mut self.source_map, file_name, library)
    }

    pub fn add_library(&mut self, files: Vec<File>) -> &mut Self {
        self.libraries.push(files);
        self
    }

    /// Compile every library; the results line up with `add_library` calls.
    pub fn compile(self) -> (Compilation, Vec<CompileResult<LibraryId>>) {
        let mut compilation = Compilation::new(self.source_map, self.config);
        let results = self
            .libraries
            .into_iter()
            .map(|files| compilation.compile_library(files))
            .collect();
        (compilation, results)
    }

    /// Compile and require the last library to succeed.
    pub fn compile_ok(self) -> (Compilation, LibraryId) {
        let (compilation, results) = self.compile();
        match results.last() {
            Some(Ok(library)) => (compilation, *library),
            _ => panic!(
                "expected compilation to succeed, got:\n{}",
                render(compilation.diagnostics().errors())
            ),
        }
    }

    /// Compile and require the last library to fail.
    pub fn compile_err(self) -> Compilation {
        let (compilation, results) = self.compile();
        assert!(
            matches!(results.last(), Some(Err(_))),
            "expected compilation to fail"
        );
        compilation
    }
}

/// One library from one file: `build` fills it in.
pub fn single_file(build: impl FnOnce(&mut FileBuilder)) -> TestWorkspace {
    let mut workspace = TestWorkspace::new();
    let mut file = workspace.file("example.fidl", "example");
    build(&mut file);
    workspace.add_library(vec![file.finish()]);
    workspace
}

pub fn render<'a>(diagnostics: impl Iterator<Item = &'a Diagnostic>) -> String {
    diagnostics
        .map(|diagnostic| format!("  {}", diagnostic))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn error_messages(compilation: &Compilation) -> Vec<String> {
    compilation
        .diagnostics()
        .errors()
        .map(|diagnostic| diagnostic.message.clone())
        .collect()
}

/// Assert that exactly one error was reported, with `code` and a message
/// containing `fragment`. Returns the diagnostic for further checks.
pub fn assert_single_error<'a>(
    compilation: &'a Compilation,
    code: &str,
    fragment: &str,
) -> &'a Diagnostic {
    let errors: Vec<&Diagnostic> = compilation.diagnostics().errors().collect();
    assert_eq!(
        errors.len(),
        1,
        "expected one error, got:\n{}",
        render(errors.iter().copied())
    );
    let error = errors[0];
    assert_eq!(error.code.as_deref(), Some(code), "wrong code for: {}", error);
    assert!(
        error.message.contains(fragment),
        "expected '{}' in '{}'",
        fragment,
        error.message
    );
    error
}

/// Assert that some error has `code` and contains `fragment`.
pub fn assert_has_error(compilation: &Compilation, code: &str, fragment: &str) {
    let found = compilation
        .diagnostics()
        .errors()
        .any(|error| error.code.as_deref() == Some(code) && error.message.contains(fragment));
    assert!(
        found,
        "no {} error containing '{}' in:\n{}",
        code,
        fragment,
        render(compilation.diagnostics().errors())
    );
}
