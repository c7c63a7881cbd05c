//! The compilation context
//!
//! A `Compilation` owns everything the flattening stage produces: the error
//! reporter, the typespace, the declaration arena, every library compiled so
//! far and the attribute schema table. Libraries are compiled one at a time,
//! dependencies first, by `compile_library`.

use diagnostics::{DiagnosticBuilder, Diagnostics, ErrorReporter, SourceMap, SourceSpan};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;

use crate::error_codes::{format_error_code, get_error_code};
use crate::flat::attributes::AttributeSchema;
use crate::flat::{
    CompileResult, Decl, DeclId, ErrorReported, Library, LibraryId, LibraryName, Name, Type,
    TypeId, TypeShape, Typespace,
};

/// Configuration for compilation
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompilationConfig {
    /// Promote every warning to an error
    pub warnings_as_errors: bool,
    /// Stop recording errors after this many (0 means unlimited)
    pub max_errors: usize,
    /// Report imports that no declaration references
    pub verify_unused_imports: bool,
    /// Warn about unknown attributes one edit away from a known one
    pub attribute_typo_warnings: bool,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            warnings_as_errors: false,
            max_errors: 0,
            verify_unused_imports: true,
            attribute_typo_warnings: true,
        }
    }
}

impl CompilationConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse compilation config: {}", e))
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Strict configuration: warnings fail the build
    pub fn strict() -> Self {
        Self::default().with_warnings_as_errors(true)
    }
}

pub struct Compilation {
    pub(crate) config: CompilationConfig,
    pub(crate) source_map: SourceMap,
    pub(crate) reporter: ErrorReporter,
    pub(crate) typespace: Typespace,
    pub(crate) decls: Vec<Decl>,
    pub(crate) libraries: Vec<Library>,
    pub(crate) library_ids: FxHashMap<LibraryName, LibraryId>,
    pub(crate) attribute_schemas: IndexMap<&'static str, AttributeSchema>,
}

impl Compilation {
    pub fn new(source_map: SourceMap, config: CompilationConfig) -> Self {
        let reporter = ErrorReporter::new()
            .with_warnings_as_errors(config.warnings_as_errors)
            .with_max_errors(config.max_errors);

        Self {
            config,
            source_map,
            reporter,
            typespace: Typespace::new(),
            decls: Vec::new(),
            libraries: Vec::new(),
            library_ids: FxHashMap::default(),
            attribute_schemas: crate::flat::attributes::official_schemas(),
        }
    }

    /// Flatten one library from all of its files.
    ///
    /// Libraries it imports must already have been compiled by this
    /// compilation. A failed library stays queryable but cannot be imported.
    pub fn compile_library(&mut self, files: Vec<raw_ast::File>) -> CompileResult<LibraryId> {
        let library = self.register_library(&files)?;
        info!("compiling library {}", self.libraries[library.index()].name);

        info!("consuming {} file(s)", files.len());
        let mut consumed = Ok(());
        for file in files {
            if let Err(error) = self.consume_file(library, file) {
                consumed = Err(error);
            }
        }
        consumed?;

        info!("sorting declarations");
        self.sort_library(library)?;

        info!("compiling declarations");
        self.compile_library_decls(library)?;

        info!("validating attributes");
        self.validate_library_attributes(library)?;

        if self.config.verify_unused_imports {
            self.verify_all_dependencies_were_used(library)?;
        }

        let library_data = &mut self.libraries[library.index()];
        library_data.compiled = true;
        debug!(
            "library {} compiled: {} declarations",
            library_data.name,
            library_data.declaration_order.len()
        );
        Ok(library)
    }

    pub fn config(&self) -> &CompilationConfig {
        &self.config
    }

    pub fn library(&self, id: LibraryId) -> &Library {
        &self.libraries[id.index()]
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn lookup_library(&self, name: &LibraryName) -> Option<LibraryId> {
        self.library_ids.get(name).copied()
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn type_of(&self, id: TypeId) -> &Type {
        self.typespace.get(id)
    }

    pub fn typespace(&self) -> &Typespace {
        &self.typespace
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.reporter.diagnostics()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Find a declaration by dotted library name and declaration name
    pub fn find_decl(&self, library: &str, decl_name: &str) -> Option<DeclId> {
        let name = Name::new(LibraryName::from_dotted(library), decl_name, None);
        self.lookup_decl(&name)
    }

    /// Size, alignment, depth and handle counts of a compiled declaration
    pub fn typeshape(&self, decl: DeclId) -> TypeShape {
        crate::flat::typeshape::TypeShapeCalculator::new(self).decl_shape(decl)
    }

    /// The declaration a (possibly member-qualified) name refers to
    pub(crate) fn lookup_decl(&self, name: &Name) -> Option<DeclId> {
        let library = *self.library_ids.get(name.library()?)?;
        self.libraries[library.index()].lookup(&name.memberless())
    }

    pub(crate) fn position_str(&self, span: SourceSpan) -> String {
        self.source_map.position_str(&span)
    }

    fn coded(
        &self,
        builder: DiagnosticBuilder,
        code: u16,
        span: Option<SourceSpan>,
    ) -> DiagnosticBuilder {
        let mut builder = builder.code(format_error_code(code));
        if let Some(span) = span {
            builder = builder.label(span, "here");
        }
        if let Some(help) = get_error_code(code).and_then(|error_code| error_code.help) {
            builder = builder.help(help);
        }
        builder
    }

    /// Report an error and return the proof of reporting.
    pub(crate) fn fail(
        &mut self,
        code: u16,
        span: impl Into<Option<SourceSpan>>,
        message: impl Into<String>,
    ) -> ErrorReported {
        let span = span.into();
        let diagnostic = self
            .coded(DiagnosticBuilder::error(message, span), code, span)
            .build();
        self.reporter.report_error_diagnostic(diagnostic)
    }

    /// Report an error that points back at an earlier, conflicting location.
    pub(crate) fn fail_with_previous(
        &mut self,
        code: u16,
        span: SourceSpan,
        message: impl Into<String>,
        previous: SourceSpan,
    ) -> ErrorReported {
        let diagnostic = self
            .coded(DiagnosticBuilder::error(message, Some(span)), code, Some(span))
            .secondary_label(previous, "previous occurrence")
            .build();
        self.reporter.report_error_diagnostic(diagnostic)
    }

    /// Report an error with explanatory notes.
    pub(crate) fn fail_with_notes(
        &mut self,
        code: u16,
        span: impl Into<Option<SourceSpan>>,
        message: impl Into<String>,
        notes: impl IntoIterator<Item = String>,
    ) -> ErrorReported {
        let span = span.into();
        let mut builder = self.coded(DiagnosticBuilder::error(message, span), code, span);
        for note in notes {
            builder = builder.note(note);
        }
        self.reporter.report_error_diagnostic(builder.build())
    }

    /// Report a warning. Returns `Some` if the configuration promoted it.
    pub(crate) fn warn(
        &mut self,
        code: u16,
        span: impl Into<Option<SourceSpan>>,
        message: impl Into<String>,
    ) -> Option<ErrorReported> {
        let span = span.into();
        let diagnostic = self
            .coded(DiagnosticBuilder::warning(message, span), code, span)
            .build();
        self.reporter.report_warning_diagnostic(diagnostic)
    }
}
