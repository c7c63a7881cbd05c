pub mod compilation;
pub mod dependency_graph;
pub mod error_codes;
pub mod flat;
pub mod logging;

pub use compilation::{Compilation, CompilationConfig};
pub use flat::{CompileResult, ErrorReported};
