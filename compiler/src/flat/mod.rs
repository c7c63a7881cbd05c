//! The flat model and the passes that build it
//!
//! Raw files are consumed into declarations, the declarations are sorted by
//! dependency, compiled kind by kind, and finally their attributes are
//! validated. Every pass runs as methods on `Compilation`.

pub mod attributes;
pub mod constants;
pub mod decls;
pub mod dependencies;
pub mod ids;
pub mod library;
pub mod name;
pub mod ordinals;
pub mod types;
pub mod typeshape;
pub mod typespace;
pub mod values;

mod compile;
mod consume;
mod sort;
mod validate;

pub use diagnostics::ErrorReported;

pub use attributes::{AttributeSchema, Placement};
pub use constants::{Constant, ConstantKind};
pub use decls::{
    Bits, ComposedProtocol, Const, Decl, DeclKind, DeclState, Enum, MethodRef, OrdinalMember,
    Protocol, ProtocolMethod, Service, ServiceMember, Struct, StructMember, Table, TypeAlias,
    Union, UsedMember, ValueMember, XUnion, XUnionMember,
};
pub use dependencies::{Dependencies, LibraryRef};
pub use ids::{DeclId, LibraryId, TypeId};
pub use library::{DeclarationsByKind, Library};
pub use name::{LibraryName, Name};
pub use types::{HandleSubtype, Nullability, PrimitiveSubtype, Type, TypeConstructor, UNBOUNDED};
pub use typeshape::TypeShape;
pub use typespace::{TypeTemplate, Typespace};
pub use values::{ConstantValue, ConstantValueKind};

/// Result of any step that reports its own diagnostics
pub type CompileResult<T> = Result<T, ErrorReported>;
