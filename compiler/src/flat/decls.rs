//! Declarations of the flat model
//!
//! All declarations of a compilation live in one arena (`Compilation::decls`)
//! and are referred to by `DeclId`. The kind-specific payload is a closed sum
//! type, so every per-kind pass is an exhaustive `match`.

use raw_ast::{AttributeList, Ordinal};
use source_map::SourceSpan;

use super::attributes::Placement;
use super::constants::Constant;
use super::ids::{DeclId, LibraryId, TypeId};
use super::name::Name;
use super::types::{PrimitiveSubtype, TypeConstructor};
use super::CompileResult;

/// Compilation lifecycle of one declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclState {
    NotStarted,
    Compiling,
    /// Finished, successfully or not. A failed declaration keeps failing
    /// without reporting again.
    Compiled(CompileResult<()>),
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub name: Name,
    pub attributes: AttributeList,
    pub library: LibraryId,
    pub state: DeclState,
    /// Set when the declaration was needed again while it was being compiled
    /// (a nullable self reference). Consulted by the type shape calculator.
    pub recursive: bool,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(name: Name, attributes: AttributeList, library: LibraryId, kind: DeclKind) -> Self {
        Self {
            name,
            attributes,
            library,
            state: DeclState::NotStarted,
            recursive: false,
            kind,
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, DeclState::Compiled(_))
    }

    /// `true` when compiled without errors
    pub fn compiled_ok(&self) -> bool {
        self.state == DeclState::Compiled(Ok(()))
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.name.span()
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.kind_name()
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match &self.kind {
            DeclKind::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_protocol(&self) -> Option<&Protocol> {
        match &self.kind {
            DeclKind::Protocol(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_bits(&self) -> Option<&Bits> {
        match &self.kind {
            DeclKind::Bits(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Enum> {
        match &self.kind {
            DeclKind::Enum(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&Const> {
        match &self.kind {
            DeclKind::Const(decl) => Some(decl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Bits(Bits),
    Const(Const),
    Enum(Enum),
    Protocol(Protocol),
    Service(Service),
    Struct(Struct),
    Table(Table),
    Union(Union),
    XUnion(XUnion),
    TypeAlias(TypeAlias),
}

impl DeclKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeclKind::Bits(_) => "bits",
            DeclKind::Const(_) => "const",
            DeclKind::Enum(_) => "enum",
            DeclKind::Protocol(_) => "protocol",
            DeclKind::Service(_) => "service",
            DeclKind::Struct(_) => "struct",
            DeclKind::Table(_) => "table",
            DeclKind::Union(_) => "union",
            DeclKind::XUnion(_) => "xunion",
            DeclKind::TypeAlias(_) => "type alias",
        }
    }

    pub fn placement(&self) -> Placement {
        match self {
            DeclKind::Bits(_) => Placement::BitsDecl,
            DeclKind::Const(_) => Placement::ConstDecl,
            DeclKind::Enum(_) => Placement::EnumDecl,
            DeclKind::Protocol(_) => Placement::ProtocolDecl,
            DeclKind::Service(_) => Placement::ServiceDecl,
            DeclKind::Struct(_) => Placement::StructDecl,
            DeclKind::Table(_) => Placement::TableDecl,
            DeclKind::Union(_) => Placement::UnionDecl,
            DeclKind::XUnion(_) => Placement::XUnionDecl,
            DeclKind::TypeAlias(_) => Placement::TypeAliasDecl,
        }
    }
}

/// A named member carrying a constant value (bits and enums)
#[derive(Debug, Clone)]
pub struct ValueMember {
    pub name: String,
    pub span: SourceSpan,
    pub value: Constant,
    pub attributes: AttributeList,
}

pub type BitsMember = ValueMember;
pub type EnumMember = ValueMember;

#[derive(Debug, Clone)]
pub struct Bits {
    pub subtype_ctor: TypeConstructor,
    pub members: Vec<BitsMember>,
    /// OR of all member values, once compiled
    pub mask: u64,
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub subtype_ctor: TypeConstructor,
    pub members: Vec<EnumMember>,
    pub subtype: Option<PrimitiveSubtype>,
}

#[derive(Debug, Clone)]
pub struct Const {
    pub type_ctor: TypeConstructor,
    pub value: Constant,
}

#[derive(Debug, Clone)]
pub struct StructMember {
    pub type_ctor: TypeConstructor,
    pub name: String,
    pub span: SourceSpan,
    pub maybe_default_value: Option<Constant>,
    pub attributes: AttributeList,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub members: Vec<StructMember>,
    /// Synthesized from a method's parameter list
    pub anonymous: bool,
    /// Carries a transactional message header on the wire
    pub is_request_or_response: bool,
}

/// The non-reserved part of a table, union or xunion member
#[derive(Debug, Clone)]
pub struct UsedMember {
    pub type_ctor: TypeConstructor,
    pub name: String,
    pub span: SourceSpan,
    pub attributes: AttributeList,
}

/// Table or union member: an ordinal that is either used or reserved
#[derive(Debug, Clone)]
pub struct OrdinalMember {
    pub ordinal: Ordinal,
    pub maybe_used: Option<UsedMember>,
    pub span: SourceSpan,
}

pub type TableMember = OrdinalMember;
pub type UnionMember = OrdinalMember;

#[derive(Debug, Clone)]
pub struct Table {
    pub members: Vec<TableMember>,
}

#[derive(Debug, Clone)]
pub struct Union {
    pub members: Vec<UnionMember>,
}

#[derive(Debug, Clone)]
pub struct XUnionMember {
    pub ordinal: Ordinal,
    /// Ordinal generated from the member name or selector
    pub hashed: bool,
    pub maybe_used: Option<UsedMember>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct XUnion {
    pub members: Vec<XUnionMember>,
}

#[derive(Debug, Clone)]
pub struct ServiceMember {
    pub type_ctor: TypeConstructor,
    pub name: String,
    pub span: SourceSpan,
    pub attributes: AttributeList,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub members: Vec<ServiceMember>,
}

#[derive(Debug, Clone)]
pub struct ComposedProtocol {
    pub name: Name,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ProtocolMethod {
    pub attributes: AttributeList,
    pub name: String,
    pub span: SourceSpan,
    pub generated_ordinal: Ordinal,
    /// Anonymous request struct; `None` for events
    pub maybe_request: Option<DeclId>,
    /// Anonymous response struct; `None` for one-way methods
    pub maybe_response: Option<DeclId>,
    /// The `[Result]` union synthesized for methods with an error type
    pub maybe_result_union: Option<DeclId>,
}

impl ProtocolMethod {
    pub fn has_error(&self) -> bool {
        self.maybe_result_union.is_some()
    }
}

/// A method visible on a protocol, either its own or a composed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRef {
    pub protocol: DeclId,
    pub index: usize,
    pub is_composed: bool,
}

#[derive(Debug, Clone)]
pub struct Protocol {
    pub composed_protocols: Vec<ComposedProtocol>,
    pub methods: Vec<ProtocolMethod>,
    /// Own and transitively composed methods, filled in by compilation
    pub all_methods: Vec<MethodRef>,
}

#[derive(Debug, Clone)]
pub struct TypeAlias {
    /// What follows `=`; parameters missing here may be supplied at use sites
    pub partial_type_ctor: TypeConstructor,
    /// The aliased type, when it could be built without use-site parameters
    pub resolved_type: Option<TypeId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::name::LibraryName;

    #[test]
    fn test_new_decl_starts_uncompiled() {
        let name = Name::new(LibraryName::from_dotted("example"), "Empty", None);
        let decl = Decl::new(
            name,
            AttributeList::default(),
            LibraryId::from_index(0),
            DeclKind::Struct(Struct {
                members: Vec::new(),
                anonymous: false,
                is_request_or_response: false,
            }),
        );
        assert_eq!(decl.state, DeclState::NotStarted);
        assert!(!decl.is_compiled());
        assert!(!decl.recursive);
        assert_eq!(decl.kind_name(), "struct");
        assert_eq!(decl.kind.placement(), Placement::StructDecl);
        assert!(decl.as_struct().is_some());
        assert!(decl.as_protocol().is_none());
    }
}
