//! Raw IDL syntax tree
//!
//! This is the contract between the parser and the flattening stage: a purely
//! syntactic description of one source file. Nothing here is resolved; names
//! are compound identifiers, types are constructors, values are literals or
//! references.

use std::fmt;

pub use source_map::{FileId, SourcePosition, SourceSpan};

pub mod builder;

/// A single identifier token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A dotted identifier: `fuchsia.io.Node`, `Color.RED`, `uint32`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundIdentifier {
    pub components: Vec<Identifier>,
    pub span: SourceSpan,
}

impl CompoundIdentifier {
    pub fn new(components: Vec<Identifier>, span: SourceSpan) -> Self {
        assert!(
            !components.is_empty(),
            "compound identifier needs at least one component"
        );
        Self { components, span }
    }

    /// Split a dotted name into components, all sharing `span`
    pub fn from_dotted(dotted: &str, span: SourceSpan) -> Self {
        let components = dotted
            .split('.')
            .map(|part| Identifier::new(part, span))
            .collect();
        Self::new(components, span)
    }

    pub fn last(&self) -> &Identifier {
        // Non-empty by construction.
        &self.components[self.components.len() - 1]
    }

    pub fn to_dotted(&self) -> String {
        self.components
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for CompoundIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dotted())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralKind {
    /// Raw source text including the surrounding quotes and escapes
    String(String),
    /// Raw numeric token, e.g. `0x10`, `-3`, `1.5`
    Numeric(String),
    True,
    False,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: SourceSpan,
}

impl Literal {
    /// The literal exactly as written
    pub fn source_text(&self) -> &str {
        match &self.kind {
            LiteralKind::String(raw) | LiteralKind::Numeric(raw) => raw,
            LiteralKind::True => "true",
            LiteralKind::False => "false",
        }
    }
}

/// A value as written: either a literal or a reference to a named constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Identifier(CompoundIdentifier),
    Literal(Literal),
}

impl Constant {
    pub fn span(&self) -> SourceSpan {
        match self {
            Constant::Identifier(identifier) => identifier.span,
            Constant::Literal(literal) => literal.span,
        }
    }
}

/// Kernel object kinds accepted as `handle<...>` subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleSubtype {
    Handle,
    Bti,
    Channel,
    Debuglog,
    Event,
    Eventpair,
    Fifo,
    Guest,
    Interrupt,
    Job,
    Port,
    Process,
    Profile,
    Resource,
    Socket,
    Thread,
    Timer,
    Vmar,
    Vmo,
}

impl HandleSubtype {
    pub fn name(self) -> &'static str {
        match self {
            HandleSubtype::Handle => "handle",
            HandleSubtype::Bti => "bti",
            HandleSubtype::Channel => "channel",
            HandleSubtype::Debuglog => "debuglog",
            HandleSubtype::Event => "event",
            HandleSubtype::Eventpair => "eventpair",
            HandleSubtype::Fifo => "fifo",
            HandleSubtype::Guest => "guest",
            HandleSubtype::Interrupt => "interrupt",
            HandleSubtype::Job => "job",
            HandleSubtype::Port => "port",
            HandleSubtype::Process => "process",
            HandleSubtype::Profile => "profile",
            HandleSubtype::Resource => "resource",
            HandleSubtype::Socket => "socket",
            HandleSubtype::Thread => "thread",
            HandleSubtype::Timer => "timer",
            HandleSubtype::Vmar => "vmar",
            HandleSubtype::Vmo => "vmo",
        }
    }
}

impl fmt::Display for HandleSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Syntactic type use: `vector<handle<vmo>>:16?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConstructor {
    pub identifier: CompoundIdentifier,
    pub maybe_arg_type: Option<Box<TypeConstructor>>,
    pub maybe_handle_subtype: Option<HandleSubtype>,
    pub maybe_size: Option<Constant>,
    pub nullable: bool,
    pub span: SourceSpan,
}

impl TypeConstructor {
    pub fn new(identifier: CompoundIdentifier, span: SourceSpan) -> Self {
        Self {
            identifier,
            maybe_arg_type: None,
            maybe_handle_subtype: None,
            maybe_size: None,
            nullable: false,
            span,
        }
    }

    pub fn with_arg(mut self, arg: TypeConstructor) -> Self {
        self.maybe_arg_type = Some(Box::new(arg));
        self
    }

    pub fn with_size(mut self, size: Constant) -> Self {
        self.maybe_size = Some(size);
        self
    }

    pub fn with_handle_subtype(mut self, subtype: HandleSubtype) -> Self {
        self.maybe_handle_subtype = Some(subtype);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// `[Name = "value"]`; a bare `[Name]` has an empty value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    pub attributes: Vec<Attribute>,
}

impl AttributeList {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordinal {
    pub value: u32,
    pub span: SourceSpan,
}

/// `using a.b;`, `using a.b as c;` or the alias form `using Name = type;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Using {
    pub attributes: AttributeList,
    pub using_path: CompoundIdentifier,
    pub maybe_alias: Option<Identifier>,
    pub maybe_type_ctor: Option<TypeConstructor>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsMember {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub value: Constant,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub maybe_type_ctor: Option<TypeConstructor>,
    pub members: Vec<BitsMember>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub type_ctor: TypeConstructor,
    pub constant: Constant,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub value: Constant,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub maybe_type_ctor: Option<TypeConstructor>,
    pub members: Vec<EnumMember>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub attributes: AttributeList,
    pub type_ctor: TypeConstructor,
    pub identifier: Identifier,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterList {
    pub parameters: Vec<Parameter>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMethod {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub maybe_request: Option<ParameterList>,
    pub maybe_response: Option<ParameterList>,
    pub maybe_error_ctor: Option<TypeConstructor>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProtocol {
    pub protocol_name: CompoundIdentifier,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub composed_protocols: Vec<ComposeProtocol>,
    pub methods: Vec<ProtocolMethod>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMember {
    pub attributes: AttributeList,
    pub type_ctor: TypeConstructor,
    pub identifier: Identifier,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub members: Vec<ServiceMember>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub attributes: AttributeList,
    pub type_ctor: TypeConstructor,
    pub identifier: Identifier,
    pub maybe_default_value: Option<Constant>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub members: Vec<StructMember>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMemberUsed {
    pub attributes: AttributeList,
    pub type_ctor: TypeConstructor,
    pub identifier: Identifier,
    pub maybe_default_value: Option<Constant>,
}

/// `N: type name;` or `N: reserved;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMember {
    pub ordinal: Ordinal,
    pub maybe_used: Option<TableMemberUsed>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub members: Vec<TableMember>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMemberUsed {
    pub attributes: AttributeList,
    pub type_ctor: TypeConstructor,
    pub identifier: Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMember {
    pub ordinal: Ordinal,
    pub maybe_used: Option<UnionMemberUsed>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub members: Vec<UnionMember>,
    pub span: SourceSpan,
}

/// Extensible union member; the ordinal is hashed when omitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XUnionMember {
    pub maybe_ordinal: Option<Ordinal>,
    pub maybe_used: Option<UnionMemberUsed>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XUnionDeclaration {
    pub attributes: AttributeList,
    pub identifier: Identifier,
    pub members: Vec<XUnionMember>,
    pub span: SourceSpan,
}

/// One parsed source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub attributes: AttributeList,
    pub library_name: CompoundIdentifier,
    pub using_list: Vec<Using>,
    pub bits_declarations: Vec<BitsDeclaration>,
    pub const_declarations: Vec<ConstDeclaration>,
    pub enum_declarations: Vec<EnumDeclaration>,
    pub protocol_declarations: Vec<ProtocolDeclaration>,
    pub service_declarations: Vec<ServiceDeclaration>,
    pub struct_declarations: Vec<StructDeclaration>,
    pub table_declarations: Vec<TableDeclaration>,
    pub union_declarations: Vec<UnionDeclaration>,
    pub xunion_declarations: Vec<XUnionDeclaration>,
    pub span: SourceSpan,
}

impl File {
    pub fn new(library_name: CompoundIdentifier, span: SourceSpan) -> Self {
        Self {
            attributes: AttributeList::default(),
            library_name,
            using_list: Vec::new(),
            bits_declarations: Vec::new(),
            const_declarations: Vec::new(),
            enum_declarations: Vec::new(),
            protocol_declarations: Vec::new(),
            service_declarations: Vec::new(),
            struct_declarations: Vec::new(),
            table_declarations: Vec::new(),
            union_declarations: Vec::new(),
            xunion_declarations: Vec::new(),
            span,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.span.file_id
    }

    pub fn push(&mut self, declaration: impl Into<Declaration>) {
        match declaration.into() {
            Declaration::Bits(decl) => self.bits_declarations.push(decl),
            Declaration::Const(decl) => self.const_declarations.push(decl),
            Declaration::Enum(decl) => self.enum_declarations.push(decl),
            Declaration::Protocol(decl) => self.protocol_declarations.push(decl),
            Declaration::Service(decl) => self.service_declarations.push(decl),
            Declaration::Struct(decl) => self.struct_declarations.push(decl),
            Declaration::Table(decl) => self.table_declarations.push(decl),
            Declaration::Union(decl) => self.union_declarations.push(decl),
            Declaration::XUnion(decl) => self.xunion_declarations.push(decl),
        }
    }
}

/// Any top-level declaration, for code that produces files incrementally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Bits(BitsDeclaration),
    Const(ConstDeclaration),
    Enum(EnumDeclaration),
    Protocol(ProtocolDeclaration),
    Service(ServiceDeclaration),
    Struct(StructDeclaration),
    Table(TableDeclaration),
    Union(UnionDeclaration),
    XUnion(XUnionDeclaration),
}

macro_rules! impl_declaration {
    ($($variant:ident => $decl:ty),* $(,)?) => {
        $(
            impl From<$decl> for Declaration {
                fn from(decl: $decl) -> Self {
                    Declaration::$variant(decl)
                }
            }

            impl $decl {
                pub fn with_attribute(mut self, attribute: Attribute) -> Self {
                    self.attributes.push(attribute);
                    self
                }
            }
        )*
    };
}

impl_declaration! {
    Bits => BitsDeclaration,
    Const => ConstDeclaration,
    Enum => EnumDeclaration,
    Protocol => ProtocolDeclaration,
    Service => ServiceDeclaration,
    Struct => StructDeclaration,
    Table => TableDeclaration,
    Union => UnionDeclaration,
    XUnion => XUnionDeclaration,
}

macro_rules! impl_with_attribute {
    ($($node:ty),* $(,)?) => {
        $(
            impl $node {
                pub fn with_attribute(mut self, attribute: Attribute) -> Self {
                    self.attributes.push(attribute);
                    self
                }
            }
        )*
    };
}

impl_with_attribute!(
    BitsMember,
    EnumMember,
    Parameter,
    ProtocolMethod,
    ServiceMember,
    StructMember,
    Using,
);

impl ProtocolMethod {
    pub fn with_error(mut self, error_ctor: TypeConstructor) -> Self {
        self.maybe_error_ctor = Some(error_ctor);
        self
    }
}

impl TableMember {
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        if let Some(used) = self.maybe_used.as_mut() {
            used.attributes.push(attribute);
        }
        self
    }
}

impl UnionMember {
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        if let Some(used) = self.maybe_used.as_mut() {
            used.attributes.push(attribute);
        }
        self
    }
}

impl XUnionMember {
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        if let Some(used) = self.maybe_used.as_mut() {
            used.attributes.push(attribute);
        }
        self
    }
}
