//! Concrete types and the type constructors that produce them

use source_map::SourceSpan;

pub use raw_ast::HandleSubtype;

use super::constants::Constant;
use super::ids::{DeclId, TypeId};
use super::name::Name;
use super::values::ConstantValueKind;

/// Bound used when a vector or string has no explicit size
pub const UNBOUNDED: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    Nullable,
    Nonnullable,
}

impl Nullability {
    pub fn from_flag(nullable: bool) -> Self {
        if nullable {
            Nullability::Nullable
        } else {
            Nullability::Nonnullable
        }
    }

    pub fn is_nullable(self) -> bool {
        self == Nullability::Nullable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveSubtype {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl PrimitiveSubtype {
    pub const ALL: [PrimitiveSubtype; 11] = [
        PrimitiveSubtype::Bool,
        PrimitiveSubtype::Int8,
        PrimitiveSubtype::Int16,
        PrimitiveSubtype::Int32,
        PrimitiveSubtype::Int64,
        PrimitiveSubtype::Uint8,
        PrimitiveSubtype::Uint16,
        PrimitiveSubtype::Uint32,
        PrimitiveSubtype::Uint64,
        PrimitiveSubtype::Float32,
        PrimitiveSubtype::Float64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveSubtype::Bool => "bool",
            PrimitiveSubtype::Int8 => "int8",
            PrimitiveSubtype::Int16 => "int16",
            PrimitiveSubtype::Int32 => "int32",
            PrimitiveSubtype::Int64 => "int64",
            PrimitiveSubtype::Uint8 => "uint8",
            PrimitiveSubtype::Uint16 => "uint16",
            PrimitiveSubtype::Uint32 => "uint32",
            PrimitiveSubtype::Uint64 => "uint64",
            PrimitiveSubtype::Float32 => "float32",
            PrimitiveSubtype::Float64 => "float64",
        }
    }

    /// Size and natural alignment in bytes
    pub fn size(self) -> u32 {
        match self {
            PrimitiveSubtype::Bool | PrimitiveSubtype::Int8 | PrimitiveSubtype::Uint8 => 1,
            PrimitiveSubtype::Int16 | PrimitiveSubtype::Uint16 => 2,
            PrimitiveSubtype::Int32 | PrimitiveSubtype::Uint32 | PrimitiveSubtype::Float32 => 4,
            PrimitiveSubtype::Int64 | PrimitiveSubtype::Uint64 | PrimitiveSubtype::Float64 => 8,
        }
    }

    pub fn value_kind(self) -> ConstantValueKind {
        match self {
            PrimitiveSubtype::Bool => ConstantValueKind::Bool,
            PrimitiveSubtype::Int8 => ConstantValueKind::Int8,
            PrimitiveSubtype::Int16 => ConstantValueKind::Int16,
            PrimitiveSubtype::Int32 => ConstantValueKind::Int32,
            PrimitiveSubtype::Int64 => ConstantValueKind::Int64,
            PrimitiveSubtype::Uint8 => ConstantValueKind::Uint8,
            PrimitiveSubtype::Uint16 => ConstantValueKind::Uint16,
            PrimitiveSubtype::Uint32 => ConstantValueKind::Uint32,
            PrimitiveSubtype::Uint64 => ConstantValueKind::Uint64,
            PrimitiveSubtype::Float32 => ConstantValueKind::Float32,
            PrimitiveSubtype::Float64 => ConstantValueKind::Float64,
        }
    }

    pub fn is_integer(self) -> bool {
        self.value_kind().is_integer()
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            PrimitiveSubtype::Uint8
                | PrimitiveSubtype::Uint16
                | PrimitiveSubtype::Uint32
                | PrimitiveSubtype::Uint64
        )
    }
}

/// A compiled type. Interned in the typespace; compare by `TypeId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveSubtype),
    Array {
        element: TypeId,
        size: u32,
    },
    Vector {
        element: TypeId,
        max_size: u32,
        nullability: Nullability,
    },
    String {
        max_size: u32,
        nullability: Nullability,
    },
    Handle {
        subtype: HandleSubtype,
        nullability: Nullability,
    },
    RequestHandle {
        protocol: DeclId,
        nullability: Nullability,
    },
    Identifier {
        decl: DeclId,
        nullability: Nullability,
    },
}

impl Type {
    pub fn nullability(&self) -> Nullability {
        match self {
            Type::Primitive(_) | Type::Array { .. } => Nullability::Nonnullable,
            Type::Vector { nullability, .. }
            | Type::String { nullability, .. }
            | Type::Handle { nullability, .. }
            | Type::RequestHandle { nullability, .. }
            | Type::Identifier { nullability, .. } => *nullability,
        }
    }
}

/// A type use in the flat model: a resolved name plus parameters.
///
/// Compiled at most once; the resulting type is cached in `type_id`.
#[derive(Debug, Clone)]
pub struct TypeConstructor {
    pub name: Name,
    pub maybe_arg_type_ctor: Option<Box<TypeConstructor>>,
    pub maybe_handle_subtype: Option<HandleSubtype>,
    pub maybe_size: Option<Constant>,
    pub nullability: Nullability,
    pub span: SourceSpan,
    pub type_id: Option<TypeId>,
}

impl TypeConstructor {
    /// Non-nullable reference to a declaration, for synthesized members
    pub fn for_decl(name: Name, span: SourceSpan) -> Self {
        Self {
            name,
            maybe_arg_type_ctor: None,
            maybe_handle_subtype: None,
            maybe_size: None,
            nullability: Nullability::Nonnullable,
            span,
            type_id: None,
        }
    }

    /// The compiled type. Panics if the constructor has not been compiled.
    pub fn type_id(&self) -> TypeId {
        match self.type_id {
            Some(type_id) => type_id,
            None => panic!(
                "compiler bug: type constructor `{}` read before compilation",
                self.name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_properties() {
        assert_eq!(PrimitiveSubtype::Uint16.size(), 2);
        assert_eq!(PrimitiveSubtype::Float64.size(), 8);
        assert!(PrimitiveSubtype::Uint64.is_unsigned_integer());
        assert!(!PrimitiveSubtype::Int64.is_unsigned_integer());
        assert!(PrimitiveSubtype::Int8.is_integer());
        assert!(!PrimitiveSubtype::Float32.is_integer());
        assert!(!PrimitiveSubtype::Bool.is_integer());
        assert_eq!(PrimitiveSubtype::ALL.len(), 11);
    }

    #[test]
    fn test_type_nullability() {
        let string = Type::String {
            max_size: UNBOUNDED,
            nullability: Nullability::Nullable,
        };
        assert!(string.nullability().is_nullable());
        assert_eq!(
            Type::Primitive(PrimitiveSubtype::Bool).nullability(),
            Nullability::Nonnullable
        );
    }
}
