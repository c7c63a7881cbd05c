//! Constants and the constant resolution engine
//!
//! A constant starts unresolved and is resolved exactly once against the
//! type of the position it appears in (a `const` declaration, a member
//! value, a default, a size bound). Literals are parsed for the target type;
//! identifiers are looked up, compiled on demand and converted.

use log::trace;
use source_map::SourceSpan;

use raw_ast::{Literal, LiteralKind};

use super::decls::{DeclKind, DeclState};
use super::ids::{DeclId, TypeId};
use super::name::Name;
use super::types::{Nullability, PrimitiveSubtype, Type};
use super::values::{decode_string_literal, parse_numeric, ConstantValue, ConstantValueKind};
use super::CompileResult;
use crate::compilation::Compilation;
use crate::error_codes::codes;

#[derive(Debug, Clone)]
pub enum ConstantKind {
    /// Reference to a `const`, or to an enum/bits member
    Identifier(Name),
    Literal(Literal),
    /// Created by the compiler with its value already known
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct Constant {
    pub kind: ConstantKind,
    pub span: SourceSpan,
    value: Option<ConstantValue>,
}

impl Constant {
    pub fn identifier(name: Name, span: SourceSpan) -> Self {
        Self {
            kind: ConstantKind::Identifier(name),
            span,
            value: None,
        }
    }

    pub fn literal(literal: Literal) -> Self {
        let span = literal.span;
        Self {
            kind: ConstantKind::Literal(literal),
            span,
            value: None,
        }
    }

    pub fn synthesized(value: ConstantValue, span: SourceSpan) -> Self {
        Self {
            kind: ConstantKind::Synthesized,
            span,
            value: Some(value),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// Record the resolved value. Resolving twice is a compiler bug.
    pub fn resolve_to(&mut self, value: ConstantValue) {
        assert!(
            self.value.is_none(),
            "compiler bug: constant `{}` resolved twice",
            self.source_text()
        );
        self.value = Some(value);
    }

    /// The resolved value. Reading an unresolved constant is a compiler bug.
    pub fn value(&self) -> &ConstantValue {
        match &self.value {
            Some(value) => value,
            None => panic!(
                "compiler bug: constant `{}` read before resolution",
                self.source_text()
            ),
        }
    }

    pub fn maybe_value(&self) -> Option<&ConstantValue> {
        self.value.as_ref()
    }

    /// How the constant reads in diagnostics
    pub fn source_text(&self) -> String {
        match &self.kind {
            ConstantKind::Identifier(name) => name.to_string(),
            ConstantKind::Literal(literal) => literal.source_text().to_string(),
            ConstantKind::Synthesized => match &self.value {
                Some(value) => value.to_string(),
                None => "<synthesized>".to_string(),
            },
        }
    }
}

/// What an identifier constant turned out to name
enum Referent {
    Value { from_type: TypeId, value: ConstantValue },
    NotAValue,
    UnknownMember(String),
}

impl Compilation {
    /// Only non-nullable strings, primitives, enums and bits may hold constants.
    pub(crate) fn type_can_be_const(&self, type_id: TypeId) -> bool {
        match self.typespace.get(type_id) {
            Type::String { nullability, .. } => *nullability == Nullability::Nonnullable,
            Type::Primitive(_) => true,
            Type::Identifier { decl, .. } => matches!(
                self.decls[decl.index()].kind,
                DeclKind::Enum(_) | DeclKind::Bits(_)
            ),
            _ => false,
        }
    }

    /// Resolve `constant` against `type_id`. Already-resolved constants are left alone.
    pub(crate) fn resolve_constant(
        &mut self,
        constant: &mut Constant,
        type_id: TypeId,
    ) -> CompileResult<()> {
        if constant.is_resolved() {
            return Ok(());
        }
        trace!(
            "resolving constant {} as {}",
            constant.source_text(),
            self.type_name(type_id)
        );
        match constant.kind.clone() {
            ConstantKind::Identifier(name) => self.resolve_identifier_constant(
                constant,
                &name,
                type_id,
            ),
            ConstantKind::Literal(literal) => self.resolve_literal_constant(
                constant,
                &literal,
                type_id,
            ),
            ConstantKind::Synthesized => {
                panic!("compiler bug: synthesized constant does not have a resolved value")
            }
        }
    }

    fn cannot_interpret(&mut self, constant: &Constant, type_id: TypeId) -> super::ErrorReported {
        let message = format!(
            "{} cannot be interpreted as type {}",
            constant.source_text(),
            self.type_name(type_id)
        );
        self.fail(codes::CANNOT_INTERPRET_CONSTANT, constant.span, message)
    }

    fn resolve_literal_constant(
        &mut self,
        constant: &mut Constant,
        literal: &Literal,
        type_id: TypeId,
    ) -> CompileResult<()> {
        let ty = self.typespace.get(type_id).clone();
        let value = match (&literal.kind, ty) {
            (LiteralKind::String(raw), Type::String { max_size, .. }) => {
                let Some(decoded) = decode_string_literal(raw) else {
                    return Err(self.cannot_interpret(constant, type_id));
                };
                let size = decoded.len() as u64;
                if size > max_size as u64 {
                    let message = format!(
                        "too large: only {} bytes allowed, but {} bytes found",
                        max_size, size
                    );
                    return Err(self.fail(codes::STRING_TOO_LONG, constant.span, message));
                }
                ConstantValue::String(decoded)
            }
            (LiteralKind::True, Type::Primitive(PrimitiveSubtype::Bool)) => {
                ConstantValue::Bool(true)
            }
            (LiteralKind::False, Type::Primitive(PrimitiveSubtype::Bool)) => {
                ConstantValue::Bool(false)
            }
            (LiteralKind::Numeric(text), Type::Primitive(subtype))
                if subtype != PrimitiveSubtype::Bool =>
            {
                match parse_numeric(text, subtype.value_kind()) {
                    Ok(value) => value,
                    Err(error) => {
                        trace!("numeric literal {}: {}", text, error);
                        return Err(self.cannot_interpret(constant, type_id));
                    }
                }
            }
            _ => return Err(self.cannot_interpret(constant, type_id)),
        };
        constant.resolve_to(value);
        Ok(())
    }

    fn resolve_identifier_constant(
        &mut self,
        constant: &mut Constant,
        name: &Name,
        type_id: TypeId,
    ) -> CompileResult<()> {
        let Some(decl_id) = self.lookup_decl(name) else {
            let message = format!("unable to find the constant named {}", name);
            return Err(self.fail(codes::UNKNOWN_CONSTANT, constant.span, message));
        };

        if self.decls[decl_id.index()].state == DeclState::Compiling {
            let message = format!(
                "constant {} refers to a declaration that is still being compiled",
                name
            );
            return Err(self.fail(codes::CONSTANT_CYCLE, constant.span, message));
        }
        self.compile_decl(decl_id)?;

        let (from_type, value) = match self.referent(decl_id, name) {
            Referent::Value { from_type, value } => (from_type, value),
            Referent::NotAValue => {
                let message = format!("{} is a type, but a value was expected", name);
                return Err(self.fail(codes::EXPECTED_VALUE, constant.span, message));
            }
            Referent::UnknownMember(member) => {
                let message = format!("unknown member {} of {}", member, name.memberless());
                return Err(self.fail(codes::UNKNOWN_MEMBER, constant.span, message));
            }
        };

        let target = self.typespace.get(type_id).clone();
        let converted = match target {
            Type::String { max_size, .. } => match self.typespace.get(from_type) {
                Type::String { max_size: from_max, .. } if *from_max <= max_size => {
                    value.convert(ConstantValueKind::String)
                }
                _ => None,
            },
            Type::Primitive(to) => match self.underlying_primitive(from_type) {
                Some(from)
                    if (from == PrimitiveSubtype::Bool) == (to == PrimitiveSubtype::Bool) =>
                {
                    value.convert(to.value_kind())
                }
                _ => None,
            },
            Type::Identifier { decl: to_decl, .. } => match self.typespace.get(from_type) {
                Type::Identifier { decl: from_decl, .. } if *from_decl == to_decl => Some(value),
                Type::Identifier { .. } => {
                    let message = format!(
                        "mismatched named type assignment, cannot define a constant or default value of type {} using a value of type {}",
                        self.type_name(type_id),
                        self.type_name(from_type)
                    );
                    return Err(self.fail(codes::MISMATCHED_NAMED_TYPE, constant.span, message));
                }
                _ => None,
            },
            _ => None,
        };

        match converted {
            Some(value) => {
                constant.resolve_to(value);
                Ok(())
            }
            None => {
                let message = format!(
                    "{}, of type {}, cannot be converted to type {}",
                    name,
                    self.type_name(from_type),
                    self.type_name(type_id)
                );
                Err(self.fail(codes::CANNOT_CONVERT_CONSTANT, constant.span, message))
            }
        }
    }

    fn referent(&mut self, decl_id: DeclId, name: &Name) -> Referent {
        let member = name.member_name().map(str::to_string);
        let found = match &self.decls[decl_id.index()].kind {
            DeclKind::Const(const_decl) => match member {
                Some(member) => Err(Referent::UnknownMember(member)),
                None => Ok((const_decl.type_ctor.type_id(), const_decl.value.value().clone())),
            },
            DeclKind::Enum(enum_decl) => match member {
                None => Err(Referent::NotAValue),
                Some(member) => enum_decl
                    .members
                    .iter()
                    .find(|m| m.name == member)
                    .map(|m| (TypeId::invalid(), m.value.value().clone()))
                    .ok_or(Referent::UnknownMember(member)),
            },
            DeclKind::Bits(bits_decl) => match member {
                None => Err(Referent::NotAValue),
                Some(member) => bits_decl
                    .members
                    .iter()
                    .find(|m| m.name == member)
                    .map(|m| (TypeId::invalid(), m.value.value().clone()))
                    .ok_or(Referent::UnknownMember(member)),
            },
            _ => Err(Referent::NotAValue),
        };

        match found {
            // Members take the enum/bits type itself.
            Ok((from_type, value)) if !from_type.is_valid() => Referent::Value {
                from_type: self.typespace.intern(Type::Identifier {
                    decl: decl_id,
                    nullability: Nullability::Nonnullable,
                }),
                value,
            },
            Ok((from_type, value)) => Referent::Value { from_type, value },
            Err(referent) => referent,
        }
    }

    /// The primitive behind a primitive, enum or bits type
    pub(crate) fn underlying_primitive(&self, type_id: TypeId) -> Option<PrimitiveSubtype> {
        match self.typespace.get(type_id) {
            Type::Primitive(subtype) => Some(*subtype),
            Type::Identifier { decl, .. } => {
                let subtype_ctor = match &self.decls[decl.index()].kind {
                    DeclKind::Enum(enum_decl) => &enum_decl.subtype_ctor,
                    DeclKind::Bits(bits_decl) => &bits_decl.subtype_ctor,
                    _ => return None,
                };
                match self.typespace.get(subtype_ctor.type_id?) {
                    Type::Primitive(subtype) => Some(*subtype),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_map::{FileId, SourcePosition};

    fn span() -> SourceSpan {
        SourceSpan::single_position(SourcePosition::new(1, 1, 0), FileId::new(0))
    }

    fn numeric(text: &str) -> Constant {
        Constant::literal(Literal {
            kind: LiteralKind::Numeric(text.to_string()),
            span: span(),
        })
    }

    #[test]
    fn test_constant_lifecycle() {
        let mut constant = numeric("3");
        assert!(!constant.is_resolved());
        assert!(constant.maybe_value().is_none());
        constant.resolve_to(ConstantValue::Uint8(3));
        assert!(constant.is_resolved());
        assert_eq!(constant.value(), &ConstantValue::Uint8(3));
        assert_eq!(constant.source_text(), "3");
    }

    #[test]
    #[should_panic(expected = "resolved twice")]
    fn test_resolving_twice_panics() {
        let mut constant = numeric("3");
        constant.resolve_to(ConstantValue::Uint8(3));
        constant.resolve_to(ConstantValue::Uint8(3));
    }

    #[test]
    #[should_panic(expected = "read before resolution")]
    fn test_reading_unresolved_panics() {
        let constant = numeric("3");
        let _ = constant.value();
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut compilation = Compilation::new(
            source_map::SourceMap::new(),
            crate::compilation::CompilationConfig::default(),
        );
        let uint8 = compilation.typespace.intern(Type::Primitive(PrimitiveSubtype::Uint8));
        let uint16 = compilation.typespace.intern(Type::Primitive(PrimitiveSubtype::Uint16));

        let mut constant = numeric("3");
        assert!(compilation.resolve_constant(&mut constant, uint8).is_ok());
        assert_eq!(constant.value(), &ConstantValue::Uint8(3));

        // The second request is a no-op, even against another type.
        assert!(compilation.resolve_constant(&mut constant, uint16).is_ok());
        assert!(compilation.resolve_constant(&mut constant, uint8).is_ok());
        assert_eq!(constant.value(), &ConstantValue::Uint8(3));
        assert_eq!(compilation.reporter().error_count(), 0);
    }

    #[test]
    fn test_failed_resolution_reports_once() {
        let mut compilation = Compilation::new(
            source_map::SourceMap::new(),
            crate::compilation::CompilationConfig::default(),
        );
        let uint8 = compilation.typespace.intern(Type::Primitive(PrimitiveSubtype::Uint8));

        let mut constant = numeric("300");
        assert!(compilation.resolve_constant(&mut constant, uint8).is_err());
        assert!(!constant.is_resolved());
        assert_eq!(compilation.reporter().error_count(), 1);
    }

    #[test]
    fn test_synthesized_is_resolved() {
        let constant = Constant::synthesized(ConstantValue::Uint32(16), span());
        assert!(constant.is_resolved());
        assert_eq!(constant.source_text(), "16");
    }
}
