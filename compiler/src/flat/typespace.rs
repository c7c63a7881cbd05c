//! The typespace: type arena and type-template registry
//!
//! Every type produced during a compilation is interned here and referred to
//! by `TypeId`. Type constructors are turned into types by looking up a
//! template for the constructor's name (built-ins by unqualified name first,
//! then declarations and aliases by fully qualified name) and letting the
//! template check its own parameterization rules.

use fxhash::FxHashMap;
use log::trace;
use source_map::SourceSpan;

use super::decls::{DeclKind, DeclState};
use super::ids::{DeclId, TypeId};
use super::name::Name;
use super::types::{
    HandleSubtype, Nullability, PrimitiveSubtype, Type, TypeConstructor, UNBOUNDED,
};
use super::values::ConstantValue;
use super::{CompileResult, ErrorReported};
use crate::compilation::Compilation;
use crate::error_codes::codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTemplate {
    Primitive(PrimitiveSubtype),
    Array,
    Vector,
    String,
    Handle,
    Request,
    /// A user declaration usable as a type
    Decl(DeclId),
    /// `using Name = type;`
    Alias(DeclId),
}

#[derive(Debug)]
pub struct Typespace {
    types: Vec<Type>,
    interned: FxHashMap<Type, TypeId>,
    templates: FxHashMap<Name, TypeTemplate>,
    size_type: TypeId,
}

impl Default for Typespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Typespace {
    /// A typespace holding only the built-in templates
    pub fn new() -> Self {
        let mut typespace = Self {
            types: Vec::new(),
            interned: FxHashMap::default(),
            templates: FxHashMap::default(),
            size_type: TypeId::invalid(),
        };

        for subtype in PrimitiveSubtype::ALL {
            typespace.add_template(Name::builtin(subtype.name()), TypeTemplate::Primitive(subtype));
        }
        typespace.add_template(Name::builtin("array"), TypeTemplate::Array);
        typespace.add_template(Name::builtin("vector"), TypeTemplate::Vector);
        typespace.add_template(Name::builtin("string"), TypeTemplate::String);
        typespace.add_template(Name::builtin("handle"), TypeTemplate::Handle);
        typespace.add_template(Name::builtin("request"), TypeTemplate::Request);

        typespace.size_type = typespace.intern(Type::Primitive(PrimitiveSubtype::Uint32));
        typespace
    }

    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = TypeId::from_index(self.types.len());
        trace!("interned {:?} as {}", ty, id);
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, ty)| (TypeId::from_index(index), ty))
    }

    /// `uint32`, the type of every size bound
    pub fn size_type(&self) -> TypeId {
        self.size_type
    }

    pub fn add_template(&mut self, name: Name, template: TypeTemplate) {
        self.templates.insert(name, template);
    }

    pub fn lookup_template(&self, name: &Name) -> Option<TypeTemplate> {
        if name.member_name().is_none() {
            if let Some(template) = self.templates.get(&Name::builtin(name.decl_name())) {
                return Some(*template);
            }
        }
        self.templates.get(name).copied()
    }
}

/// Parameters supplied at a type use site
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeRequest {
    pub arg_type: Option<TypeId>,
    pub handle_subtype: Option<HandleSubtype>,
    pub size: Option<u32>,
    pub nullability: Nullability,
    pub span: SourceSpan,
}

impl Compilation {
    /// Compile a type constructor (and its argument) into a type, caching the result.
    pub(crate) fn compile_type_ctor(
        &mut self,
        type_ctor: &mut TypeConstructor,
    ) -> CompileResult<TypeId> {
        if let Some(type_id) = type_ctor.type_id {
            return Ok(type_id);
        }

        let arg_type = match type_ctor.maybe_arg_type_ctor.as_mut() {
            Some(arg) => Some(self.compile_type_ctor(arg)?),
            None => None,
        };
        let size = match type_ctor.maybe_size.as_mut() {
            Some(size) => Some(self.resolve_size(size)?),
            None => None,
        };

        let request = TypeRequest {
            arg_type,
            handle_subtype: type_ctor.maybe_handle_subtype,
            size,
            nullability: type_ctor.nullability,
            span: type_ctor.span,
        };
        let type_id = self.create_type(&type_ctor.name, request)?;
        type_ctor.type_id = Some(type_id);
        Ok(type_id)
    }

    pub(crate) fn resolve_size(
        &mut self,
        size: &mut super::constants::Constant,
    ) -> CompileResult<u32> {
        let size_type = self.typespace.size_type();
        self.resolve_constant(size, size_type)?;
        match size.value() {
            ConstantValue::Uint32(value) => Ok(*value),
            other => panic!("compiler bug: size resolved to {:?}", other),
        }
    }

    /// Look up the template for `name` and instantiate it.
    pub(crate) fn create_type(
        &mut self,
        name: &Name,
        request: TypeRequest,
    ) -> CompileResult<TypeId> {
        match self.typespace.lookup_template(name) {
            Some(template) => self.instantiate(name, template, request),
            None => {
                let message = format!("unknown type {}", name.decl_name());
                Err(self.fail(codes::UNKNOWN_TYPE, request.span, message))
            }
        }
    }

    fn template_error(
        &mut self,
        name: &Name,
        request: &TypeRequest,
        code: u16,
        what: &str,
    ) -> ErrorReported {
        // Built-ins are reached through names bound to the using library.
        let display = match self.typespace.lookup_template(name) {
            Some(TypeTemplate::Decl(_) | TypeTemplate::Alias(_)) => name.flat_name(),
            _ => name.decl_name().to_string(),
        };
        self.fail(code, request.span, format!("{} {}", display, what))
    }

    fn instantiate(
        &mut self,
        name: &Name,
        template: TypeTemplate,
        request: TypeRequest,
    ) -> CompileResult<TypeId> {
        if request.handle_subtype.is_some()
            && !matches!(template, TypeTemplate::Handle | TypeTemplate::Alias(_))
        {
            return Err(self.template_error(
                name,
                &request,
                codes::CANNOT_BE_PARAMETRIZED,
                "cannot have a handle subtype",
            ));
        }

        let ty = match template {
            TypeTemplate::Primitive(subtype) => {
                if request.arg_type.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_BE_PARAMETRIZED,
                        "cannot be parametrized",
                    ));
                }
                if request.size.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_HAVE_SIZE,
                        "cannot have size",
                    ));
                }
                if request.nullability.is_nullable() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_BE_NULLABLE,
                        "cannot be nullable",
                    ));
                }
                Type::Primitive(subtype)
            }
            TypeTemplate::Array => {
                let Some(element) = request.arg_type else {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::MUST_BE_PARAMETRIZED,
                        "must be parametrized",
                    ));
                };
                let Some(size) = request.size else {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::MUST_HAVE_SIZE,
                        "must have size",
                    ));
                };
                if size == 0 {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::MUST_HAVE_SIZE,
                        "must have non-zero size",
                    ));
                }
                if request.nullability.is_nullable() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_BE_NULLABLE,
                        "cannot be nullable",
                    ));
                }
                Type::Array { element, size }
            }
            TypeTemplate::Vector => {
                let Some(element) = request.arg_type else {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::MUST_BE_PARAMETRIZED,
                        "must be parametrized",
                    ));
                };
                Type::Vector {
                    element,
                    max_size: request.size.unwrap_or(UNBOUNDED),
                    nullability: request.nullability,
                }
            }
            TypeTemplate::String => {
                if request.arg_type.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_BE_PARAMETRIZED,
                        "cannot be parametrized",
                    ));
                }
                Type::String {
                    max_size: request.size.unwrap_or(UNBOUNDED),
                    nullability: request.nullability,
                }
            }
            TypeTemplate::Handle => {
                if request.arg_type.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_BE_PARAMETRIZED,
                        "cannot be parametrized",
                    ));
                }
                if request.size.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_HAVE_SIZE,
                        "cannot have size",
                    ));
                }
                Type::Handle {
                    subtype: request.handle_subtype.unwrap_or(HandleSubtype::Handle),
                    nullability: request.nullability,
                }
            }
            TypeTemplate::Request => {
                let Some(arg_type) = request.arg_type else {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::MUST_BE_PARAMETRIZED,
                        "must be parametrized",
                    ));
                };
                let protocol = match self.typespace.get(arg_type) {
                    Type::Identifier { decl, .. }
                        if matches!(self.decls[decl.index()].kind, DeclKind::Protocol(_)) =>
                    {
                        *decl
                    }
                    _ => {
                        return Err(self.template_error(
                            name,
                            &request,
                            codes::MUST_BE_PROTOCOL,
                            "must be a protocol",
                        ))
                    }
                };
                if request.size.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::CANNOT_HAVE_SIZE,
                        "cannot have size",
                    ));
                }
                Type::RequestHandle {
                    protocol,
                    nullability: request.nullability,
                }
            }
            TypeTemplate::Decl(decl_id) => return self.instantiate_decl(name, decl_id, request),
            TypeTemplate::Alias(alias_id) => return self.instantiate_alias(name, alias_id, request),
        };
        Ok(self.typespace.intern(ty))
    }

    fn instantiate_decl(
        &mut self,
        name: &Name,
        decl_id: DeclId,
        request: TypeRequest,
    ) -> CompileResult<TypeId> {
        if request.arg_type.is_some() {
            return Err(self.template_error(
                name,
                &request,
                codes::CANNOT_BE_PARAMETRIZED,
                "cannot be parametrized",
            ));
        }
        if request.size.is_some() {
            return Err(self.template_error(
                name,
                &request,
                codes::CANNOT_HAVE_SIZE,
                "cannot have size",
            ));
        }

        // Protocols are only ever referenced, never stored inline, so they
        // do not need to be compiled first.
        if !matches!(self.decls[decl_id.index()].kind, DeclKind::Protocol(_)) {
            self.compile_decl(decl_id)?;
        }

        let rejects_nullable = matches!(
            self.decls[decl_id.index()].kind,
            DeclKind::Enum(_) | DeclKind::Bits(_) | DeclKind::Table(_)
        );
        if rejects_nullable && request.nullability.is_nullable() {
            return Err(self.template_error(
                name,
                &request,
                codes::CANNOT_BE_NULLABLE,
                "cannot be nullable",
            ));
        }

        Ok(self.typespace.intern(Type::Identifier {
            decl: decl_id,
            nullability: request.nullability,
        }))
    }

    /// Fill in whatever the alias fixed and re-dispatch on the aliased name.
    fn instantiate_alias(
        &mut self,
        name: &Name,
        alias_id: DeclId,
        request: TypeRequest,
    ) -> CompileResult<TypeId> {
        match self.decls[alias_id.index()].state {
            DeclState::Compiling => {
                let message = format!("type alias {} includes a cycle", name.flat_name());
                return Err(self.fail(codes::RECURSIVE_ALIAS, request.span, message));
            }
            DeclState::NotStarted | DeclState::Compiled(_) => self.compile_decl(alias_id)?,
        }

        let partial = match &self.decls[alias_id.index()].kind {
            DeclKind::TypeAlias(alias) => alias.partial_type_ctor.clone(),
            other => panic!("compiler bug: alias template bound to {:?}", other),
        };

        let arg_type = match &partial.maybe_arg_type_ctor {
            Some(arg) => {
                if request.arg_type.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::ALIAS_PARAMETRIZED_TWICE,
                        "cannot parametrize twice",
                    ));
                }
                Some(arg.type_id())
            }
            None => request.arg_type,
        };
        let size = match &partial.maybe_size {
            Some(size) => {
                if request.size.is_some() {
                    return Err(self.template_error(
                        name,
                        &request,
                        codes::ALIAS_PARAMETRIZED_TWICE,
                        "cannot bound twice",
                    ));
                }
                size.value().as_u64().map(|value| value as u32)
            }
            None => request.size,
        };
        let nullability = if partial.nullability.is_nullable() {
            if request.nullability.is_nullable() {
                return Err(self.template_error(
                    name,
                    &request,
                    codes::ALIAS_PARAMETRIZED_TWICE,
                    "cannot indicate nullability twice",
                ));
            }
            Nullability::Nullable
        } else {
            request.nullability
        };

        let aliased = TypeRequest {
            arg_type,
            handle_subtype: partial.maybe_handle_subtype.or(request.handle_subtype),
            size,
            nullability,
            span: request.span,
        };
        self.create_type(&partial.name, aliased)
    }

    /// Human-readable rendering used in diagnostics
    pub fn type_name(&self, type_id: TypeId) -> String {
        fn suffix(nullability: Nullability) -> &'static str {
            if nullability.is_nullable() {
                "?"
            } else {
                ""
            }
        }
        fn bound(max_size: u32) -> String {
            if max_size == UNBOUNDED {
                String::new()
            } else {
                format!(":{}", max_size)
            }
        }

        match self.typespace.get(type_id) {
            Type::Primitive(subtype) => subtype.name().to_string(),
            Type::Array { element, size } => format!(
                "array<{}>:{}",
                self.type_name(*element),
                size
            ),
            Type::Vector { element, max_size, nullability } => format!(
                "vector<{}>{}{}",
                self.type_name(*element),
                bound(*max_size),
                suffix(*nullability)
            ),
            Type::String { max_size, nullability } => {
                format!("string{}{}", bound(*max_size), suffix(*nullability))
            }
            Type::Handle { subtype, nullability } => match subtype {
                HandleSubtype::Handle => format!("handle{}", suffix(*nullability)),
                other => format!("handle<{}>{}", other, suffix(*nullability)),
            },
            Type::RequestHandle { protocol, nullability } => format!(
                "request<{}>{}",
                self.decls[protocol.index()].name.flat_name(),
                suffix(*nullability)
            ),
            Type::Identifier { decl, nullability } => format!(
                "{}{}",
                self.decls[decl.index()].name.flat_name(),
                suffix(*nullability)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::name::LibraryName;

    #[test]
    fn test_interning_is_stable() {
        let mut typespace = Typespace::new();
        let a = typespace.intern(Type::String {
            max_size: 4,
            nullability: Nullability::Nonnullable,
        });
        let b = typespace.intern(Type::String {
            max_size: 4,
            nullability: Nullability::Nonnullable,
        });
        let c = typespace.intern(Type::String {
            max_size: 4,
            nullability: Nullability::Nullable,
        });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_size_type_is_uint32() {
        let typespace = Typespace::new();
        assert_eq!(
            typespace.get(typespace.size_type()),
            &Type::Primitive(PrimitiveSubtype::Uint32)
        );
    }

    #[test]
    fn test_builtins_win_over_declarations() {
        let mut typespace = Typespace::new();
        let library = LibraryName::from_dotted("example");
        let local_vector = Name::new(library.clone(), "vector", None);
        typespace.add_template(local_vector.clone(), TypeTemplate::Decl(DeclId::from_index(0)));
        assert_eq!(typespace.lookup_template(&local_vector), Some(TypeTemplate::Vector));

        let foo = Name::new(library, "Foo", None);
        assert_eq!(typespace.lookup_template(&foo), None);
        typespace.add_template(foo.clone(), TypeTemplate::Decl(DeclId::from_index(3)));
        assert_eq!(
            typespace.lookup_template(&foo),
            Some(TypeTemplate::Decl(DeclId::from_index(3)))
        );
    }
}
