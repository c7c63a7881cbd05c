//! Consumption: raw files into registered, unresolved declarations
//!
//! Names are bound here (local, imported or member-qualified) so that later
//! passes only deal with fully qualified `Name`s. Protocol methods are
//! rewritten into their message structs and result unions at this point, so
//! the synthesized declarations are sorted and compiled like any other.

use log::{debug, trace};
use raw_ast::{self as raw, Attribute, AttributeList, CompoundIdentifier, Identifier, Ordinal};
use source_map::{FileId, SourceSpan};

use super::attributes::{Placement, RESULT};
use super::constants::Constant;
use super::decls::{
    Bits, ComposedProtocol, Const, Decl, DeclKind, Enum, OrdinalMember, Protocol, ProtocolMethod,
    Service, ServiceMember, Struct, StructMember, Table, TypeAlias, Union, UsedMember, ValueMember,
    XUnion, XUnionMember,
};
use super::ids::{DeclId, LibraryId};
use super::library::Library;
use super::name::{is_valid_library_component, LibraryName, Name};
use super::ordinals::generate_ordinal;
use super::types::{Nullability, TypeConstructor};
use super::typespace::TypeTemplate;
use super::CompileResult;
use crate::compilation::Compilation;
use crate::error_codes::codes;

/// The file a raw node came from, and the library it is consumed into
#[derive(Debug, Clone, Copy)]
struct Scope {
    library: LibraryId,
    file: FileId,
}

/// Run `consume` over every item, keeping all successes or the last error.
fn consume_all<T, U>(
    items: Vec<T>,
    mut consume: impl FnMut(T) -> CompileResult<U>,
) -> CompileResult<Vec<U>> {
    let mut consumed = Vec::with_capacity(items.len());
    let mut result = Ok(());
    for item in items {
        match consume(item) {
            Ok(value) => consumed.push(value),
            Err(error) => result = Err(error),
        }
    }
    result.map(|()| consumed)
}

impl Compilation {
    /// Check that all files name the same, valid library and register it.
    pub(crate) fn register_library(&mut self, files: &[raw::File]) -> CompileResult<LibraryId> {
        let Some(first) = files.first() else {
            return Err(self.fail(
                codes::INVALID_LIBRARY_NAME,
                None,
                "a library needs at least one file",
            ));
        };

        let dotted = first.library_name.to_dotted();
        for file in &files[1..] {
            if file.library_name.to_dotted() != dotted {
                return Err(self.fail(
                    codes::LIBRARY_NAME_MISMATCH,
                    file.library_name.span,
                    "two files in the library disagree about the name of the library",
                ));
            }
        }

        for component in &first.library_name.components {
            if !is_valid_library_component(&component.name) {
                let message = format!("invalid library name component {}", component.name);
                return Err(self.fail(codes::INVALID_LIBRARY_NAME, component.span, message));
            }
        }

        let name = LibraryName::new(
            first
                .library_name
                .components
                .iter()
                .map(|component| component.name.clone())
                .collect(),
        );
        if self.library_ids.contains_key(&name) {
            let message = format!("multiple libraries with the same name {}", name);
            return Err(self.fail(codes::DUPLICATE_LIBRARY, first.library_name.span, message));
        }

        let id = LibraryId::from_index(self.libraries.len());
        self.libraries.push(Library::new(id, name.clone()));
        self.library_ids.insert(name, id);
        Ok(id)
    }

    /// Consume one file into `library`. Keeps going after errors so that one
    /// run reports as much as possible.
    pub(crate) fn consume_file(
        &mut self,
        library: LibraryId,
        file: raw::File,
    ) -> CompileResult<()> {
        let scope = Scope {
            library,
            file: file.file_id(),
        };
        trace!("consuming {}", self.source_map.position_str(&file.span));

        let mut result = self.consume_library_attributes(library, file.attributes);

        macro_rules! consume_each {
            ($nodes:expr, $consume:ident) => {
                for node in $nodes {
                    if let Err(error) = self.$consume(scope, node) {
                        result = Err(error);
                    }
                }
            };
        }

        // Imports first: declarations may not shadow them.
        consume_each!(file.using_list, consume_using);
        consume_each!(file.bits_declarations, consume_bits);
        consume_each!(file.const_declarations, consume_const);
        consume_each!(file.enum_declarations, consume_enum);
        consume_each!(file.protocol_declarations, consume_protocol);
        consume_each!(file.service_declarations, consume_service);
        consume_each!(file.struct_declarations, consume_struct);
        consume_each!(file.table_declarations, consume_table);
        consume_each!(file.union_declarations, consume_union);
        consume_each!(file.xunion_declarations, consume_xunion);

        result
    }

    fn library_name(&self, scope: Scope) -> LibraryName {
        self.libraries[scope.library.index()].name.clone()
    }

    fn decl_name(&self, scope: Scope, identifier: &Identifier) -> Name {
        Name::new(self.library_name(scope), identifier.name.clone(), Some(identifier.span))
    }

    /// Reject repeated attribute names within one list.
    fn consume_attribute_list(
        &mut self,
        attributes: AttributeList,
    ) -> CompileResult<AttributeList> {
        let mut result = Ok(());
        for (index, attribute) in attributes.attributes.iter().enumerate() {
            let previous = attributes.attributes[..index]
                .iter()
                .find(|earlier| earlier.name == attribute.name)
                .map(|earlier| earlier.span);
            if let Some(previous) = previous {
                let message = format!("duplicate attribute with name '{}'", attribute.name);
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_ATTRIBUTE,
                    attribute.span,
                    message,
                    previous,
                ));
            }
        }
        result.map(|()| attributes)
    }

    /// Library attributes may come from any file, but each name only once.
    fn consume_library_attributes(
        &mut self,
        library: LibraryId,
        attributes: AttributeList,
    ) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(attributes)?;
        let mut result = Ok(());
        for attribute in attributes.attributes {
            let previous = self.libraries[library.index()]
                .attributes
                .get(&attribute.name)
                .map(|existing| existing.span);
            match previous {
                Some(previous) => {
                    let message = format!("duplicate attribute with name '{}'", attribute.name);
                    result = Err(self.fail_with_previous(
                        codes::DUPLICATE_ATTRIBUTE,
                        attribute.span,
                        message,
                        previous,
                    ));
                }
                None => self.libraries[library.index()].attributes.push(attribute),
            }
        }
        result
    }

    fn lookup_dependency(&mut self, scope: Scope, path: &[String]) -> Option<LibraryName> {
        let dependency = self.libraries[scope.library.index()]
            .dependencies
            .lookup_and_use(scope.file, path)?;
        Some(self.libraries[dependency.index()].name.clone())
    }

    /// Bind a (possibly dotted) reference to a fully qualified name.
    ///
    /// `Foo` is local. `a.b.Foo` names `Foo` in the library imported as
    /// `a.b`. Failing that, the last component is taken as a member:
    /// `Color.RED` or `a.b.Color.RED`.
    fn resolve_compound(
        &mut self,
        scope: Scope,
        identifier: &CompoundIdentifier,
    ) -> CompileResult<Name> {
        let span = Some(identifier.span);
        let own_library = self.library_name(scope);
        let components: Vec<String> = identifier
            .components
            .iter()
            .map(|component| component.name.clone())
            .collect();
        let last = identifier.last().name.clone();
        let path = &components[..components.len() - 1];

        if path.is_empty() || path == own_library.components() {
            return Ok(Name::new(own_library, last, span));
        }
        if let Some(library) = self.lookup_dependency(scope, path) {
            return Ok(Name::new(library, last, span));
        }

        let decl_name = path[path.len() - 1].clone();
        let library_path = &path[..path.len() - 1];
        if library_path.is_empty() || library_path == own_library.components() {
            return Ok(Name::new(own_library, decl_name, span).with_member(last));
        }
        if let Some(library) = self.lookup_dependency(scope, library_path) {
            return Ok(Name::new(library, decl_name, span).with_member(last));
        }

        let message = format!(
            "unknown dependent library {}; did you forget `using`?",
            path.join(".")
        );
        Err(self.fail(codes::UNKNOWN_DEPENDENT_LIBRARY, identifier.span, message))
    }

    fn consume_type_ctor(
        &mut self,
        scope: Scope,
        raw: raw::TypeConstructor,
    ) -> CompileResult<TypeConstructor> {
        let name = self.resolve_compound(scope, &raw.identifier)?;
        let maybe_arg_type_ctor = match raw.maybe_arg_type {
            Some(arg) => Some(Box::new(self.consume_type_ctor(scope, *arg)?)),
            None => None,
        };
        let maybe_size = match raw.maybe_size {
            Some(size) => Some(self.consume_constant(scope, size)?),
            None => None,
        };
        Ok(TypeConstructor {
            name,
            maybe_arg_type_ctor,
            maybe_handle_subtype: raw.maybe_handle_subtype,
            maybe_size,
            nullability: Nullability::from_flag(raw.nullable),
            span: raw.span,
            type_id: None,
        })
    }

    /// Enums and bits without an explicit subtype are `uint32`.
    fn consume_subtype(
        &mut self,
        scope: Scope,
        maybe_type_ctor: Option<raw::TypeConstructor>,
        span: SourceSpan,
    ) -> CompileResult<TypeConstructor> {
        match maybe_type_ctor {
            Some(type_ctor) => self.consume_type_ctor(scope, type_ctor),
            None => Ok(TypeConstructor::for_decl(
                Name::new(self.library_name(scope), "uint32", Some(span)),
                span,
            )),
        }
    }

    fn consume_constant(&mut self, scope: Scope, raw: raw::Constant) -> CompileResult<Constant> {
        match raw {
            raw::Constant::Identifier(identifier) => {
                let name = self.resolve_compound(scope, &identifier)?;
                Ok(Constant::identifier(name, identifier.span))
            }
            raw::Constant::Literal(literal) => Ok(Constant::literal(literal)),
        }
    }

    /// Add `decl` to the arena, the library and, for type-like kinds, the
    /// typespace.
    fn register_decl(&mut self, scope: Scope, decl: Decl) -> CompileResult<DeclId> {
        let name = decl.name.clone();

        let previous = self.libraries[scope.library.index()].lookup(&name);
        if let Some(previous) = previous {
            let previous_span = self.decls[previous.index()].span();
            return Err(match (name.span(), previous_span) {
                (Some(span), Some(previous_span)) => {
                    let message = format!(
                        "multiple declarations named {}; previous was at {}",
                        name,
                        self.position_str(previous_span)
                    );
                    self.fail_with_previous(codes::NAME_COLLISION, span, message, previous_span)
                }
                (span, _) => {
                    let message = format!("multiple declarations named {}", name);
                    self.fail(codes::NAME_COLLISION, span, message)
                }
            });
        }

        let shadows_import = self.libraries[scope.library.index()]
            .dependencies
            .contains(scope.file, &[name.decl_name().to_string()]);
        if shadows_import {
            let message = format!(
                "declaration name '{}' conflicts with a library import; consider using the 'as' keyword to import the library under a different name",
                name.decl_name()
            );
            return Err(self.fail(codes::DECL_CONFLICTS_WITH_IMPORT, name.span(), message));
        }

        let id = DeclId::from_index(self.decls.len());
        let template = match &decl.kind {
            DeclKind::TypeAlias(_) => Some(TypeTemplate::Alias(id)),
            DeclKind::Const(_) | DeclKind::Service(_) => None,
            _ => Some(TypeTemplate::Decl(id)),
        };

        let library = &mut self.libraries[scope.library.index()];
        let by_kind = &mut library.by_kind;
        let kind_list = match &decl.kind {
            DeclKind::Bits(_) => &mut by_kind.bits,
            DeclKind::Const(_) => &mut by_kind.consts,
            DeclKind::Enum(_) => &mut by_kind.enums,
            DeclKind::Protocol(_) => &mut by_kind.protocols,
            DeclKind::Service(_) => &mut by_kind.services,
            DeclKind::Struct(_) => &mut by_kind.structs,
            DeclKind::Table(_) => &mut by_kind.tables,
            DeclKind::Union(_) => &mut by_kind.unions,
            DeclKind::XUnion(_) => &mut by_kind.xunions,
            DeclKind::TypeAlias(_) => &mut by_kind.type_aliases,
        };
        kind_list.push(id);
        library.declarations.insert(name.clone(), id);

        if let Some(template) = template {
            self.typespace.add_template(name.clone(), template);
        }
        debug!("registered {} {}", decl.kind_name(), name);
        self.decls.push(decl);
        Ok(id)
    }

    fn consume_using(&mut self, scope: Scope, using: raw::Using) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(using.attributes)?;

        // `using Name = type;`
        if let Some(type_ctor) = using.maybe_type_ctor {
            let partial_type_ctor = self.consume_type_ctor(scope, type_ctor)?;
            let name = Name::new(
                self.library_name(scope),
                using.using_path.to_dotted(),
                Some(using.using_path.span),
            );
            let alias = TypeAlias {
                partial_type_ctor,
                resolved_type: None,
            };
            let decl = Decl::new(name, attributes, scope.library, DeclKind::TypeAlias(alias));
            return self.register_decl(scope, decl).map(drop);
        }

        self.validate_attributes_placement(Placement::Using, &attributes)?;

        let name = LibraryName::new(
            using
                .using_path
                .components
                .iter()
                .map(|component| component.name.clone())
                .collect(),
        );
        let span = using.using_path.span;
        let Some(dependency) = self.lookup_library(&name) else {
            let message = format!("could not find library named {}", name);
            return Err(self.fail(codes::UNKNOWN_LIBRARY, span, message));
        };
        if dependency == scope.library {
            let message = format!("library {} cannot import itself", name);
            return Err(self.fail(codes::UNKNOWN_LIBRARY, span, message));
        }
        if !self.libraries[dependency.index()].compiled {
            let message = format!("library {} failed to compile", name);
            return Err(self.fail(codes::DEPENDENCY_FAILED, span, message));
        }

        let alias = using.maybe_alias.as_ref().map(|alias| alias.name.as_str());
        let registered = self.libraries[scope.library.index()]
            .dependencies
            .register(scope.file, using.span, dependency, &name, alias);
        if !registered {
            let message = format!("library {} already imported", name);
            return Err(self.fail(codes::DUPLICATE_IMPORT, span, message));
        }
        trace!("{} imports {}", self.libraries[scope.library.index()].name, name);
        Ok(())
    }

    fn consume_value_member(
        &mut self,
        scope: Scope,
        identifier: Identifier,
        value: raw::Constant,
        attributes: AttributeList,
    ) -> CompileResult<ValueMember> {
        Ok(ValueMember {
            value: self.consume_constant(scope, value)?,
            attributes: self.consume_attribute_list(attributes)?,
            name: identifier.name,
            span: identifier.span,
        })
    }

    fn consume_bits(&mut self, scope: Scope, raw: raw::BitsDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let subtype_ctor = self.consume_subtype(scope, raw.maybe_type_ctor, raw.identifier.span)?;
        let members = consume_all(raw.members, |member| {
            self.consume_value_member(scope, member.identifier, member.value, member.attributes)
        })?;
        let bits = Bits {
            subtype_ctor,
            members,
            mask: 0,
        };
        let decl = Decl::new(
            self.decl_name(scope, &raw.identifier),
            attributes,
            scope.library,
            DeclKind::Bits(bits),
        );
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_enum(&mut self, scope: Scope, raw: raw::EnumDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let subtype_ctor = self.consume_subtype(scope, raw.maybe_type_ctor, raw.identifier.span)?;
        let members = consume_all(raw.members, |member| {
            self.consume_value_member(scope, member.identifier, member.value, member.attributes)
        })?;
        let enum_decl = Enum {
            subtype_ctor,
            members,
            subtype: None,
        };
        let decl = Decl::new(
            self.decl_name(scope, &raw.identifier),
            attributes,
            scope.library,
            DeclKind::Enum(enum_decl),
        );
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_const(&mut self, scope: Scope, raw: raw::ConstDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let const_decl = Const {
            type_ctor: self.consume_type_ctor(scope, raw.type_ctor)?,
            value: self.consume_constant(scope, raw.constant)?,
        };
        let decl = Decl::new(
            self.decl_name(scope, &raw.identifier),
            attributes,
            scope.library,
            DeclKind::Const(const_decl),
        );
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_struct(&mut self, scope: Scope, raw: raw::StructDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let members = consume_all(raw.members, |member| {
            let maybe_default_value = match member.maybe_default_value {
                Some(value) => Some(self.consume_constant(scope, value)?),
                None => None,
            };
            Ok(StructMember {
                type_ctor: self.consume_type_ctor(scope, member.type_ctor)?,
                name: member.identifier.name,
                span: member.identifier.span,
                maybe_default_value,
                attributes: self.consume_attribute_list(member.attributes)?,
            })
        })?;
        let struct_decl = Struct {
            members,
            anonymous: false,
            is_request_or_response: false,
        };
        let decl = Decl::new(
            self.decl_name(scope, &raw.identifier),
            attributes,
            scope.library,
            DeclKind::Struct(struct_decl),
        );
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_used_member(
        &mut self,
        scope: Scope,
        type_ctor: raw::TypeConstructor,
        identifier: Identifier,
        attributes: AttributeList,
    ) -> CompileResult<UsedMember> {
        Ok(UsedMember {
            type_ctor: self.consume_type_ctor(scope, type_ctor)?,
            name: identifier.name,
            span: identifier.span,
            attributes: self.consume_attribute_list(attributes)?,
        })
    }

    fn consume_table(&mut self, scope: Scope, raw: raw::TableDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let members = consume_all(raw.members, |member| {
            let maybe_used = match member.maybe_used {
                Some(used) => {
                    if let Some(default) = &used.maybe_default_value {
                        return Err(self.fail(
                            codes::TABLE_DEFAULT,
                            default.span(),
                            "defaults on table members are not supported",
                        ));
                    }
                    Some(self.consume_used_member(
                        scope,
                        used.type_ctor,
                        used.identifier,
                        used.attributes,
                    )?)
                }
                None => None,
            };
            Ok(OrdinalMember {
                ordinal: member.ordinal,
                maybe_used,
                span: member.span,
            })
        })?;
        let decl = Decl::new(
            self.decl_name(scope, &raw.identifier),
            attributes,
            scope.library,
            DeclKind::Table(Table { members }),
        );
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_union(&mut self, scope: Scope, raw: raw::UnionDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let name = self.decl_name(scope, &raw.identifier);
        let members = consume_all(raw.members, |member| {
            let maybe_used = match member.maybe_used {
                Some(used) => Some(self.consume_used_member(
                    scope,
                    used.type_ctor,
                    used.identifier,
                    used.attributes,
                )?),
                None => None,
            };
            Ok(OrdinalMember {
                ordinal: member.ordinal,
                maybe_used,
                span: member.span,
            })
        })?;
        if !members.iter().any(|member| member.maybe_used.is_some()) {
            let message = format!("union {} must have at least one non-reserved member", name);
            return Err(self.fail(codes::EMPTY_UNION, raw.identifier.span, message));
        }
        let decl = Decl::new(name, attributes, scope.library, DeclKind::Union(Union { members }));
        self.register_decl(scope, decl).map(drop)
    }

    /// Members take explicit ordinals, or all of them hashed ordinals.
    fn consume_xunion(&mut self, scope: Scope, raw: raw::XUnionDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let name = self.decl_name(scope, &raw.identifier);
        let library_name = self.library_name(scope);
        let explicit_style = raw
            .members
            .first()
            .is_some_and(|member| member.maybe_ordinal.is_some());

        let members = consume_all(raw.members, |member| {
            let maybe_used = match member.maybe_used {
                Some(used) => Some(self.consume_used_member(
                    scope,
                    used.type_ctor,
                    used.identifier,
                    used.attributes,
                )?),
                None => None,
            };
            let (ordinal, hashed) = match (member.maybe_ordinal, &maybe_used) {
                (Some(ordinal), _) => (ordinal, false),
                (None, Some(used)) => {
                    let value = generate_ordinal(
                        &library_name,
                        name.decl_name(),
                        &used.attributes,
                        &used.name,
                    );
                    (Ordinal { value, span: used.span }, true)
                }
                (None, None) => {
                    return Err(self.fail(
                        codes::RESERVED_WITHOUT_ORDINAL,
                        member.span,
                        "reserved xunion members need an explicit ordinal",
                    ))
                }
            };
            if hashed == explicit_style {
                let message = format!("xunion {} mixes explicit and hashed ordinals", name);
                return Err(self.fail(codes::MIXED_ORDINAL_STYLES, member.span, message));
            }
            if hashed && ordinal.value == 0 {
                return Err(self.fail(
                    codes::ZERO_ORDINAL,
                    ordinal.span,
                    "ordinal value 0 disallowed",
                ));
            }
            Ok(XUnionMember {
                ordinal,
                hashed,
                maybe_used,
                span: member.span,
            })
        })?;

        let decl = Decl::new(name, attributes, scope.library, DeclKind::XUnion(XUnion { members }));
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_protocol(
        &mut self,
        scope: Scope,
        raw: raw::ProtocolDeclaration,
    ) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let name = self.decl_name(scope, &raw.identifier);

        let mut result = Ok(());
        let mut composed_protocols: Vec<ComposedProtocol> = Vec::new();
        for compose in raw.composed_protocols {
            let composed = match self.resolve_compound(scope, &compose.protocol_name) {
                Ok(composed) => composed,
                Err(error) => {
                    result = Err(error);
                    continue;
                }
            };
            let previous = composed_protocols
                .iter()
                .find(|existing| existing.name == composed)
                .map(|existing| existing.span);
            match previous {
                Some(previous) => {
                    result = Err(self.fail_with_previous(
                        codes::DUPLICATE_COMPOSITION,
                        compose.span,
                        "protocol composed multiple times",
                        previous,
                    ));
                }
                None => composed_protocols.push(ComposedProtocol {
                    name: composed,
                    span: compose.span,
                }),
            }
        }

        let protocol_name = raw.identifier.name.clone();
        let methods = consume_all(raw.methods, |method| {
            self.consume_method(scope, &protocol_name, method)
        });
        result?;
        let protocol = Protocol {
            composed_protocols,
            methods: methods?,
            all_methods: Vec::new(),
        };
        let decl = Decl::new(name, attributes, scope.library, DeclKind::Protocol(protocol));
        self.register_decl(scope, decl).map(drop)
    }

    fn consume_method(
        &mut self,
        scope: Scope,
        protocol_name: &str,
        raw: raw::ProtocolMethod,
    ) -> CompileResult<ProtocolMethod> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let method_name = raw.identifier.name.clone();
        let method_span = raw.identifier.span;
        let library_name = self.library_name(scope);

        let value = generate_ordinal(&library_name, protocol_name, &attributes, &method_name);
        if value == 0 {
            return Err(self.fail(codes::ZERO_ORDINAL, method_span, "ordinal value 0 disallowed"));
        }

        let message_name = |suffix: &str, span: SourceSpan| {
            Name::new(
                library_name.clone(),
                format!("{}_{}_{}", protocol_name, method_name, suffix),
                Some(span),
            )
        };

        let maybe_request = match raw.maybe_request {
            Some(parameters) => {
                let name = message_name("Request", parameters.span);
                Some(self.consume_parameter_list(scope, name, parameters, true)?)
            }
            None => None,
        };

        let response_and_error = (raw.maybe_response, raw.maybe_error_ctor);
        let (maybe_response, maybe_result_union) = match response_and_error {
            (response, Some(error_ctor)) => {
                let parameters = response.unwrap_or(raw::ParameterList {
                    parameters: Vec::new(),
                    span: method_span,
                });
                let span = parameters.span;
                let payload = self.consume_parameter_list(
                    scope,
                    message_name("Response", span),
                    parameters,
                    false,
                )?;
                let error_ctor = self.consume_type_ctor(scope, error_ctor)?;
                let result_union = self.synthesize_result_union(
                    scope,
                    message_name("Result", span),
                    payload,
                    error_ctor,
                )?;
                let message = self.synthesize_result_message(
                    scope,
                    message_name("ResultMessage", span),
                    result_union,
                    span,
                )?;
                (Some(message), Some(result_union))
            }
            (Some(parameters), None) => {
                let name = message_name("Response", parameters.span);
                (Some(self.consume_parameter_list(scope, name, parameters, true)?), None)
            }
            (None, None) => (None, None),
        };

        Ok(ProtocolMethod {
            attributes,
            name: method_name,
            span: method_span,
            generated_ordinal: Ordinal {
                value,
                span: method_span,
            },
            maybe_request,
            maybe_response,
            maybe_result_union,
        })
    }

    /// An anonymous struct holding a method's parameters
    fn consume_parameter_list(
        &mut self,
        scope: Scope,
        name: Name,
        parameters: raw::ParameterList,
        is_message: bool,
    ) -> CompileResult<DeclId> {
        let members = consume_all(parameters.parameters, |parameter| {
            Ok(StructMember {
                type_ctor: self.consume_type_ctor(scope, parameter.type_ctor)?,
                name: parameter.identifier.name,
                span: parameter.identifier.span,
                maybe_default_value: None,
                attributes: self.consume_attribute_list(parameter.attributes)?,
            })
        })?;
        let message = Struct {
            members,
            anonymous: true,
            is_request_or_response: is_message,
        };
        let decl = Decl::new(
            name,
            AttributeList::default(),
            scope.library,
            DeclKind::Struct(message),
        );
        self.register_decl(scope, decl)
    }

    /// `[Result] union { 1: Payload response; 2: E err; }`
    fn synthesize_result_union(
        &mut self,
        scope: Scope,
        name: Name,
        payload: DeclId,
        error_ctor: TypeConstructor,
    ) -> CompileResult<DeclId> {
        let span = error_ctor.span;
        let payload_name = self.decls[payload.index()].name.clone();
        let member = |value: u32, type_ctor: TypeConstructor, member_name: &str| OrdinalMember {
            ordinal: Ordinal { value, span },
            maybe_used: Some(UsedMember {
                type_ctor,
                name: member_name.to_string(),
                span,
                attributes: AttributeList::default(),
            }),
            span,
        };
        let members = vec![
            member(1, TypeConstructor::for_decl(payload_name, span), "response"),
            member(2, error_ctor, "err"),
        ];
        let attributes = AttributeList::new(vec![Attribute {
            name: RESULT.to_string(),
            value: String::new(),
            span,
        }]);
        let decl = Decl::new(name, attributes, scope.library, DeclKind::Union(Union { members }));
        self.register_decl(scope, decl)
    }

    /// The response message of an error method: `{ Result result; }`
    fn synthesize_result_message(
        &mut self,
        scope: Scope,
        name: Name,
        result_union: DeclId,
        span: SourceSpan,
    ) -> CompileResult<DeclId> {
        let union_name = self.decls[result_union.index()].name.clone();
        let message = Struct {
            members: vec![StructMember {
                type_ctor: TypeConstructor::for_decl(union_name, span),
                name: "result".to_string(),
                span,
                maybe_default_value: None,
                attributes: AttributeList::default(),
            }],
            anonymous: true,
            is_request_or_response: true,
        };
        let decl = Decl::new(
            name,
            AttributeList::default(),
            scope.library,
            DeclKind::Struct(message),
        );
        self.register_decl(scope, decl)
    }

    fn consume_service(&mut self, scope: Scope, raw: raw::ServiceDeclaration) -> CompileResult<()> {
        let attributes = self.consume_attribute_list(raw.attributes)?;
        let members = consume_all(raw.members, |member| {
            Ok(ServiceMember {
                type_ctor: self.consume_type_ctor(scope, member.type_ctor)?,
                name: member.identifier.name,
                span: member.identifier.span,
                attributes: self.consume_attribute_list(member.attributes)?,
            })
        })?;
        let decl = Decl::new(
            self.decl_name(scope, &raw.identifier),
            attributes,
            scope.library,
            DeclKind::Service(Service { members }),
        );
        self.register_decl(scope, decl).map(drop)
    }
}
