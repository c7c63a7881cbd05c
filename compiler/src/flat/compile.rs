//! Per-kind declaration compilation
//!
//! Declarations are compiled in dependency order, but any of them may be
//! compiled early when a type or constant needs it. `compile_decl` is the
//! single entry point and memoises the outcome in `Decl::state`.

use std::collections::hash_map::Entry;
use std::collections::BTreeSet;

use fxhash::FxHashMap;
use log::{debug, trace};
use raw_ast::Ordinal;
use source_map::SourceSpan;

use super::attributes::FRAGILE_BASE;
use super::decls::{
    Bits, Const, DeclKind, DeclState, Enum, MethodRef, Protocol, ProtocolMethod, Service, Struct,
    TypeAlias, UsedMember, ValueMember,
};
use super::ids::{DeclId, LibraryId, TypeId};
use super::name::Name;
use super::types::Type;
use super::typespace::TypeTemplate;
use super::CompileResult;
use crate::compilation::Compilation;
use crate::error_codes::codes;

/// Containers whose members carry ordinals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrdinalContainer {
    Table,
    Union,
    XUnion,
}

impl OrdinalContainer {
    fn name(self) -> &'static str {
        match self {
            OrdinalContainer::Table => "table",
            OrdinalContainer::Union => "union",
            OrdinalContainer::XUnion => "xunion",
        }
    }

    fn title(self) -> &'static str {
        match self {
            OrdinalContainer::Table => "Table",
            OrdinalContainer::Union => "Union",
            OrdinalContainer::XUnion => "XUnion",
        }
    }
}

impl Compilation {
    /// Compile every declaration of `library` in sorted order. A failed
    /// declaration does not stop the others.
    pub(crate) fn compile_library_decls(&mut self, library: LibraryId) -> CompileResult<()> {
        let order = self.libraries[library.index()].declaration_order.clone();
        let mut result = Ok(());
        for decl in order {
            if let Err(error) = self.compile_decl(decl) {
                result = Err(error);
            }
        }
        result
    }

    /// Compile `decl` unless that already happened.
    ///
    /// Re-entering a declaration that is still being compiled is not an
    /// error here: the sort guarantees it was reached through an out-of-line
    /// reference. The declaration is marked recursive instead.
    pub(crate) fn compile_decl(&mut self, decl: DeclId) -> CompileResult<()> {
        match self.decls[decl.index()].state {
            DeclState::Compiled(result) => return result,
            DeclState::Compiling => {
                trace!("{} is recursive", self.decls[decl.index()].name);
                self.decls[decl.index()].recursive = true;
                return Ok(());
            }
            DeclState::NotStarted => {}
        }

        self.decls[decl.index()].state = DeclState::Compiling;
        let mut kind = self.decls[decl.index()].kind.clone();
        let result = match &mut kind {
            DeclKind::Bits(bits) => self.compile_bits(decl, bits),
            DeclKind::Const(const_decl) => self.compile_const(const_decl),
            DeclKind::Enum(enum_decl) => self.compile_enum(decl, enum_decl),
            DeclKind::Protocol(protocol) => self.compile_protocol(decl, protocol),
            DeclKind::Service(service) => self.compile_service(service),
            DeclKind::Struct(struct_decl) => self.compile_struct(struct_decl),
            DeclKind::Table(table) => {
                let members = table
                    .members
                    .iter_mut()
                    .map(|member| (member.ordinal, member.maybe_used.as_mut()))
                    .collect();
                self.compile_ordinal_members(decl, OrdinalContainer::Table, members, true)
            }
            DeclKind::Union(union_decl) => {
                let members = union_decl
                    .members
                    .iter_mut()
                    .map(|member| (member.ordinal, member.maybe_used.as_mut()))
                    .collect();
                self.compile_ordinal_members(decl, OrdinalContainer::Union, members, true)
            }
            DeclKind::XUnion(xunion) => {
                let dense = !xunion.members.iter().any(|member| member.hashed);
                let members = xunion
                    .members
                    .iter_mut()
                    .map(|member| (member.ordinal, member.maybe_used.as_mut()))
                    .collect();
                self.compile_ordinal_members(decl, OrdinalContainer::XUnion, members, dense)
            }
            DeclKind::TypeAlias(alias) => self.compile_type_alias(alias),
        };

        let decl_data = &mut self.decls[decl.index()];
        decl_data.kind = kind;
        decl_data.state = DeclState::Compiled(result);
        match result {
            Ok(()) => debug!("compiled {} {}", decl_data.kind_name(), decl_data.name),
            Err(_) => debug!("failed to compile {} {}", decl_data.kind_name(), decl_data.name),
        }
        result
    }

    /// A method visible on some protocol
    pub fn method(&self, method_ref: MethodRef) -> &ProtocolMethod {
        match &self.decls[method_ref.protocol.index()].kind {
            DeclKind::Protocol(protocol) => &protocol.methods[method_ref.index],
            other => panic!("compiler bug: method reference into a {}", other.kind_name()),
        }
    }

    fn compile_bits(&mut self, decl: DeclId, bits: &mut Bits) -> CompileResult<()> {
        let subtype_id = self.compile_type_ctor(&mut bits.subtype_ctor)?;
        match self.typespace.get(subtype_id).clone() {
            Type::Primitive(subtype) if subtype.is_unsigned_integer() => {}
            _ => {
                let message = format!(
                    "bits may only be of unsigned integral primitive type, found {}",
                    self.type_name(subtype_id)
                );
                return Err(self.fail(codes::INVALID_SUBTYPE, bits.subtype_ctor.span, message));
            }
        }

        let mut result = self.compile_value_members(decl, &mut bits.members, subtype_id);
        let mut mask = 0u64;
        for member in &bits.members {
            let Some(value) = member.value.maybe_value().and_then(|value| value.as_u64()) else {
                continue;
            };
            if !value.is_power_of_two() {
                let message = format!("bits members must be powers of two; {} is not", member.name);
                result = Err(self.fail(codes::BITS_MEMBER_NOT_POWER_OF_TWO, member.span, message));
                continue;
            }
            mask |= value;
        }
        result?;
        bits.mask = mask;
        Ok(())
    }

    fn compile_enum(&mut self, decl: DeclId, enum_decl: &mut Enum) -> CompileResult<()> {
        let subtype_id = self.compile_type_ctor(&mut enum_decl.subtype_ctor)?;
        let subtype = match self.typespace.get(subtype_id).clone() {
            Type::Primitive(subtype) if subtype.is_integer() => subtype,
            _ => {
                let message = format!(
                    "enums may only be of integral primitive type, found {}",
                    self.type_name(subtype_id)
                );
                return Err(self.fail(codes::INVALID_SUBTYPE, enum_decl.subtype_ctor.span, message));
            }
        };
        enum_decl.subtype = Some(subtype);
        self.compile_value_members(decl, &mut enum_decl.members, subtype_id)
    }

    /// Resolve member values against `type_id`; names and values must be unique.
    fn compile_value_members(
        &mut self,
        decl: DeclId,
        members: &mut [ValueMember],
        type_id: TypeId,
    ) -> CompileResult<()> {
        let container = format!(
            "{} {}",
            self.decls[decl.index()].kind_name(),
            self.decls[decl.index()].name
        );

        let mut result = Ok(());
        for index in 0..members.len() {
            let (earlier, rest) = members.split_at_mut(index);
            let member = &mut rest[0];

            if let Some(previous) = earlier.iter().find(|other| other.name == member.name) {
                let message = format!(
                    "name of member {} conflicts with previously declared member in the {}",
                    member.name, container
                );
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_MEMBER_NAME,
                    member.span,
                    message,
                    previous.span,
                ));
            }

            if let Err(error) = self.resolve_constant(&mut member.value, type_id) {
                result = Err(error);
                continue;
            }
            let value = member.value.value();
            let previous = earlier
                .iter()
                .find(|other| other.value.maybe_value() == Some(value));
            if let Some(previous) = previous {
                let message = format!(
                    "value of member {} conflicts with previously declared member {} in the {}",
                    member.name, previous.name, container
                );
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_MEMBER_VALUE,
                    member.span,
                    message,
                    previous.span,
                ));
            }
        }
        result
    }

    fn compile_const(&mut self, const_decl: &mut Const) -> CompileResult<()> {
        let type_id = self.compile_type_ctor(&mut const_decl.type_ctor)?;
        if !self.type_can_be_const(type_id) {
            let message = format!("invalid constant type {}", self.type_name(type_id));
            return Err(self.fail(codes::INVALID_CONSTANT_TYPE, const_decl.type_ctor.span, message));
        }
        self.resolve_constant(&mut const_decl.value, type_id)
    }

    fn compile_struct(&mut self, struct_decl: &mut Struct) -> CompileResult<()> {
        let what = if struct_decl.anonymous {
            "Multiple parameters with the same name in a method"
        } else {
            "Multiple struct fields with the same name"
        };

        let mut result = Ok(());
        for index in 0..struct_decl.members.len() {
            let (earlier, rest) = struct_decl.members.split_at_mut(index);
            let member = &mut rest[0];

            if let Some(previous) = earlier.iter().find(|other| other.name == member.name) {
                let message = format!(
                    "{}; previous was at {}",
                    what,
                    self.position_str(previous.span)
                );
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_MEMBER_NAME,
                    member.span,
                    message,
                    previous.span,
                ));
            }

            let type_id = match self.compile_type_ctor(&mut member.type_ctor) {
                Ok(type_id) => type_id,
                Err(error) => {
                    result = Err(error);
                    continue;
                }
            };
            if let Some(default) = member.maybe_default_value.as_mut() {
                if !self.type_can_be_const(type_id) {
                    let message = format!("invalid constant type {}", self.type_name(type_id));
                    result = Err(self.fail(codes::INVALID_CONSTANT_TYPE, default.span, message));
                } else if let Err(error) = self.resolve_constant(default, type_id) {
                    result = Err(error);
                }
            }
        }
        result
    }

    /// Shared table, union and xunion checks: unique nonzero ordinals, unique
    /// names, non-nullable member types and, if `dense`, no ordinal gaps.
    fn compile_ordinal_members(
        &mut self,
        decl: DeclId,
        container: OrdinalContainer,
        members: Vec<(Ordinal, Option<&mut UsedMember>)>,
        dense: bool,
    ) -> CompileResult<()> {
        let mut result = Ok(());
        let mut ordinals: FxHashMap<u32, SourceSpan> = FxHashMap::default();
        let mut names: FxHashMap<String, SourceSpan> = FxHashMap::default();

        for (ordinal, maybe_used) in members {
            if ordinal.value == 0 {
                result = Err(self.fail(
                    codes::ZERO_ORDINAL,
                    ordinal.span,
                    "ordinal value 0 disallowed",
                ));
            } else {
                match ordinals.entry(ordinal.value) {
                    Entry::Occupied(previous) => {
                        let previous = *previous.get();
                        let message = format!(
                            "Multiple {} fields with the same ordinal; previous was at {}",
                            container.name(),
                            self.position_str(previous)
                        );
                        result = Err(self.fail_with_previous(
                            codes::DUPLICATE_ORDINAL,
                            ordinal.span,
                            message,
                            previous,
                        ));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(ordinal.span);
                    }
                }
            }

            let Some(used) = maybe_used else {
                continue;
            };
            match names.entry(used.name.clone()) {
                Entry::Occupied(previous) => {
                    let previous = *previous.get();
                    let message = format!(
                        "Multiple {} fields with the same name; previous was at {}",
                        container.name(),
                        self.position_str(previous)
                    );
                    result = Err(self.fail_with_previous(
                        codes::DUPLICATE_MEMBER_NAME,
                        used.span,
                        message,
                        previous,
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(used.span);
                }
            }

            let type_id = match self.compile_type_ctor(&mut used.type_ctor) {
                Ok(type_id) => type_id,
                Err(error) => {
                    result = Err(error);
                    continue;
                }
            };
            if self.typespace.get(type_id).nullability().is_nullable() {
                let message = format!("{} members cannot be nullable", container.title());
                result = Err(self.fail(codes::NULLABLE_MEMBER, used.type_ctor.span, message));
            }
        }

        if dense {
            let sorted: BTreeSet<u32> = ordinals.keys().copied().collect();
            let missing = (1u32..)
                .zip(sorted.iter())
                .find(|(expected, ordinal)| *expected != **ordinal)
                .map(|(expected, _)| expected);
            if let Some(missing) = missing {
                let message = format!(
                    "missing ordinal {} (ordinals must be dense); consider marking it reserved",
                    missing
                );
                let span = self.decls[decl.index()].span();
                result = Err(self.fail(codes::NON_DENSE_ORDINALS, span, message));
            }
        }
        result
    }

    fn compile_protocol(&mut self, decl: DeclId, protocol: &mut Protocol) -> CompileResult<()> {
        let protocol_name = self.decls[decl.index()].name.clone();
        let mut result = Ok(());

        let mut composed_ids = Vec::new();
        for composed in &protocol.composed_protocols {
            let Some(target) = self.lookup_decl(&composed.name) else {
                let message = format!("unknown type {}", composed.name);
                result = Err(self.fail(codes::UNKNOWN_TYPE, composed.span, message));
                continue;
            };
            if !matches!(self.decls[target.index()].kind, DeclKind::Protocol(_)) {
                result = Err(self.fail(
                    codes::COMPOSED_NOT_PROTOCOL,
                    composed.span,
                    "This declaration is not a protocol",
                ));
                continue;
            }
            if !self.decls[target.index()].attributes.has(FRAGILE_BASE) {
                let message = format!(
                    "protocol {} is not marked by [{}] attribute, disallowing protocol {} from inheriting from it",
                    composed.name, FRAGILE_BASE, protocol_name
                );
                result = Err(self.fail(codes::NOT_FRAGILE_BASE, composed.span, message));
                continue;
            }
            if let Err(error) = self.compile_decl(target) {
                result = Err(error);
                continue;
            }
            composed_ids.push(target);
        }

        // Own methods first, then everything composed, each method once.
        let mut all_methods: Vec<MethodRef> = (0..protocol.methods.len())
            .map(|index| MethodRef {
                protocol: decl,
                index,
                is_composed: false,
            })
            .collect();
        for target in composed_ids {
            let Some(composed) = self.decls[target.index()].as_protocol() else {
                continue;
            };
            for method_ref in &composed.all_methods {
                let seen = all_methods
                    .iter()
                    .any(|m| m.protocol == method_ref.protocol && m.index == method_ref.index);
                if !seen {
                    all_methods.push(MethodRef {
                        is_composed: true,
                        ..*method_ref
                    });
                }
            }
        }

        let mut names: FxHashMap<String, SourceSpan> = FxHashMap::default();
        let mut ordinals: FxHashMap<u32, SourceSpan> = FxHashMap::default();
        for &method_ref in &all_methods {
            let method = self.method(method_ref);
            let (name, span, ordinal) = (
                method.name.clone(),
                method.span,
                method.generated_ordinal.value,
            );

            if let Some(&previous) = names.get(&name) {
                let message = format!(
                    "Multiple methods with the same name in a protocol; last occurrence was at {}",
                    self.position_str(previous)
                );
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_METHOD_NAME,
                    span,
                    message,
                    previous,
                ));
            } else {
                names.insert(name.clone(), span);
            }

            if let Some(&previous) = ordinals.get(&ordinal) {
                let message = format!(
                    "Multiple methods with the same ordinal in a protocol; previous was at {}. Consider using attribute [Selector=\"{}_\"] to change the name used to calculate the ordinal.",
                    self.position_str(previous),
                    name
                );
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_METHOD_ORDINAL,
                    span,
                    message,
                    previous,
                ));
            } else {
                ordinals.insert(ordinal, span);
            }
        }

        for method in &protocol.methods {
            let messages = [method.maybe_request, method.maybe_response, method.maybe_result_union];
            for message in messages.into_iter().flatten() {
                if let Err(error) = self.compile_decl(message) {
                    result = Err(error);
                }
            }
        }

        protocol.all_methods = all_methods;
        result
    }

    fn compile_service(&mut self, service: &mut Service) -> CompileResult<()> {
        let mut result = Ok(());
        let mut names: FxHashMap<String, SourceSpan> = FxHashMap::default();
        for member in &mut service.members {
            if let Some(&previous) = names.get(&member.name) {
                let message = format!(
                    "Multiple service members with the same name; previous was at {}",
                    self.position_str(previous)
                );
                result = Err(self.fail_with_previous(
                    codes::DUPLICATE_MEMBER_NAME,
                    member.span,
                    message,
                    previous,
                ));
            } else {
                names.insert(member.name.clone(), member.span);
            }

            let type_id = match self.compile_type_ctor(&mut member.type_ctor) {
                Ok(type_id) => type_id,
                Err(error) => {
                    result = Err(error);
                    continue;
                }
            };
            match self.typespace.get(type_id).clone() {
                Type::Identifier { decl, nullability }
                    if matches!(self.decls[decl.index()].kind, DeclKind::Protocol(_)) =>
                {
                    if nullability.is_nullable() {
                        result = Err(self.fail(
                            codes::NULLABLE_MEMBER,
                            member.type_ctor.span,
                            "service members cannot be nullable",
                        ));
                    }
                }
                _ => {
                    result = Err(self.fail(
                        codes::SERVICE_MEMBER_NOT_PROTOCOL,
                        member.type_ctor.span,
                        "only protocol members are allowed",
                    ));
                }
            }
        }
        result
    }

    /// Compile what the alias fixes. The aliased type itself is only built
    /// speculatively: it may need parameters that the use sites supply.
    fn compile_type_alias(&mut self, alias: &mut TypeAlias) -> CompileResult<()> {
        let partial = &mut alias.partial_type_ctor;
        if let Some(arg) = partial.maybe_arg_type_ctor.as_mut() {
            self.compile_type_ctor(arg)?;
        }
        if let Some(size) = partial.maybe_size.as_mut() {
            self.resolve_size(size)?;
        }

        let Some(template) = self.typespace.lookup_template(&partial.name) else {
            let message = format!("unknown type {}", partial.name.decl_name());
            return Err(self.fail(codes::UNKNOWN_TYPE, partial.span, message));
        };
        if let TypeTemplate::Alias(target) = template {
            // Its diagnostics must not be swallowed by the speculation below.
            if !self.decls[target.index()].is_compiled() {
                self.compile_decl(target)?;
            }
        }
        if self.can_speculate(&partial.name) {
            let mut speculative = partial.clone();
            let previous = self.reporter.set_suppressed(true);
            let resolved = self.compile_type_ctor(&mut speculative);
            self.reporter.set_suppressed(previous);
            trace!("alias of {} resolves eagerly: {}", partial.name, resolved.is_ok());
            alias.resolved_type = resolved.ok();
        }
        Ok(())
    }

    /// Whether building `name` compiles nothing new. Errors are suppressed
    /// while speculating, so a declaration compiled then would fail silently.
    fn can_speculate(&self, name: &Name) -> bool {
        let mut name = name.clone();
        for _ in 0..=self.decls.len() {
            match self.typespace.lookup_template(&name) {
                Some(TypeTemplate::Decl(target)) => {
                    let target = &self.decls[target.index()];
                    return target.is_compiled() || matches!(target.kind, DeclKind::Protocol(_));
                }
                Some(TypeTemplate::Alias(target)) => {
                    let target = &self.decls[target.index()];
                    match (&target.state, &target.kind) {
                        (DeclState::Compiled(_), DeclKind::TypeAlias(alias)) => {
                            name = alias.partial_type_ctor.name.clone();
                        }
                        _ => return false,
                    }
                }
                _ => return true,
            }
        }
        false
    }
}
