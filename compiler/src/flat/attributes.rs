//! Attribute schemas
//!
//! Every recognised attribute is described by one `AttributeSchema` entry:
//! where it may be placed, which literal values it accepts, and an optional
//! constraint checked once the declaration carrying it has been compiled.
//! Unknown attributes are accepted, with a warning if they look like a typo
//! of a known one.

use std::num::IntErrorKind;

use indexmap::IndexMap;
use log::trace;
use raw_ast::{Attribute, AttributeList};
use source_map::SourceSpan;

use super::decls::{DeclKind, UsedMember};
use super::ids::{DeclId, TypeId};
use super::types::{PrimitiveSubtype, Type, UNBOUNDED};
use super::typeshape::TypeShapeCalculator;
use super::{CompileResult, ErrorReported};
use crate::compilation::Compilation;
use crate::error_codes::codes;

/// Where an attribute appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    BitsDecl,
    BitsMember,
    ConstDecl,
    EnumDecl,
    EnumMember,
    ProtocolDecl,
    Library,
    Method,
    ServiceDecl,
    ServiceMember,
    StructDecl,
    StructMember,
    TableDecl,
    TableMember,
    TypeAliasDecl,
    UnionDecl,
    UnionMember,
    Using,
    XUnionDecl,
    XUnionMember,
}

/// Outcome of a constraint. `Err(None)` is a silent failure, which the
/// validator turns into a generic error.
pub type ConstraintResult = Result<(), Option<ErrorReported>>;

/// Checks a compiled declaration against an attribute.
pub type Constraint = fn(&mut Compilation, &Attribute, DeclId) -> ConstraintResult;

#[derive(Debug, Clone, Copy)]
pub struct AttributeSchema {
    pub name: &'static str,
    /// Empty means anywhere
    pub placements: &'static [Placement],
    /// Empty means any value
    pub values: &'static [&'static str],
    pub constraint: Option<Constraint>,
}

impl AttributeSchema {
    pub const fn new(
        name: &'static str,
        placements: &'static [Placement],
        values: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            placements,
            values,
            constraint: None,
        }
    }

    pub const fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn allows_placement(&self, placement: Placement) -> bool {
        self.placements.is_empty() || self.placements.contains(&placement)
    }

    pub fn allows_value(&self, value: &str) -> bool {
        self.values.is_empty() || self.values.contains(&value)
    }
}

const SIZED_DECLS: &[Placement] = &[
    Placement::ProtocolDecl,
    Placement::Method,
    Placement::StructDecl,
    Placement::TableDecl,
    Placement::UnionDecl,
    Placement::XUnionDecl,
];

const SELECTABLE: &[Placement] = &[Placement::Method, Placement::XUnionMember];

pub const FRAGILE_BASE: &str = "FragileBase";
pub const RESULT: &str = "Result";

/// The attributes known to the compiler
pub fn official_schemas() -> IndexMap<&'static str, AttributeSchema> {
    let schemas = [
        AttributeSchema::new("Discoverable", &[Placement::ProtocolDecl], &[""]),
        AttributeSchema::new("Doc", &[], &[]),
        AttributeSchema::new(FRAGILE_BASE, &[Placement::ProtocolDecl], &[""]),
        AttributeSchema::new("Layout", &[Placement::ProtocolDecl], &["Simple"])
            .with_constraint(simple_layout_constraint),
        AttributeSchema::new("MaxBytes", SIZED_DECLS, &[]).with_constraint(max_bytes_constraint),
        AttributeSchema::new("MaxHandles", SIZED_DECLS, &[])
            .with_constraint(max_handles_constraint),
        AttributeSchema::new(RESULT, &[Placement::UnionDecl], &[""])
            .with_constraint(result_shape_constraint),
        AttributeSchema::new("Selector", SELECTABLE, &[]),
        AttributeSchema::new("Transitional", SELECTABLE, &[]),
        AttributeSchema::new("Transport", &[Placement::ProtocolDecl], &[])
            .with_constraint(transport_constraint),
    ];
    schemas.into_iter().map(|schema| (schema.name, schema)).collect()
}

/// Levenshtein distance
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr_row[0] = i;
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Why an attribute bound was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundError {
    Malformed,
    TooBig,
}

/// Decimal `u32` bound, as written in `MaxBytes`/`MaxHandles`
pub fn parse_bound(value: &str) -> Result<u32, BoundError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BoundError::Malformed);
    }
    value.parse::<u32>().map_err(|error| match error.kind() {
        IntErrorKind::PosOverflow => BoundError::TooBig,
        _ => BoundError::Malformed,
    })
}

impl Compilation {
    /// Register an additional schema, replacing any schema of the same name.
    pub fn add_attribute_schema(&mut self, schema: AttributeSchema) {
        self.attribute_schemas.insert(schema.name, schema);
    }

    pub fn attribute_schema(&self, name: &str) -> Option<&AttributeSchema> {
        self.attribute_schemas.get(name)
    }

    /// Look up the schema for `attribute`, warning about likely typos.
    /// Fails only if such a warning was promoted to an error.
    fn retrieve_attribute_schema(
        &mut self,
        attribute: &Attribute,
        warn_on_typo: bool,
    ) -> CompileResult<Option<AttributeSchema>> {
        if let Some(schema) = self.attribute_schemas.get(attribute.name.as_str()) {
            return Ok(Some(*schema));
        }

        if warn_on_typo && self.config.attribute_typo_warnings {
            let suggestion = self
                .attribute_schemas
                .keys()
                .find(|known| edit_distance(known, &attribute.name) == 1)
                .copied();
            if let Some(suggestion) = suggestion {
                let message = format!(
                    "suspect attribute with name '{}'; did you mean '{}'?",
                    attribute.name, suggestion
                );
                if let Some(promoted) = self.warn(
                    codes::SUSPECT_ATTRIBUTE,
                    attribute.span,
                    message,
                ) {
                    return Err(promoted);
                }
            }
        }
        Ok(None)
    }

    /// Placement and value checks for every attribute in `attributes`
    pub(crate) fn validate_attributes_placement(
        &mut self,
        placement: Placement,
        attributes: &AttributeList,
    ) -> CompileResult<()> {
        let mut result = Ok(());
        for attribute in attributes.iter() {
            let schema = match self.retrieve_attribute_schema(attribute, true) {
                Ok(Some(schema)) => schema,
                Ok(None) => continue,
                Err(error) => {
                    result = Err(error);
                    continue;
                }
            };
            if !schema.allows_placement(placement) {
                let message = format!(
                    "placement of attribute '{}' disallowed here",
                    attribute.name
                );
                result = Err(self.fail(
                    codes::INVALID_ATTRIBUTE_PLACEMENT,
                    attribute.span,
                    message,
                ));
                continue;
            }
            if !schema.allows_value(&attribute.value) {
                let message = format!(
                    "attribute '{}' has invalid value '{}', should be one of '{}'",
                    attribute.name,
                    attribute.value,
                    schema.values.join(", ")
                );
                result = Err(self.fail(codes::INVALID_ATTRIBUTE_VALUE, attribute.span, message));
            }
        }
        result
    }

    /// Constraint checks of every attribute in `attributes` against `decl`.
    /// Attributes not allowed at `placement` were already rejected and are
    /// skipped.
    pub(crate) fn validate_attributes_constraints(
        &mut self,
        decl: DeclId,
        placement: Placement,
        attributes: &AttributeList,
    ) -> CompileResult<()> {
        let mut result = Ok(());
        for attribute in attributes.iter() {
            let Ok(Some(schema)) = self.retrieve_attribute_schema(attribute, false) else {
                continue;
            };
            let Some(constraint) = schema.constraint else {
                continue;
            };
            if !schema.allows_placement(placement) {
                continue;
            }

            trace!(
                "checking constraint of {} on {}",
                attribute.name,
                self.decls[decl.index()].name
            );
            let checkpoint = self.reporter.checkpoint();
            match constraint(self, attribute, decl) {
                Ok(()) => debug_assert!(
                    checkpoint.no_new_errors(&self.reporter),
                    "attribute constraint passed but reported errors"
                ),
                Err(Some(error)) => result = Err(error),
                Err(None) => {
                    let message = format!(
                        "declaration did not satisfy constraint of attribute '{}' with value '{}'",
                        attribute.name, attribute.value
                    );
                    result = Err(self.fail(
                        codes::ATTRIBUTE_CONSTRAINT_FAILED,
                        attribute.span,
                        message,
                    ));
                }
            }
        }
        result
    }

    /// Request and response structs of a protocol's own methods
    fn protocol_messages(&self, decl: DeclId) -> Vec<DeclId> {
        match &self.decls[decl.index()].kind {
            DeclKind::Protocol(protocol) => protocol
                .methods
                .iter()
                .flat_map(|method| [method.maybe_request, method.maybe_response])
                .flatten()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Apply `constraint` to every message of `protocol`, reporting all failures.
    fn constrain_messages(
        &mut self,
        constraint: Constraint,
        attribute: &Attribute,
        protocol: DeclId,
    ) -> ConstraintResult {
        let mut result = Ok(());
        for message in self.protocol_messages(protocol) {
            if let Err(error) = constraint(self, attribute, message) {
                result = Err(error);
            }
        }
        result
    }

    fn bound_of(&mut self, attribute: &Attribute) -> CompileResult<u32> {
        parse_bound(&attribute.value).map_err(|error| match error {
            BoundError::TooBig => self.fail(
                codes::UNPARSABLE_BOUND,
                attribute.span,
                "bound is too big",
            ),
            BoundError::Malformed => {
                let message = format!("unable to parse bound '{}'", attribute.value);
                self.fail(codes::UNPARSABLE_BOUND, attribute.span, message)
            }
        })
    }
}

fn is_sized(kind: &DeclKind) -> bool {
    matches!(
        kind,
        DeclKind::Struct(_) | DeclKind::Table(_) | DeclKind::Union(_) | DeclKind::XUnion(_)
    )
}

fn max_bytes_constraint(
    compilation: &mut Compilation,
    attribute: &Attribute,
    decl: DeclId,
) -> ConstraintResult {
    let bound = compilation.bound_of(attribute)?;
    let kind = &compilation.decls[decl.index()].kind;
    if matches!(kind, DeclKind::Protocol(_)) {
        return compilation.constrain_messages(max_bytes_constraint, attribute, decl);
    }
    if !is_sized(kind) {
        return Ok(());
    }

    let shape = compilation.typeshape(decl);
    let max_bytes = shape.inline_size.saturating_add(shape.max_out_of_line);
    if max_bytes > bound {
        let message = format!(
            "too large: only {} bytes allowed, but {} bytes found",
            bound,
            describe_bound(max_bytes)
        );
        return Err(Some(compilation.fail(codes::TOO_MANY_BYTES, attribute.span, message)));
    }
    Ok(())
}

fn max_handles_constraint(
    compilation: &mut Compilation,
    attribute: &Attribute,
    decl: DeclId,
) -> ConstraintResult {
    let bound = compilation.bound_of(attribute)?;
    let kind = &compilation.decls[decl.index()].kind;
    if matches!(kind, DeclKind::Protocol(_)) {
        return compilation.constrain_messages(max_handles_constraint, attribute, decl);
    }
    if !is_sized(kind) {
        return Ok(());
    }

    let shape = compilation.typeshape(decl);
    if shape.max_handles > bound {
        let message = format!(
            "too many handles: only {} allowed, but {} found",
            bound,
            describe_bound(shape.max_handles)
        );
        return Err(Some(compilation.fail(codes::TOO_MANY_HANDLES, attribute.span, message)));
    }
    Ok(())
}

fn describe_bound(value: u32) -> String {
    if value == u32::MAX {
        "unbounded".to_string()
    } else {
        value.to_string()
    }
}

fn simple_layout_constraint(
    compilation: &mut Compilation,
    attribute: &Attribute,
    decl: DeclId,
) -> ConstraintResult {
    if matches!(compilation.decls[decl.index()].kind, DeclKind::Protocol(_)) {
        return compilation.constrain_messages(simple_layout_constraint, attribute, decl);
    }
    let members: Vec<(String, SourceSpan, TypeId)> = match &compilation.decls[decl.index()].kind {
        DeclKind::Struct(struct_decl) => struct_decl
            .members
            .iter()
            .map(|member| (member.name.clone(), member.span, member.type_ctor.type_id()))
            .collect(),
        _ => return Ok(()),
    };

    let mut result = Ok(());
    for (name, span, type_id) in members {
        if !is_simple(compilation, type_id) {
            let message = format!("member '{}' is not simple", name);
            result = Err(Some(compilation.fail(codes::MEMBER_NOT_SIMPLE, span, message)));
        }
    }
    result
}

/// Bounded vectors of primitives or handles, bounded strings, and anything
/// without out-of-line data
fn is_simple(compilation: &Compilation, type_id: TypeId) -> bool {
    match compilation.typespace.get(type_id) {
        Type::Vector { element, max_size, .. } => {
            *max_size != UNBOUNDED
                && matches!(
                    compilation.typespace.get(*element),
                    Type::Primitive(_) | Type::Handle { .. } | Type::RequestHandle { .. }
                )
        }
        Type::String { max_size, .. } => *max_size != UNBOUNDED,
        _ => TypeShapeCalculator::new(compilation).type_shape(type_id).depth == 0,
    }
}

fn result_shape_constraint(
    compilation: &mut Compilation,
    _attribute: &Attribute,
    decl: DeclId,
) -> ConstraintResult {
    let decl_data = &compilation.decls[decl.index()];
    let span = decl_data.span();
    let DeclKind::Union(union_decl) = &decl_data.kind else {
        return Ok(());
    };

    let used: Vec<&UsedMember> = union_decl
        .members
        .iter()
        .filter_map(|member| member.maybe_used.as_ref())
        .collect();
    if used.len() != 2 {
        return Err(Some(compilation.fail(
            codes::INVALID_RESULT_UNION,
            span,
            "invalid result union: must have exactly two members",
        )));
    }

    let error_primitive = match compilation.typespace.get(used[1].type_ctor.type_id()) {
        Type::Primitive(subtype) => Some(*subtype),
        Type::Identifier { decl: error_decl, .. } => compilation.decls[error_decl.index()]
            .as_enum()
            .and_then(|enum_decl| enum_decl.subtype),
        _ => None,
    };

    match error_primitive {
        Some(PrimitiveSubtype::Int32 | PrimitiveSubtype::Uint32) => Ok(()),
        _ => Err(Some(compilation.fail(
            codes::INVALID_RESULT_UNION,
            span,
            "invalid error type: must be int32, uint32 or an enum thereof",
        ))),
    }
}

const VALID_TRANSPORTS: &[&str] = &["Channel", "SocketControl", "OvernetInternal"];

fn transport_constraint(
    compilation: &mut Compilation,
    attribute: &Attribute,
    _decl: DeclId,
) -> ConstraintResult {
    let mut result = Ok(());
    for transport in attribute.value.split(',').map(str::trim) {
        if !VALID_TRANSPORTS.contains(&transport) {
            let message = format!(
                "invalid transport type: got {} expected one of {}",
                transport,
                VALID_TRANSPORTS.join(", ")
            );
            result = Err(Some(compilation.fail(codes::INVALID_TRANSPORT, attribute.span, message)));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("Layout", "Layout"), 0);
        assert_eq!(edit_distance("Layuot", "Layout"), 2);
        assert_eq!(edit_distance("Transprt", "Transport"), 1);
        assert_eq!(edit_distance("", "Doc"), 3);
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("0"), Ok(0));
        assert_eq!(parse_bound("4294967295"), Ok(u32::MAX));
        assert_eq!(parse_bound("4294967296"), Err(BoundError::TooBig));
        assert_eq!(parse_bound("99999999999999999999999"), Err(BoundError::TooBig));
        assert_eq!(parse_bound("12ab"), Err(BoundError::Malformed));
        assert_eq!(parse_bound("-1"), Err(BoundError::Malformed));
        assert_eq!(parse_bound(""), Err(BoundError::Malformed));
    }

    #[test]
    fn test_official_schemas() {
        let schemas = official_schemas();
        assert_eq!(schemas.len(), 10);

        let layout = schemas["Layout"];
        assert!(layout.allows_placement(Placement::ProtocolDecl));
        assert!(!layout.allows_placement(Placement::StructDecl));
        assert!(layout.allows_value("Simple"));
        assert!(!layout.allows_value("Complex"));
        assert!(layout.constraint.is_some());

        let doc = schemas["Doc"];
        assert!(doc.allows_placement(Placement::Library));
        assert!(doc.allows_value("anything at all"));
        assert!(doc.constraint.is_none());

        assert!(schemas["Selector"].allows_placement(Placement::XUnionMember));
        assert!(!schemas["Selector"].allows_placement(Placement::TableMember));
    }
}
