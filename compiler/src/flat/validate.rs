//! Post-compilation checks: attribute schemas and unused imports

use log::trace;
use raw_ast::AttributeList;

use super::attributes::Placement;
use super::decls::DeclKind;
use super::ids::{DeclId, LibraryId};
use super::CompileResult;
use crate::compilation::Compilation;
use crate::error_codes::codes;

impl Compilation {
    /// Validate the library's own attributes and those of every declaration
    /// and member.
    pub(crate) fn validate_library_attributes(&mut self, library: LibraryId) -> CompileResult<()> {
        let attributes = self.libraries[library.index()].attributes.clone();
        let mut result = self.validate_attributes_placement(Placement::Library, &attributes);

        let decls = self.libraries[library.index()].declaration_order.clone();
        for decl in decls {
            if let Err(error) = self.validate_decl_attributes(decl) {
                result = Err(error);
            }
        }
        result
    }

    fn validate_decl_attributes(&mut self, decl: DeclId) -> CompileResult<()> {
        let decl_data = &self.decls[decl.index()];
        trace!("validating attributes of {}", decl_data.name);
        let placement = decl_data.kind.placement();
        let attributes = decl_data.attributes.clone();
        let compiled_ok = decl_data.compiled_ok();
        let members = member_attributes(&decl_data.kind);
        // Method attributes are checked against the method's messages.
        let methods: Vec<(AttributeList, Vec<DeclId>)> = match &decl_data.kind {
            DeclKind::Protocol(protocol) => protocol
                .methods
                .iter()
                .map(|method| {
                    let messages = [method.maybe_request, method.maybe_response]
                        .into_iter()
                        .flatten()
                        .collect();
                    (method.attributes.clone(), messages)
                })
                .collect(),
            _ => Vec::new(),
        };

        let mut result = self.validate_attributes_placement(placement, &attributes);
        for (member_placement, member_attributes) in &members {
            if let Err(error) = self.validate_attributes_placement(
                *member_placement,
                member_attributes,
            ) {
                result = Err(error);
            }
        }
        result?;

        if !compiled_ok {
            return Ok(());
        }
        let mut result = self.validate_attributes_constraints(decl, placement, &attributes);
        for (method_attributes, messages) in &methods {
            for &message in messages {
                if let Err(error) = self.validate_attributes_constraints(
                    message,
                    Placement::Method,
                    method_attributes,
                ) {
                    result = Err(error);
                }
            }
        }
        result
    }

    /// Every import must be referenced by the file that declares it.
    pub(crate) fn verify_all_dependencies_were_used(
        &mut self,
        library: LibraryId,
    ) -> CompileResult<()> {
        let library_data = &self.libraries[library.index()];
        let library_name = library_data.name.clone();
        let unused: Vec<_> = library_data
            .dependencies
            .unused()
            .map(|library_ref| (library_ref.name.clone(), library_ref.span))
            .collect();

        let mut result = Ok(());
        for (name, span) in unused {
            let message = format!(
                "Library {} imports {} but does not use it. Either use {}, or remove import.",
                library_name, name, name
            );
            result = Err(self.fail(codes::UNUSED_IMPORT, span, message));
        }
        result
    }
}

/// Attribute lists of a declaration's members, with their placement
fn member_attributes(kind: &DeclKind) -> Vec<(Placement, AttributeList)> {
    match kind {
        DeclKind::Bits(bits) => bits
            .members
            .iter()
            .map(|member| (Placement::BitsMember, member.attributes.clone()))
            .collect(),
        DeclKind::Enum(enum_decl) => enum_decl
            .members
            .iter()
            .map(|member| (Placement::EnumMember, member.attributes.clone()))
            .collect(),
        DeclKind::Struct(struct_decl) => struct_decl
            .members
            .iter()
            .map(|member| (Placement::StructMember, member.attributes.clone()))
            .collect(),
        DeclKind::Table(table) => table
            .members
            .iter()
            .filter_map(|member| member.maybe_used.as_ref())
            .map(|used| (Placement::TableMember, used.attributes.clone()))
            .collect(),
        DeclKind::Union(union_decl) => union_decl
            .members
            .iter()
            .filter_map(|member| member.maybe_used.as_ref())
            .map(|used| (Placement::UnionMember, used.attributes.clone()))
            .collect(),
        DeclKind::XUnion(xunion) => xunion
            .members
            .iter()
            .filter_map(|member| member.maybe_used.as_ref())
            .map(|used| (Placement::XUnionMember, used.attributes.clone()))
            .collect(),
        DeclKind::Protocol(protocol) => protocol
            .methods
            .iter()
            .map(|method| (Placement::Method, method.attributes.clone()))
            .collect(),
        DeclKind::Service(service) => service
            .members
            .iter()
            .map(|member| (Placement::ServiceMember, member.attributes.clone()))
            .collect(),
        DeclKind::Const(_) | DeclKind::TypeAlias(_) => Vec::new(),
    }
}
