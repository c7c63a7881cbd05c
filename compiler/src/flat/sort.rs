//! Dependency sorting of a library's declarations
//!
//! A declaration depends on another when it stores it inline or needs one of
//! its values. Nullable references and protocol references are stored out of
//! line and never create an edge, which is what makes recursive types through
//! `?` legal.

use std::collections::BTreeSet;

use log::debug;

use super::constants::{Constant, ConstantKind};
use super::decls::DeclKind;
use super::ids::{DeclId, LibraryId};
use super::name::Name;
use super::types::TypeConstructor;
use super::typespace::TypeTemplate;
use super::CompileResult;
use crate::compilation::Compilation;
use crate::dependency_graph::DependencyGraph;
use crate::error_codes::codes;

impl Compilation {
    /// Build the library's dependency graph and its compilation order.
    pub(crate) fn sort_library(&mut self, library: LibraryId) -> CompileResult<()> {
        let decl_ids: Vec<DeclId> = self.libraries[library.index()]
            .declarations
            .values()
            .copied()
            .collect();

        let mut graph = DependencyGraph::new();
        for &decl in &decl_ids {
            graph.add_node(decl, self.decls[decl.index()].name.to_string());
        }
        for &decl in &decl_ids {
            let edges = self.declaration_edges(decl);
            for dependency in edges {
                // Imported declarations were compiled with their own library.
                if self.decls[dependency.index()].library == library {
                    graph.add_edge(decl, dependency);
                }
            }
        }
        debug!(
            "dependency graph of {}: {} declarations, {} edges",
            self.libraries[library.index()].name,
            graph.node_count(),
            graph.edge_count()
        );

        let analysis = graph.analyze();
        if !analysis.is_acyclic() {
            let span = analysis
                .circular_dependencies
                .first()
                .and_then(|cycle| cycle.cycle.first())
                .and_then(|first| {
                    decl_ids
                        .iter()
                        .find(|decl| self.decls[decl.index()].name.to_string() == *first)
                })
                .and_then(|decl| self.decls[decl.index()].span());
            let notes: Vec<String> = analysis
                .circular_dependencies
                .iter()
                .map(|cycle| cycle.format_error())
                .collect();
            self.libraries[library.index()].dependency_graph = graph;
            return Err(self.fail_with_notes(
                codes::DECLARATION_CYCLE,
                span,
                "There is an includes-cycle in declarations",
                notes,
            ));
        }

        let library_data = &mut self.libraries[library.index()];
        library_data.declaration_order = analysis.compilation_order;
        library_data.dependency_graph = graph;
        Ok(())
    }

    /// Every declaration `decl` needs compiled before itself
    fn declaration_edges(&self, decl: DeclId) -> BTreeSet<DeclId> {
        let mut edges = BTreeSet::new();
        match &self.decls[decl.index()].kind {
            DeclKind::Bits(bits) => {
                self.add_type_ctor_edge(&bits.subtype_ctor, &mut edges);
                for member in &bits.members {
                    self.add_constant_edge(&member.value, &mut edges);
                }
            }
            DeclKind::Enum(enum_decl) => {
                self.add_type_ctor_edge(&enum_decl.subtype_ctor, &mut edges);
                for member in &enum_decl.members {
                    self.add_constant_edge(&member.value, &mut edges);
                }
            }
            DeclKind::Const(const_decl) => {
                self.add_type_ctor_edge(&const_decl.type_ctor, &mut edges);
                self.add_constant_edge(&const_decl.value, &mut edges);
            }
            DeclKind::Struct(struct_decl) => {
                for member in &struct_decl.members {
                    self.add_type_ctor_edge(&member.type_ctor, &mut edges);
                    if let Some(default) = &member.maybe_default_value {
                        self.add_constant_edge(default, &mut edges);
                    }
                }
            }
            DeclKind::Table(table) => {
                for used in table.members.iter().filter_map(|member| member.maybe_used.as_ref()) {
                    self.add_type_ctor_edge(&used.type_ctor, &mut edges);
                }
            }
            DeclKind::Union(union_decl) => {
                for used in union_decl
                    .members
                    .iter()
                    .filter_map(|member| member.maybe_used.as_ref())
                {
                    self.add_type_ctor_edge(&used.type_ctor, &mut edges);
                }
            }
            DeclKind::XUnion(xunion) => {
                for used in xunion.members.iter().filter_map(|member| member.maybe_used.as_ref()) {
                    self.add_type_ctor_edge(&used.type_ctor, &mut edges);
                }
            }
            DeclKind::Protocol(protocol) => {
                for composed in &protocol.composed_protocols {
                    if let Some(dependency) = self.lookup_decl(&composed.name) {
                        edges.insert(dependency);
                    }
                }
                for method in &protocol.methods {
                    edges.extend(method.maybe_request);
                    edges.extend(method.maybe_response);
                    edges.extend(method.maybe_result_union);
                }
            }
            DeclKind::Service(service) => {
                for member in &service.members {
                    self.add_type_ctor_edge(&member.type_ctor, &mut edges);
                }
            }
            DeclKind::TypeAlias(alias) => {
                self.add_type_ctor_edge(&alias.partial_type_ctor, &mut edges);
                self.add_alias_edges(&alias.partial_type_ctor, &mut edges);
            }
        }
        edges
    }

    /// Follow the argument chain to the innermost named type; an inline,
    /// non-protocol declaration there is a dependency.
    fn add_type_ctor_edge(&self, type_ctor: &TypeConstructor, edges: &mut BTreeSet<DeclId>) {
        let mut type_ctor = type_ctor;
        loop {
            if self.is_request_template(&type_ctor.name) {
                return;
            }
            if let Some(arg) = &type_ctor.maybe_arg_type_ctor {
                type_ctor = arg;
                continue;
            }
            if type_ctor.nullability.is_nullable() {
                return;
            }
            if let Some(dependency) = self.lookup_decl(&type_ctor.name) {
                if !matches!(self.decls[dependency.index()].kind, DeclKind::Protocol(_)) {
                    edges.insert(dependency);
                }
            }
            return;
        }
    }

    /// Aliases are expanded, never stored, so an alias naming another alias
    /// depends on it whatever the nullability.
    fn add_alias_edges(&self, type_ctor: &TypeConstructor, edges: &mut BTreeSet<DeclId>) {
        let mut maybe_type_ctor = Some(type_ctor);
        while let Some(type_ctor) = maybe_type_ctor {
            let template = self.typespace.lookup_template(&type_ctor.name);
            if let Some(TypeTemplate::Alias(alias)) = template {
                edges.insert(alias);
            }
            maybe_type_ctor = type_ctor.maybe_arg_type_ctor.as_deref();
        }
    }

    fn is_request_template(&self, name: &Name) -> bool {
        matches!(self.typespace.lookup_template(name), Some(TypeTemplate::Request))
    }

    fn add_constant_edge(&self, constant: &Constant, edges: &mut BTreeSet<DeclId>) {
        if let ConstantKind::Identifier(name) = &constant.kind {
            if let Some(dependency) = self.lookup_decl(name) {
                edges.insert(dependency);
            }
        }
    }
}
