//! A compiled (or failed) library: the output handed to code generators

use indexmap::IndexMap;
use raw_ast::AttributeList;

use super::dependencies::Dependencies;
use super::ids::{DeclId, LibraryId};
use super::name::{LibraryName, Name};
use crate::dependency_graph::DependencyGraph;

/// Per-kind declaration lists, in consumption order
#[derive(Debug, Default, Clone)]
pub struct DeclarationsByKind {
    pub bits: Vec<DeclId>,
    pub consts: Vec<DeclId>,
    pub enums: Vec<DeclId>,
    pub protocols: Vec<DeclId>,
    pub services: Vec<DeclId>,
    pub structs: Vec<DeclId>,
    pub tables: Vec<DeclId>,
    pub unions: Vec<DeclId>,
    pub xunions: Vec<DeclId>,
    pub type_aliases: Vec<DeclId>,
}

impl DeclarationsByKind {
    pub fn len(&self) -> usize {
        self.bits.len()
            + self.consts.len()
            + self.enums.len()
            + self.protocols.len()
            + self.services.len()
            + self.structs.len()
            + self.tables.len()
            + self.unions.len()
            + self.xunions.len()
            + self.type_aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Library {
    pub id: LibraryId,
    pub name: LibraryName,
    pub attributes: AttributeList,
    /// Name -> declaration, for every declaration of this library
    pub declarations: IndexMap<Name, DeclId>,
    pub by_kind: DeclarationsByKind,
    /// Topologically sorted; empty if sorting failed
    pub declaration_order: Vec<DeclId>,
    pub dependencies: Dependencies,
    pub dependency_graph: DependencyGraph,
    /// Set once every declaration compiled and validated without errors
    pub compiled: bool,
}

impl Library {
    pub fn new(id: LibraryId, name: LibraryName) -> Self {
        Self {
            id,
            name,
            attributes: AttributeList::default(),
            declarations: IndexMap::new(),
            by_kind: DeclarationsByKind::default(),
            declaration_order: Vec::new(),
            dependencies: Dependencies::new(),
            dependency_graph: DependencyGraph::new(),
            compiled: false,
        }
    }

    pub fn lookup(&self, name: &Name) -> Option<DeclId> {
        self.declarations.get(name).copied()
    }

    /// Libraries this one imports
    pub fn dependency_libraries(&self) -> impl Iterator<Item = LibraryId> + '_ {
        self.dependencies.libraries().iter().copied()
    }

    /// Position of `decl` in the compilation order
    pub fn order_of(&self, decl: DeclId) -> Option<usize> {
        self.declaration_order.iter().position(|d| *d == decl)
    }
}
