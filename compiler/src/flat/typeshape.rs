//! Wire shapes of compiled types
//!
//! Only as much layout as the `MaxBytes`, `MaxHandles` and `Layout`
//! attribute constraints need. All arithmetic saturates at `u32::MAX`,
//! which stands for "unbounded".

use fxhash::{FxHashMap, FxHashSet};
use log::trace;

use super::decls::DeclKind;
use super::ids::{DeclId, TypeId};
use super::types::{Nullability, PrimitiveSubtype, Type, TypeConstructor};
use crate::compilation::Compilation;

/// Size of the transactional header in front of every protocol message
pub const MESSAGE_HEADER_SIZE: u32 = 16;
const ENVELOPE_SIZE: u32 = 16;
const POINTER_SIZE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeShape {
    pub inline_size: u32,
    pub alignment: u32,
    /// Out-of-line nesting depth
    pub depth: u32,
    pub max_handles: u32,
    pub max_out_of_line: u32,
}

impl TypeShape {
    pub const fn new(inline_size: u32, alignment: u32) -> Self {
        Self {
            inline_size,
            alignment,
            depth: 0,
            max_handles: 0,
            max_out_of_line: 0,
        }
    }

    fn handle() -> Self {
        Self {
            max_handles: 1,
            ..Self::new(4, 4)
        }
    }

    /// Stand-in for a declaration reached again while its shape is computed
    fn unbounded() -> Self {
        Self {
            inline_size: 0,
            alignment: 1,
            depth: u32::MAX,
            max_handles: u32::MAX,
            max_out_of_line: u32::MAX,
        }
    }

    fn saturate_recursion(mut self) -> Self {
        self.depth = u32::MAX;
        self.max_handles = u32::MAX;
        self.max_out_of_line = u32::MAX;
        self
    }

    /// `self` moved out of line behind an 8-byte pointer
    fn boxed(self) -> Self {
        Self {
            inline_size: POINTER_SIZE,
            alignment: POINTER_SIZE,
            depth: self.depth.saturating_add(1),
            max_handles: self.max_handles,
            max_out_of_line: align8(self.inline_size).saturating_add(self.max_out_of_line),
        }
    }
}

fn align_to(size: u32, alignment: u32) -> u32 {
    if alignment <= 1 || size == u32::MAX {
        return size;
    }
    let aligned = (size as u64).div_ceil(alignment as u64) * alignment as u64;
    u32::try_from(aligned).unwrap_or(u32::MAX)
}

fn align8(size: u32) -> u32 {
    align_to(size, 8)
}

/// Memoising shape calculator over one compilation
pub struct TypeShapeCalculator<'a> {
    compilation: &'a Compilation,
    memo: FxHashMap<DeclId, TypeShape>,
    in_progress: FxHashSet<DeclId>,
}

impl<'a> TypeShapeCalculator<'a> {
    pub fn new(compilation: &'a Compilation) -> Self {
        Self {
            compilation,
            memo: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    pub fn type_shape(&mut self, type_id: TypeId) -> TypeShape {
        match self.compilation.typespace.get(type_id).clone() {
            Type::Primitive(subtype) => primitive_shape(subtype),
            Type::Handle { .. } | Type::RequestHandle { .. } => TypeShape::handle(),
            Type::String { max_size, .. } => TypeShape {
                depth: 1,
                max_out_of_line: align8(max_size),
                ..TypeShape::new(16, 8)
            },
            Type::Vector { element, max_size, .. } => {
                let element = self.type_shape(element);
                let elements_size = align8(max_size.saturating_mul(element.inline_size));
                TypeShape {
                    inline_size: 16,
                    alignment: 8,
                    depth: element.depth.saturating_add(1),
                    max_handles: max_size.saturating_mul(element.max_handles),
                    max_out_of_line: elements_size
                        .saturating_add(max_size.saturating_mul(element.max_out_of_line)),
                }
            }
            Type::Array { element, size } => {
                let element = self.type_shape(element);
                TypeShape {
                    inline_size: size.saturating_mul(element.inline_size),
                    alignment: element.alignment,
                    depth: element.depth,
                    max_handles: size.saturating_mul(element.max_handles),
                    max_out_of_line: size.saturating_mul(element.max_out_of_line),
                }
            }
            Type::Identifier { decl, nullability } => self.identifier_shape(decl, nullability),
        }
    }

    fn identifier_shape(&mut self, decl: DeclId, nullability: Nullability) -> TypeShape {
        let boxable = match &self.compilation.decls[decl.index()].kind {
            DeclKind::Protocol(_) => return TypeShape::handle(),
            DeclKind::Struct(_) | DeclKind::Union(_) => true,
            _ => false,
        };
        let shape = self.decl_shape(decl);
        if boxable && nullability.is_nullable() {
            shape.boxed()
        } else {
            shape
        }
    }

    fn ctor_shape(&mut self, type_ctor: &TypeConstructor) -> TypeShape {
        match type_ctor.type_id {
            Some(type_id) => self.type_shape(type_id),
            None => TypeShape::new(0, 1),
        }
    }

    /// Shape of a declaration stored inline
    pub fn decl_shape(&mut self, decl: DeclId) -> TypeShape {
        if let Some(shape) = self.memo.get(&decl) {
            return *shape;
        }
        if !self.in_progress.insert(decl) {
            trace!("recursion through {} while computing shapes", decl);
            return TypeShape::unbounded();
        }

        let decl_data = &self.compilation.decls[decl.index()];
        let mut shape = match &decl_data.kind {
            DeclKind::Struct(struct_decl) => {
                let header = if struct_decl.is_request_or_response {
                    Some(MESSAGE_HEADER_SIZE)
                } else {
                    None
                };
                let members: Vec<TypeShape> = struct_decl
                    .members
                    .iter()
                    .map(|member| self.ctor_shape(&member.type_ctor))
                    .collect();
                struct_shape(header, &members)
            }
            DeclKind::Table(table) => {
                let max_ordinal = table.members.iter().map(|m| m.ordinal.value).max().unwrap_or(0);
                let members: Vec<TypeShape> = table
                    .members
                    .iter()
                    .filter_map(|member| member.maybe_used.as_ref())
                    .map(|used| self.ctor_shape(&used.type_ctor))
                    .collect();
                table_shape(max_ordinal, &members)
            }
            DeclKind::Union(union_decl) => {
                let members: Vec<TypeShape> = union_decl
                    .members
                    .iter()
                    .filter_map(|member| member.maybe_used.as_ref())
                    .map(|used| self.ctor_shape(&used.type_ctor))
                    .collect();
                union_shape(&members)
            }
            DeclKind::XUnion(xunion) => {
                let members: Vec<TypeShape> = xunion
                    .members
                    .iter()
                    .filter_map(|member| member.maybe_used.as_ref())
                    .map(|used| self.ctor_shape(&used.type_ctor))
                    .collect();
                xunion_shape(&members)
            }
            DeclKind::Enum(enum_decl) => self.ctor_shape(&enum_decl.subtype_ctor),
            DeclKind::Bits(bits) => self.ctor_shape(&bits.subtype_ctor),
            DeclKind::Protocol(_) => TypeShape::handle(),
            DeclKind::TypeAlias(alias) => match alias.resolved_type {
                Some(type_id) => self.type_shape(type_id),
                None => TypeShape::new(0, 1),
            },
            DeclKind::Const(_) | DeclKind::Service(_) => TypeShape::new(0, 1),
        };

        if decl_data.recursive {
            shape = shape.saturate_recursion();
        }
        self.in_progress.remove(&decl);
        self.memo.insert(decl, shape);
        shape
    }
}

fn primitive_shape(subtype: PrimitiveSubtype) -> TypeShape {
    let size = subtype.size();
    TypeShape::new(size, size)
}

fn struct_shape(header: Option<u32>, members: &[TypeShape]) -> TypeShape {
    let mut offset = header.unwrap_or(0);
    let mut shape = TypeShape::new(0, if header.is_some() { 8 } else { 1 });
    for member in members {
        offset = align_to(offset, member.alignment).saturating_add(member.inline_size);
        shape.alignment = shape.alignment.max(member.alignment);
        shape.depth = shape.depth.max(member.depth);
        shape.max_handles = shape.max_handles.saturating_add(member.max_handles);
        shape.max_out_of_line = shape.max_out_of_line.saturating_add(member.max_out_of_line);
    }
    // Empty structs still occupy one byte.
    shape.inline_size = align_to(offset.max(1), shape.alignment);
    shape
}

fn table_shape(max_ordinal: u32, members: &[TypeShape]) -> TypeShape {
    let mut shape = TypeShape {
        depth: 1,
        max_out_of_line: max_ordinal.saturating_mul(ENVELOPE_SIZE),
        ..TypeShape::new(16, 8)
    };
    for member in members {
        shape.depth = shape.depth.max(member.depth.saturating_add(2));
        shape.max_handles = shape.max_handles.saturating_add(member.max_handles);
        shape.max_out_of_line = shape
            .max_out_of_line
            .saturating_add(align8(member.inline_size))
            .saturating_add(member.max_out_of_line);
    }
    shape
}

fn union_shape(members: &[TypeShape]) -> TypeShape {
    const TAG_SIZE: u32 = 4;
    let alignment = members.iter().map(|m| m.alignment).fold(TAG_SIZE, u32::max);
    let data_offset = align_to(TAG_SIZE, alignment);
    let largest = members.iter().map(|m| m.inline_size).max().unwrap_or(0);
    TypeShape {
        inline_size: align_to(data_offset.saturating_add(largest), alignment),
        alignment,
        depth: members.iter().map(|m| m.depth).max().unwrap_or(0),
        max_handles: members.iter().map(|m| m.max_handles).max().unwrap_or(0),
        max_out_of_line: members.iter().map(|m| m.max_out_of_line).max().unwrap_or(0),
    }
}

fn xunion_shape(members: &[TypeShape]) -> TypeShape {
    TypeShape {
        inline_size: 24,
        alignment: 8,
        depth: members
            .iter()
            .map(|m| m.depth.saturating_add(1))
            .max()
            .unwrap_or(1),
        max_handles: members.iter().map(|m| m.max_handles).max().unwrap_or(0),
        max_out_of_line: members
            .iter()
            .map(|m| align8(m.inline_size).saturating_add(m.max_out_of_line))
            .max()
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align_to(5, 4), 8);
        assert_eq!(align_to(8, 4), 8);
        assert_eq!(align8(1), 8);
        assert_eq!(align8(u32::MAX), u32::MAX);
        assert_eq!(align8(u32::MAX - 2), u32::MAX);
    }

    #[test]
    fn test_struct_layout() {
        let byte = primitive_shape(PrimitiveSubtype::Uint8);
        let word = primitive_shape(PrimitiveSubtype::Uint32);
        let shape = struct_shape(None, &[byte, word, byte]);
        assert_eq!(shape.inline_size, 12);
        assert_eq!(shape.alignment, 4);

        let empty = struct_shape(None, &[]);
        assert_eq!(empty.inline_size, 1);

        let message = struct_shape(Some(MESSAGE_HEADER_SIZE), &[word]);
        assert_eq!(message.inline_size, 24);
    }

    #[test]
    fn test_union_layout() {
        let byte = primitive_shape(PrimitiveSubtype::Uint8);
        let long = primitive_shape(PrimitiveSubtype::Uint64);
        let shape = union_shape(&[byte, long]);
        assert_eq!(shape.alignment, 8);
        assert_eq!(shape.inline_size, 16);
    }

    #[test]
    fn test_boxing_moves_out_of_line() {
        let word = primitive_shape(PrimitiveSubtype::Uint32);
        let boxed = struct_shape(None, &[word]).boxed();
        assert_eq!(boxed.inline_size, 8);
        assert_eq!(boxed.max_out_of_line, 8);
        assert_eq!(boxed.depth, 1);
    }

    #[test]
    fn test_unbounded_saturates() {
        let boxed = TypeShape::unbounded().boxed();
        assert_eq!(boxed.depth, u32::MAX);
        assert_eq!(boxed.max_out_of_line, u32::MAX);
    }

    #[test]
    fn test_table_and_xunion() {
        let word = primitive_shape(PrimitiveSubtype::Uint32);
        let table = table_shape(2, &[word]);
        assert_eq!(table.inline_size, 16);
        assert_eq!(table.max_out_of_line, 2 * 16 + 8);
        assert_eq!(table.depth, 2);

        let xunion = xunion_shape(&[word]);
        assert_eq!(xunion.inline_size, 24);
        assert_eq!(xunion.max_out_of_line, 8);
    }
}
