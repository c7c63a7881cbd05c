//! Programmatic construction of raw files
//!
//! There is no parser in this workspace, so tests and benchmarks assemble
//! syntax trees directly. Every node gets its own synthetic span: one line per
//! node, column 1, so "previous occurrence" diagnostics render distinct
//! `file:line:col` positions.

use std::cell::Cell;

use source_map::SourceMap;

use crate::*;

pub struct FileBuilder {
    file_id: FileId,
    next_line: Cell<usize>,
    file: File,
}

impl FileBuilder {
    pub fn new(file_id: FileId, library_name: &str) -> Self {
        let first = SourceSpan::single_position(SourcePosition::new(1, 1, 0), file_id);
        let file = File::new(CompoundIdentifier::from_dotted(library_name, first), first);
        Self {
            file_id,
            next_line: Cell::new(2),
            file,
        }
    }

    /// Register an (empty) file named `file_name` and build into it
    pub fn in_source_map(source_map: &mut SourceMap, file_name: &str, library_name: &str) -> Self {
        let file_id = source_map.add_file(file_name, "");
        Self::new(file_id, library_name)
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// A fresh span on the next synthetic line
    pub fn span(&self) -> SourceSpan {
        let line = self.next_line.get();
        self.next_line.set(line + 1);
        SourceSpan::single_position(SourcePosition::new(line, 1, line * 80), self.file_id)
    }

    pub fn identifier(&self, name: &str) -> Identifier {
        Identifier::new(name, self.span())
    }

    pub fn compound(&self, dotted: &str) -> CompoundIdentifier {
        CompoundIdentifier::from_dotted(dotted, self.span())
    }

    /// Type constructor naming `name`; refine with the `TypeConstructor` combinators
    pub fn ty(&self, name: &str) -> TypeConstructor {
        let span = self.span();
        TypeConstructor::new(CompoundIdentifier::from_dotted(name, span), span)
    }

    pub fn num(&self, text: &str) -> Constant {
        Constant::Literal(Literal {
            kind: LiteralKind::Numeric(text.to_string()),
            span: self.span(),
        })
    }

    /// String literal; `contents` is wrapped in quotes
    pub fn string(&self, contents: &str) -> Constant {
        Constant::Literal(Literal {
            kind: LiteralKind::String(format!("\"{}\"", contents)),
            span: self.span(),
        })
    }

    pub fn bool_lit(&self, value: bool) -> Constant {
        Constant::Literal(Literal {
            kind: if value {
                LiteralKind::True
            } else {
                LiteralKind::False
            },
            span: self.span(),
        })
    }

    pub fn const_ref(&self, dotted: &str) -> Constant {
        Constant::Identifier(self.compound(dotted))
    }

    pub fn attr(&self, name: &str, value: &str) -> Attribute {
        Attribute {
            name: name.to_string(),
            value: value.to_string(),
            span: self.span(),
        }
    }

    pub fn ordinal(&self, value: u32) -> Ordinal {
        Ordinal {
            value,
            span: self.span(),
        }
    }

    // Bits and enums

    pub fn bits_member(&self, name: &str, value: Constant) -> BitsMember {
        BitsMember {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            value,
            span: self.span(),
        }
    }

    pub fn bits(
        &self,
        name: &str,
        subtype: Option<TypeConstructor>,
        members: Vec<BitsMember>,
    ) -> BitsDeclaration {
        BitsDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            maybe_type_ctor: subtype,
            members,
            span: self.span(),
        }
    }

    pub fn enum_member(&self, name: &str, value: Constant) -> EnumMember {
        EnumMember {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            value,
            span: self.span(),
        }
    }

    pub fn enum_decl(
        &self,
        name: &str,
        subtype: Option<TypeConstructor>,
        members: Vec<EnumMember>,
    ) -> EnumDeclaration {
        EnumDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            maybe_type_ctor: subtype,
            members,
            span: self.span(),
        }
    }

    pub fn const_decl(
        &self,
        name: &str,
        type_ctor: TypeConstructor,
        constant: Constant,
    ) -> ConstDeclaration {
        ConstDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            type_ctor,
            constant,
            span: self.span(),
        }
    }

    // Structs, tables, unions

    pub fn struct_member(&self, type_ctor: TypeConstructor, name: &str) -> StructMember {
        StructMember {
            attributes: AttributeList::default(),
            type_ctor,
            identifier: self.identifier(name),
            maybe_default_value: None,
            span: self.span(),
        }
    }

    pub fn struct_member_with_default(
        &self,
        type_ctor: TypeConstructor,
        name: &str,
        default: Constant,
    ) -> StructMember {
        StructMember {
            maybe_default_value: Some(default),
            ..self.struct_member(type_ctor, name)
        }
    }

    pub fn struct_decl(&self, name: &str, members: Vec<StructMember>) -> StructDeclaration {
        StructDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            members,
            span: self.span(),
        }
    }

    pub fn table_member(
        &self,
        ordinal: u32,
        type_ctor: TypeConstructor,
        name: &str,
    ) -> TableMember {
        TableMember {
            ordinal: self.ordinal(ordinal),
            maybe_used: Some(TableMemberUsed {
                attributes: AttributeList::default(),
                type_ctor,
                identifier: self.identifier(name),
                maybe_default_value: None,
            }),
            span: self.span(),
        }
    }

    pub fn table_reserved(&self, ordinal: u32) -> TableMember {
        TableMember {
            ordinal: self.ordinal(ordinal),
            maybe_used: None,
            span: self.span(),
        }
    }

    pub fn table(&self, name: &str, members: Vec<TableMember>) -> TableDeclaration {
        TableDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            members,
            span: self.span(),
        }
    }

    fn union_used(&self, type_ctor: TypeConstructor, name: &str) -> UnionMemberUsed {
        UnionMemberUsed {
            attributes: AttributeList::default(),
            type_ctor,
            identifier: self.identifier(name),
        }
    }

    pub fn union_member(
        &self,
        ordinal: u32,
        type_ctor: TypeConstructor,
        name: &str,
    ) -> UnionMember {
        UnionMember {
            ordinal: self.ordinal(ordinal),
            maybe_used: Some(self.union_used(type_ctor, name)),
            span: self.span(),
        }
    }

    pub fn union_reserved(&self, ordinal: u32) -> UnionMember {
        UnionMember {
            ordinal: self.ordinal(ordinal),
            maybe_used: None,
            span: self.span(),
        }
    }

    pub fn union_decl(&self, name: &str, members: Vec<UnionMember>) -> UnionDeclaration {
        UnionDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            members,
            span: self.span(),
        }
    }

    /// XUnion member whose ordinal is derived from its name
    pub fn xunion_member(&self, type_ctor: TypeConstructor, name: &str) -> XUnionMember {
        XUnionMember {
            maybe_ordinal: None,
            maybe_used: Some(self.union_used(type_ctor, name)),
            span: self.span(),
        }
    }

    pub fn xunion_member_at(
        &self,
        ordinal: u32,
        type_ctor: TypeConstructor,
        name: &str,
    ) -> XUnionMember {
        XUnionMember {
            maybe_ordinal: Some(self.ordinal(ordinal)),
            maybe_used: Some(self.union_used(type_ctor, name)),
            span: self.span(),
        }
    }

    pub fn xunion_reserved(&self, ordinal: u32) -> XUnionMember {
        XUnionMember {
            maybe_ordinal: Some(self.ordinal(ordinal)),
            maybe_used: None,
            span: self.span(),
        }
    }

    pub fn xunion(&self, name: &str, members: Vec<XUnionMember>) -> XUnionDeclaration {
        XUnionDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            members,
            span: self.span(),
        }
    }

    // Protocols and services

    pub fn param(&self, type_ctor: TypeConstructor, name: &str) -> Parameter {
        Parameter {
            attributes: AttributeList::default(),
            type_ctor,
            identifier: self.identifier(name),
            span: self.span(),
        }
    }

    fn parameter_list(&self, parameters: Option<Vec<Parameter>>) -> Option<ParameterList> {
        parameters.map(|parameters| ParameterList {
            parameters,
            span: self.span(),
        })
    }

    /// `None` for the request makes an event; `None` for the response a one-way call
    pub fn method(
        &self,
        name: &str,
        request: Option<Vec<Parameter>>,
        response: Option<Vec<Parameter>>,
    ) -> ProtocolMethod {
        ProtocolMethod {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            maybe_request: self.parameter_list(request),
            maybe_response: self.parameter_list(response),
            maybe_error_ctor: None,
            span: self.span(),
        }
    }

    pub fn protocol(
        &self,
        name: &str,
        composed: &[&str],
        methods: Vec<ProtocolMethod>,
    ) -> ProtocolDeclaration {
        ProtocolDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            composed_protocols: composed
                .iter()
                .map(|protocol| ComposeProtocol {
                    protocol_name: self.compound(protocol),
                    span: self.span(),
                })
                .collect(),
            methods,
            span: self.span(),
        }
    }

    pub fn service_member(&self, type_ctor: TypeConstructor, name: &str) -> ServiceMember {
        ServiceMember {
            attributes: AttributeList::default(),
            type_ctor,
            identifier: self.identifier(name),
            span: self.span(),
        }
    }

    pub fn service(&self, name: &str, members: Vec<ServiceMember>) -> ServiceDeclaration {
        ServiceDeclaration {
            attributes: AttributeList::default(),
            identifier: self.identifier(name),
            members,
            span: self.span(),
        }
    }

    // File-level

    pub fn using(&mut self, path: &str) -> &mut Self {
        let using = Using {
            attributes: AttributeList::default(),
            using_path: self.compound(path),
            maybe_alias: None,
            maybe_type_ctor: None,
            span: self.span(),
        };
        self.file.using_list.push(using);
        self
    }

    pub fn using_as(&mut self, path: &str, alias: &str) -> &mut Self {
        let using = Using {
            attributes: AttributeList::default(),
            using_path: self.compound(path),
            maybe_alias: Some(self.identifier(alias)),
            maybe_type_ctor: None,
            span: self.span(),
        };
        self.file.using_list.push(using);
        self
    }

    /// `using name = type_ctor;`
    pub fn alias(&mut self, name: &str, type_ctor: TypeConstructor) -> &mut Self {
        let using = Using {
            attributes: AttributeList::default(),
            using_path: self.compound(name),
            maybe_alias: None,
            maybe_type_ctor: Some(type_ctor),
            span: self.span(),
        };
        self.file.using_list.push(using);
        self
    }

    pub fn library_attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.file.attributes.push(attribute);
        self
    }

    pub fn push(&mut self, declaration: impl Into<Declaration>) -> &mut Self {
        self.file.push(declaration);
        self
    }

    pub fn finish(self) -> File {
        self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_are_distinct() {
        let builder = FileBuilder::new(FileId::new(0), "example");
        let a = builder.span();
        let b = builder.span();
        assert_ne!(a.start.line, b.start.line);
        assert_eq!(a.file_id, b.file_id);
    }

    #[test]
    fn test_build_file() {
        let mut source_map = SourceMap::new();
        let mut builder = FileBuilder::in_source_map(&mut source_map, "a.fidl", "fuchsia.example");
        let member = builder.struct_member(
            builder.ty("vector").with_arg(builder.ty("uint8")),
            "data",
        );
        let decl = builder.struct_decl("Blob", vec![member]);
        builder.using("fuchsia.io").push(decl);
        let file = builder.finish();

        assert_eq!(file.library_name.to_dotted(), "fuchsia.example");
        assert_eq!(file.using_list.len(), 1);
        assert_eq!(file.struct_declarations.len(), 1);
        let ctor = &file.struct_declarations[0].members[0].type_ctor;
        assert_eq!(ctor.identifier.to_dotted(), "vector");
        assert_eq!(
            ctor.maybe_arg_type.as_ref().map(|arg| arg.identifier.to_dotted()),
            Some("uint8".to_string())
        );
        assert_eq!(source_map.file_name(file.file_id()), Some("a.fidl"));
    }

    #[test]
    fn test_string_literal_is_quoted() {
        let builder = FileBuilder::new(FileId::new(0), "example");
        match builder.string("hi") {
            Constant::Literal(literal) => assert_eq!(literal.source_text(), "\"hi\""),
            other => panic!("unexpected constant {:?}", other),
        }
    }
}
