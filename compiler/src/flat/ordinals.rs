//! Hashed ordinals for protocol methods and xunion members

use raw_ast::AttributeList;

use super::name::LibraryName;

pub const SELECTOR_ATTRIBUTE: &str = "Selector";

/// `<library>/<Container>.<selector>`. A selector that already contains a
/// `/` names the full method path and is used as is.
pub fn full_selector(library: &LibraryName, container: &str, selector: &str) -> String {
    if selector.contains('/') {
        selector.to_string()
    } else {
        format!("{}/{}.{}", library, container, selector)
    }
}

/// The `Selector` attribute if present, the member name otherwise
pub fn selector_for<'a>(attributes: &'a AttributeList, member_name: &'a str) -> &'a str {
    match attributes.get(SELECTOR_ATTRIBUTE) {
        Some(attribute) if !attribute.value.is_empty() => &attribute.value,
        _ => member_name,
    }
}

/// First four bytes of the BLAKE3 digest, little-endian, high bit cleared.
/// May be zero; callers reject that.
pub fn hash_ordinal(full_selector: &str) -> u32 {
    let digest = blake3::hash(full_selector.as_bytes());
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) & 0x7fff_ffff
}

pub fn generate_ordinal(
    library: &LibraryName,
    container: &str,
    attributes: &AttributeList,
    member_name: &str,
) -> u32 {
    let selector = selector_for(attributes, member_name);
    hash_ordinal(&full_selector(library, container, selector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_ast::Attribute;
    use source_map::{FileId, SourcePosition, SourceSpan};

    fn selector(value: &str) -> AttributeList {
        let span = SourceSpan::single_position(SourcePosition::new(1, 1, 0), FileId::new(0));
        AttributeList::new(vec![Attribute {
            name: SELECTOR_ATTRIBUTE.to_string(),
            value: value.to_string(),
            span,
        }])
    }

    #[test]
    fn test_full_selector() {
        let library = LibraryName::from_dotted("fuchsia.io");
        assert_eq!(full_selector(&library, "Node", "Close"), "fuchsia.io/Node.Close");
        assert_eq!(full_selector(&library, "Node", "other/Base.Open"), "other/Base.Open");
    }

    #[test]
    fn test_selector_attribute_overrides_name() {
        let attributes = selector("Renamed");
        assert_eq!(selector_for(&attributes, "Original"), "Renamed");
        assert_eq!(selector_for(&AttributeList::default(), "Original"), "Original");
    }

    #[test]
    fn test_hash_is_deterministic_and_31_bits() {
        let a = hash_ordinal("example/Foo.Bar");
        assert_eq!(a, hash_ordinal("example/Foo.Bar"));
        assert_ne!(a, hash_ordinal("example/Foo.Baz"));
        assert_eq!(a & 0x8000_0000, 0);
    }

    #[test]
    fn test_same_selector_same_ordinal() {
        let library = LibraryName::from_dotted("example");
        let renamed = generate_ordinal(&library, "P", &selector("Foo"), "Bar");
        let plain = generate_ordinal(&library, "P", &AttributeList::default(), "Foo");
        assert_eq!(renamed, plain);
    }
}
