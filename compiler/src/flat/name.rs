//! Declaration names

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use source_map::SourceSpan;

/// Dotted library path, e.g. `fuchsia.io`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryName(Rc<[String]>);

impl LibraryName {
    pub fn new(components: Vec<String>) -> Self {
        Self(components.into())
    }

    pub fn from_dotted(dotted: &str) -> Self {
        Self::new(dotted.split('.').map(str::to_string).collect())
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A library component must be lowercase alphanumeric and start with a letter.
pub fn is_valid_library_component(component: &str) -> bool {
    let mut chars = component.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Identifies a declaration, or a member of one (`Color.RED`).
///
/// Built-in templates have no library. Equality, hashing and ordering ignore
/// the span.
#[derive(Debug, Clone)]
pub struct Name {
    library: Option<LibraryName>,
    decl_name: String,
    member_name: Option<String>,
    span: Option<SourceSpan>,
}

impl Name {
    pub fn new(
        library: LibraryName,
        decl_name: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Self {
        Self {
            library: Some(library),
            decl_name: decl_name.into(),
            member_name: None,
            span,
        }
    }

    /// A name that belongs to no library (built-in type templates)
    pub fn builtin(decl_name: impl Into<String>) -> Self {
        Self {
            library: None,
            decl_name: decl_name.into(),
            member_name: None,
            span: None,
        }
    }

    pub fn with_member(mut self, member_name: impl Into<String>) -> Self {
        self.member_name = Some(member_name.into());
        self
    }

    pub fn library(&self) -> Option<&LibraryName> {
        self.library.as_ref()
    }

    pub fn decl_name(&self) -> &str {
        &self.decl_name
    }

    pub fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.span
    }

    /// The same name without its member part, used to look up the owning declaration
    pub fn memberless(&self) -> Name {
        Name {
            member_name: None,
            ..self.clone()
        }
    }

    /// `library/Decl` without the member
    pub fn flat_name(&self) -> String {
        match &self.library {
            Some(library) => format!("{}/{}", library, self.decl_name),
            None => self.decl_name.clone(),
        }
    }

    fn key(&self) -> (Option<&LibraryName>, &str, Option<&str>) {
        (
            self.library.as_ref(),
            self.decl_name.as_str(),
            self.member_name.as_deref(),
        )
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by the fully qualified string form.
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flat_name())?;
        if let Some(member) = &self.member_name {
            write!(f, ".{}", member)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_map::{FileId, SourcePosition};
    use std::collections::HashSet;

    fn span(line: usize) -> SourceSpan {
        SourceSpan::single_position(SourcePosition::new(line, 1, 0), FileId::new(0))
    }

    #[test]
    fn test_display() {
        let library = LibraryName::from_dotted("fuchsia.io");
        let name = Name::new(library.clone(), "Node", None);
        assert_eq!(name.to_string(), "fuchsia.io/Node");
        assert_eq!(name.with_member("CLOSE").to_string(), "fuchsia.io/Node.CLOSE");
        assert_eq!(Name::builtin("vector").to_string(), "vector");
        assert_eq!(library.to_string(), "fuchsia.io");
    }

    #[test]
    fn test_equality_ignores_span() {
        let library = LibraryName::from_dotted("example");
        let a = Name::new(library.clone(), "Foo", Some(span(1)));
        let b = Name::new(library, "Foo", Some(span(9)));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_memberless() {
        let name = Name::new(LibraryName::from_dotted("example"), "Color", None).with_member("RED");
        assert_eq!(name.member_name(), Some("RED"));
        assert_eq!(name.memberless().member_name(), None);
        assert_ne!(name, name.memberless());
    }

    #[test]
    fn test_library_components() {
        assert!(is_valid_library_component("fuchsia"));
        assert!(is_valid_library_component("io2"));
        assert!(!is_valid_library_component("Fuchsia"));
        assert!(!is_valid_library_component("2io"));
        assert!(!is_valid_library_component("fu_chsia"));
        assert!(!is_valid_library_component(""));
    }
}
