//! Per-file import registry

use fxhash::FxHashMap;
use indexmap::IndexSet;
use source_map::{FileId, SourceSpan};

use super::ids::LibraryId;
use super::name::LibraryName;

/// One `using` directive
#[derive(Debug, Clone)]
pub struct LibraryRef {
    pub library: LibraryId,
    pub name: LibraryName,
    pub file: FileId,
    pub span: SourceSpan,
    pub used: bool,
}

/// Imports of one library, keyed per file by library path or alias
#[derive(Debug, Default, Clone)]
pub struct Dependencies {
    refs: Vec<LibraryRef>,
    by_file: FxHashMap<FileId, FxHashMap<Vec<String>, usize>>,
    libraries: IndexSet<LibraryId>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import `name` into `file`, optionally also under `alias`.
    /// Returns `false` if either key was already taken in this file.
    pub fn register(
        &mut self,
        file: FileId,
        span: SourceSpan,
        library: LibraryId,
        name: &LibraryName,
        alias: Option<&str>,
    ) -> bool {
        let index = self.refs.len();
        let keys = self.by_file.entry(file).or_default();

        let full_key = name.components().to_vec();
        if keys.contains_key(&full_key) {
            return false;
        }
        let alias_key = alias.map(|alias| vec![alias.to_string()]);
        if let Some(alias_key) = &alias_key {
            if keys.contains_key(alias_key) {
                return false;
            }
        }

        keys.insert(full_key, index);
        if let Some(alias_key) = alias_key {
            keys.insert(alias_key, index);
        }
        self.refs.push(LibraryRef {
            library,
            name: name.clone(),
            file,
            span,
            used: false,
        });
        self.libraries.insert(library);
        true
    }

    pub fn contains(&self, file: FileId, path: &[String]) -> bool {
        self.by_file
            .get(&file)
            .is_some_and(|keys| keys.contains_key(path))
    }

    /// Resolve `path` as imported in `file`, marking the import as used.
    pub fn lookup_and_use(&mut self, file: FileId, path: &[String]) -> Option<LibraryId> {
        let index = *self.by_file.get(&file)?.get(path)?;
        let library_ref = &mut self.refs[index];
        library_ref.used = true;
        Some(library_ref.library)
    }

    /// Imports never referenced, in declaration order
    pub fn unused(&self) -> impl Iterator<Item = &LibraryRef> {
        self.refs.iter().filter(|library_ref| !library_ref.used)
    }

    /// Every library imported by any file, in first-import order
    pub fn libraries(&self) -> &IndexSet<LibraryId> {
        &self.libraries
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_map::SourcePosition;

    fn span() -> SourceSpan {
        SourceSpan::single_position(SourcePosition::new(1, 1, 0), FileId::new(0))
    }

    fn path(dotted: &str) -> Vec<String> {
        dotted.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut deps = Dependencies::new();
        let file = FileId::new(0);
        let other = LibraryName::from_dotted("other.lib");
        assert!(deps.register(file, span(), LibraryId::from_index(1), &other, Some("ol")));

        assert!(deps.contains(file, &path("other.lib")));
        assert!(deps.contains(file, &path("ol")));
        assert!(!deps.contains(FileId::new(1), &path("other.lib")));

        assert_eq!(deps.unused().count(), 1);
        assert_eq!(deps.lookup_and_use(file, &path("ol")), Some(LibraryId::from_index(1)));
        assert_eq!(deps.unused().count(), 0);
        assert_eq!(deps.libraries().len(), 1);
    }

    #[test]
    fn test_duplicate_import_in_same_file() {
        let mut deps = Dependencies::new();
        let name = LibraryName::from_dotted("dep");
        assert!(deps.register(FileId::new(0), span(), LibraryId::from_index(1), &name, None));
        assert!(!deps.register(FileId::new(0), span(), LibraryId::from_index(1), &name, None));
        // Another file may import it again.
        assert!(deps.register(FileId::new(1), span(), LibraryId::from_index(1), &name, None));
        assert_eq!(deps.libraries().len(), 1);
    }
}
