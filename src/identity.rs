use std::collections::HashMap;
use std::path::Path;

use crate::{
    model::ItemId,
    project::Project,
};

/// Asset identity indexes for one resolution call.
///
/// Built once from the project's registered media, then consulted for every
/// file binding in that call. Lookups are idempotent within the call: a miss
/// imports the file and registers it under both keys immediately, so a second
/// lookup of the same underlying file returns the same handle.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_path: HashMap<String, ItemId>,
    by_uri: HashMap<String, ItemId>,
}

impl IdentityIndex {
    pub fn build(project: &Project) -> Self {
        let mut index = Self::default();
        for (id, media) in project.media_items() {
            index
                .by_path
                .entry(normalize_path(&media.path.to_string_lossy()))
                .or_insert(id);
            if let Some(uri) = &media.uri {
                index.by_uri.entry(normalize_path(uri)).or_insert(id);
            }
        }
        index
    }

    /// Existing handle for `path`, or import-and-register.
    pub fn resolve(&mut self, project: &mut Project, path: &Path) -> ItemId {
        let key = normalize_path(&path.to_string_lossy());
        if let Some(id) = self.lookup_key(&key) {
            return id;
        }

        let id = project.import_media(path, None);
        tracing::debug!(path = %path.display(), id = id.0, "imported new media asset");
        self.by_path.insert(key.clone(), id);
        self.by_uri.insert(key, id);
        id
    }

    pub fn lookup(&self, path: &Path) -> Option<ItemId> {
        self.lookup_key(&normalize_path(&path.to_string_lossy()))
    }

    fn lookup_key(&self, key: &str) -> Option<ItemId> {
        self.by_path
            .get(key)
            .or_else(|| self.by_uri.get(key))
            .copied()
    }
}

/// Canonical comparison key for a filesystem path or resource identifier.
///
/// Strips resource-locator prefixes, converts `\` to `/`, collapses duplicate
/// separators, and drops `.` segments. Parent segments are kept verbatim: the
/// index must never equate two paths it cannot prove identical.
pub fn normalize_path(source: &str) -> String {
    let mut s = source.replace('\\', "/");
    for prefix in ["file://localhost", "file://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }

    let absolute = s.starts_with('/');
    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        out.push(part);
    }

    let joined = out.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_collapses_separators_and_prefixes() {
        assert_eq!(normalize_path("/a//b/./c.png"), "/a/b/c.png");
        assert_eq!(normalize_path(r"C:\media\clip.mp4"), "C:/media/clip.mp4");
        assert_eq!(normalize_path("file:///a/b.png"), "/a/b.png");
        assert_eq!(normalize_path("file://localhost/a/b.png"), "/a/b.png");
    }

    #[test]
    fn separator_variants_share_one_identity() {
        let mut project = Project::new();
        let mut index = IdentityIndex::build(&project);

        let first = index.resolve(&mut project, &PathBuf::from("/media//in/./a.png"));
        let second = index.resolve(&mut project, &PathBuf::from("/media/in/a.png"));
        assert_eq!(first, second);
        assert_eq!(project.media_items().count(), 1);
    }

    #[test]
    fn uri_index_matches_path_lookup() {
        let mut project = Project::new();
        project.import_media(
            &PathBuf::from("/assets/logo.png"),
            Some("file:///assets/logo.png".to_string()),
        );

        let mut index = IdentityIndex::build(&project);
        let via_path = index.resolve(&mut project, &PathBuf::from("/assets/logo.png"));
        let via_uri = index.resolve(&mut project, &PathBuf::from("file:///assets//logo.png"));
        assert_eq!(via_path, via_uri);
        assert_eq!(project.media_items().count(), 1);
    }

    #[test]
    fn miss_imports_once_and_registers_both_keys() {
        let mut project = Project::new();
        let mut index = IdentityIndex::build(&project);

        let id = index.resolve(&mut project, &PathBuf::from("new.mp4"));
        assert_eq!(index.lookup(&PathBuf::from("new.mp4")), Some(id));
        assert_eq!(index.lookup(&PathBuf::from(".//new.mp4")), Some(id));
        assert_eq!(project.media_items().count(), 1);
    }
}
