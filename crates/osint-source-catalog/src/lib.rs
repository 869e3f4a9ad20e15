//! In-memory, read-only view over the source catalog JSON file.
//!
//! No errors from loading are fatal: a missing or malformed file yields an
//! empty catalog and a logged warning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use osint_protocol::Source;
use parking_lot::RwLock;

/// Splits a catalog tag field (a list of entries, each possibly itself
/// comma-separated) into a trimmed, de-duplicated, sorted set of tokens,
/// preserving the catalog's original case. Used by `list_categories` /
/// `list_locations`, which spec.md calls for "split on comma and trim
/// whitespace before de-dup" only — no case-folding.
fn tokenize<'a, I: IntoIterator<Item = &'a String>>(entries: I) -> Vec<String> {
    let mut out = std::collections::BTreeSet::new();
    for entry in entries {
        for tok in entry.split(',') {
            let cleaned = tok.trim();
            if !cleaned.is_empty() {
                out.insert(cleaned.to_string());
            }
        }
    }
    out.into_iter().collect()
}

/// Same splitting as `tokenize`, additionally lowercased. Used only for
/// `match_sources`'s intersection test, which spec.md specifies as
/// "normalised (lowercased, trimmed)".
fn tokenize_lower<'a, I: IntoIterator<Item = &'a String>>(entries: I) -> std::collections::HashSet<String> {
    let mut out = std::collections::HashSet::new();
    for entry in entries {
        for tok in entry.split(',') {
            let cleaned = tok.trim();
            if !cleaned.is_empty() {
                out.insert(cleaned.to_lowercase());
            }
        }
    }
    out
}

/// Holds the current snapshot of sources, swapped atomically on reload.
pub struct SourceCatalog {
    path: PathBuf,
    sources: RwLock<Arc<Vec<Source>>>,
}

impl SourceCatalog {
    /// Loads the catalog from `path` at construction time. If loading
    /// fails, starts with an empty snapshot rather than erroring out.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let sources = Self::read_file(&path);
        Self {
            path,
            sources: RwLock::new(Arc::new(sources)),
        }
    }

    fn read_file(path: &Path) -> Vec<Source> {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<Source>>(&raw) {
                Ok(sources) => sources,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "malformed source catalog, using empty catalog");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read source catalog, using empty catalog");
                Vec::new()
            }
        }
    }

    /// Re-reads the file and atomically replaces the in-memory snapshot.
    pub fn reload(&self) {
        let sources = Self::read_file(&self.path);
        *self.sources.write() = Arc::new(sources);
    }

    fn snapshot(&self) -> Arc<Vec<Source>> {
        self.sources.read().clone()
    }

    /// Sorted, de-duplicated union of category tags across the catalog.
    pub fn list_categories(&self) -> Vec<String> {
        let sources = self.snapshot();
        tokenize(sources.iter().flat_map(|s| s.categories.iter()))
    }

    /// Sorted, de-duplicated union of location tags across the catalog.
    pub fn list_locations(&self) -> Vec<String> {
        let sources = self.snapshot();
        tokenize(sources.iter().flat_map(|s| s.locations.iter()))
    }

    /// Every source whose normalised category set intersects
    /// `task_categories` **and** whose location set intersects
    /// `task_locations`.
    pub fn match_sources(&self, task_categories: &[String], task_locations: &[String]) -> Vec<Source> {
        let cat_set: std::collections::HashSet<String> = task_categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        let loc_set: std::collections::HashSet<String> = task_locations
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();

        let sources = self.snapshot();
        sources
            .iter()
            .filter(|source| {
                let src_cats = tokenize_lower(source.categories.iter());
                let src_locs = tokenize_lower(source.locations.iter());
                !src_cats.is_disjoint(&cat_set) && !src_locs.is_disjoint(&loc_set)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(json: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn lists_categories_and_locations_deduped_sorted_case_preserved() {
        let f = write_catalog(
            r#"[
                {"id":"s1","name":"One","url":"http://a","categories":["General, Disaster"],"locations":["International"]},
                {"id":"s2","name":"Two","url":"http://b","categories":["disaster"],"locations":["International, Regional"]}
            ]"#,
        );
        let catalog = SourceCatalog::load(f.path());
        assert_eq!(catalog.list_categories(), vec!["Disaster", "General", "disaster"]);
        assert_eq!(catalog.list_locations(), vec!["International", "Regional"]);
    }

    #[test]
    fn match_sources_still_lowercases_for_intersection() {
        let f = write_catalog(
            r#"[
                {"id":"s1","name":"One","url":"http://a","categories":["General"],"locations":["International"]}
            ]"#,
        );
        let catalog = SourceCatalog::load(f.path());
        let matched = catalog.match_sources(&["general".into()], &["INTERNATIONAL".into()]);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn matches_require_both_category_and_location_intersection() {
        let f = write_catalog(
            r#"[
                {"id":"s1","name":"One","url":"http://a","categories":["general"],"locations":["international"]},
                {"id":"s2","name":"Two","url":"http://b","categories":["general"],"locations":["local"]}
            ]"#,
        );
        let catalog = SourceCatalog::load(f.path());
        let matched = catalog.match_sources(&["General".into()], &["International".into()]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "s1");
    }

    #[test]
    fn missing_file_yields_empty_catalog() {
        let catalog = SourceCatalog::load("/nonexistent/path/sources.json");
        assert!(catalog.list_categories().is_empty());
        assert!(catalog.match_sources(&["x".into()], &["y".into()]).is_empty());
    }

    #[test]
    fn reload_replaces_snapshot() {
        let f = write_catalog(r#"[{"id":"s1","name":"One","url":"http://a","categories":["general"],"locations":["international"]}]"#);
        let catalog = SourceCatalog::load(f.path());
        assert_eq!(catalog.list_categories(), vec!["general"]);

        std::fs::write(f.path(), r#"[{"id":"s2","name":"Two","url":"http://b","categories":["weather"],"locations":["local"]}]"#).unwrap();
        catalog.reload();
        assert_eq!(catalog.list_categories(), vec!["weather"]);
    }
}
