use std::collections::{HashMap, HashSet};

use crate::slug::slug_path;

/// The per-run index of original vault paths, their slugged counterparts
/// and the set of documents that are part of the export.
///
/// Built once before any per-document work and passed around as a shared
/// reference afterwards; nothing mutates it during the per-file phase.
#[derive(Debug, Default)]
pub struct PathMap {
    slugs: HashMap<String, String>,
    originals: HashMap<String, String>,
    exported: HashSet<String>,
    index: Option<String>,
}

impl PathMap {
    /// Build a fresh mapping from the resolved export file list. `index`
    /// designates the one document published as `index.html` at the export
    /// root regardless of its slug, so links to it stay consistent.
    pub fn build(files: &[String], index: Option<&str>) -> Self {
        let mut map = PathMap {
            index: index.map(str::to_string),
            ..PathMap::default()
        };
        for file in files {
            let slugged = map.compute_slug(file);
            map.slugs.insert(file.clone(), slugged.clone());
            // Best-effort inverse; on slug collision the last writer wins.
            map.originals.insert(slugged, file.clone());
            map.exported.insert(file.clone());
        }
        map
    }

    /// Exact membership test against the current export set.
    pub fn is_exported(&self, path: &str) -> bool {
        self.exported.contains(path)
    }

    /// The slug for `path`, cached when the path was part of the last
    /// build, computed ad hoc otherwise. Referenced-but-not-exported
    /// paths still get a plausible slug this way.
    pub fn slug_for(&self, path: &str) -> String {
        match self.slugs.get(path) {
            Some(slugged) => slugged.clone(),
            None => self.compute_slug(path),
        }
    }

    /// Inverse lookup, only meaningful for paths seen by the last build.
    pub fn original_for(&self, slugged: &str) -> Option<&str> {
        self.originals.get(slugged).map(String::as_str)
    }

    /// The final output path for a document: its slug with the `.md`
    /// suffix swapped for `.html`.
    pub fn output_path(&self, path: &str) -> String {
        let slugged = self.slug_for(path);
        match slugged.strip_suffix(".md") {
            Some(stem) => format!("{stem}.html"),
            None => slugged,
        }
    }

    fn compute_slug(&self, path: &str) -> String {
        if self.index.as_deref() == Some(path) {
            "index.md".to_string()
        } else {
            slug_path(path)
        }
    }
}

/// Shortest `../`-based reference from `from` to `to`, both given as
/// slash-separated file paths in the same virtual tree. The reference
/// point is the directory containing `from`.
pub fn relative(from: &str, to: &str) -> String {
    let mut from_dir: Vec<&str> = from.split('/').collect();
    from_dir.pop();
    let to_segments: Vec<&str> = to.split('/').collect();

    let common = from_dir
        .iter()
        .zip(to_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from_dir.len() - common + to_segments.len());
    for _ in common..from_dir.len() {
        parts.push("..");
    }
    parts.extend(&to_segments[common..]);

    if parts.is_empty() {
        "./".to_string()
    } else {
        parts.join("/")
    }
}
