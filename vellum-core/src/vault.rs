use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

#[derive(Debug)]
pub enum VaultError {
    MissingRoot(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::MissingRoot(p) => write!(f, "Vault directory not found: {}", p.display()),
            VaultError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for VaultError {}

/// Keys we care about from a document's YAML frontmatter. Everything
/// else is carried along untouched by serde's unknown-field handling.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub publish: Option<bool>,
}

/// The source tree being exported: a root directory plus the flat list
/// of vault-relative, slash-separated file paths underneath it.
pub struct Vault {
    root: PathBuf,
    files: Vec<String>,
}

impl Vault {
    /// Walk `root` and collect every file, skipping hidden entries
    /// (`.obsidian/`, `.git/`, dotfiles).
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, VaultError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(VaultError::MissingRoot(root));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&root) {
                files.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        files.sort();

        Ok(Self { root, files })
    }

    /// Assemble a vault from an already-known file list. Hosts embedding
    /// the library (and tests) use this to skip the directory walk.
    pub fn assemble<P: Into<PathBuf>>(root: P, files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn abs_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub fn read_text(&self, path: &str) -> Result<String, VaultError> {
        let abs = self.abs_path(path);
        fs::read_to_string(&abs).map_err(|source| VaultError::Io { path: abs, source })
    }

    pub fn read_binary(&self, path: &str) -> Result<Vec<u8>, VaultError> {
        let abs = self.abs_path(path);
        fs::read(&abs).map_err(|source| VaultError::Io { path: abs, source })
    }

    /// Resolve a wiki linkpath to a concrete vault path, Obsidian-style:
    /// the linkpath matches any file whose path ends with it, with or
    /// without a `.md` extension, case-insensitively as a fallback. When
    /// several files match, the one closest to the referencing document
    /// (longest shared directory prefix) wins. An empty linkpath refers
    /// to the current document.
    pub fn resolve_linkpath(&self, linkpath: &str, from: &str) -> Option<String> {
        let needle = linkpath.trim().trim_start_matches("./").replace('\\', "/");
        if needle.is_empty() {
            return Some(from.to_string());
        }
        let lowered = needle.to_lowercase();

        let mut best: Option<&String> = None;
        let mut best_affinity = 0usize;
        for path in &self.files {
            if !matches_linkpath(path, &needle, &lowered) {
                continue;
            }
            let affinity = directory_affinity(path, from);
            if best.is_none() || affinity > best_affinity {
                best = Some(path);
                best_affinity = affinity;
            }
        }
        best.cloned()
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn matches_linkpath(path: &str, needle: &str, lowered: &str) -> bool {
    if ends_with_segments(path, needle) || ends_with_segments(path, &format!("{needle}.md")) {
        return true;
    }
    let lower_path = path.to_lowercase();
    ends_with_segments(&lower_path, lowered)
        || ends_with_segments(&lower_path, &format!("{lowered}.md"))
}

fn ends_with_segments(path: &str, suffix: &str) -> bool {
    path == suffix || path.ends_with(&format!("/{suffix}"))
}

/// Shared leading directory segments between two vault paths; used to
/// pick the nearest of several linkpath candidates.
fn directory_affinity(a: &str, b: &str) -> usize {
    let mut a_dir: Vec<&str> = a.split('/').collect();
    a_dir.pop();
    let mut b_dir: Vec<&str> = b.split('/').collect();
    b_dir.pop();
    a_dir
        .iter()
        .zip(b_dir.iter())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Split a leading `---` YAML frontmatter block off a document. Returns
/// the parsed frontmatter (default on absence or parse failure) and the
/// remaining body.
pub fn split_frontmatter(text: &str) -> (Frontmatter, &str) {
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (Frontmatter::default(), text);
    };
    if first.trim_end() != "---" {
        return (Frontmatter::default(), text);
    }

    let yaml_start = first.len();
    let mut pos = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            let yaml = &text[yaml_start..pos];
            let body = &text[pos + line.len()..];
            let matter = serde_yaml::from_str(yaml).unwrap_or_default();
            return (matter, body);
        }
        pos += line.len();
    }

    // Unterminated fence: treat the whole document as body.
    (Frontmatter::default(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vault() -> Vault {
        Vault::assemble(
            "/vault",
            vec![
                "index.md".to_string(),
                "Notes/First Note.md".to_string(),
                "Notes/Deep/First Note.md".to_string(),
                "Projects/Roadmap.md".to_string(),
                "img/Pic 1.png".to_string(),
            ],
        )
    }

    #[test]
    fn resolves_bare_note_name_without_extension() {
        let vault = sample_vault();
        assert_eq!(
            vault.resolve_linkpath("Roadmap", "index.md"),
            Some("Projects/Roadmap.md".to_string())
        );
    }

    #[test]
    fn resolves_case_insensitively() {
        let vault = sample_vault();
        assert_eq!(
            vault.resolve_linkpath("roadmap", "index.md"),
            Some("Projects/Roadmap.md".to_string())
        );
    }

    #[test]
    fn resolves_assets_by_basename() {
        let vault = sample_vault();
        assert_eq!(
            vault.resolve_linkpath("Pic 1.png", "Notes/First Note.md"),
            Some("img/Pic 1.png".to_string())
        );
    }

    #[test]
    fn nearest_match_wins_on_ambiguity() {
        let vault = sample_vault();
        assert_eq!(
            vault.resolve_linkpath("First Note", "Notes/Deep/Scratch.md"),
            Some("Notes/Deep/First Note.md".to_string())
        );
        assert_eq!(
            vault.resolve_linkpath("Deep/First Note", "index.md"),
            Some("Notes/Deep/First Note.md".to_string())
        );
    }

    #[test]
    fn empty_linkpath_is_the_current_document() {
        let vault = sample_vault();
        assert_eq!(
            vault.resolve_linkpath("", "Notes/First Note.md"),
            Some("Notes/First Note.md".to_string())
        );
    }

    #[test]
    fn unknown_linkpath_resolves_to_none() {
        let vault = sample_vault();
        assert_eq!(vault.resolve_linkpath("No Such Note", "index.md"), None);
    }

    #[test]
    fn frontmatter_is_split_and_parsed() {
        let text = "---\ntitle: Hello\npublish: false\n---\n# Body\n";
        let (matter, body) = split_frontmatter(text);
        assert_eq!(matter.title.as_deref(), Some("Hello"));
        assert_eq!(matter.publish, Some(false));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn document_without_frontmatter_is_untouched() {
        let text = "# Just a heading\n";
        let (matter, body) = split_frontmatter(text);
        assert!(matter.title.is_none());
        assert_eq!(body, text);
    }

    #[test]
    fn unterminated_frontmatter_is_body() {
        let text = "---\ntitle: Hello\n# Body\n";
        let (matter, body) = split_frontmatter(text);
        assert!(matter.title.is_none());
        assert_eq!(body, text);
    }
}
