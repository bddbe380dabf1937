use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tera::Context;

use crate::config::{ExportConfig, SiteConfig};
use crate::links::{marker_count, rewrite_links, scan_wiki_references, style_dead_links, LinkReference};
use crate::markdown::{first_heading, render_markdown};
use crate::media::{
    basename, collect_media, rewrite_embeds, EmbedReference, MediaKind, MediaRegistry, ASSETS_DIR,
};
use crate::paths::PathMap;
use crate::template::{Renderer, TemplateError};
use crate::vault::{split_frontmatter, Vault, VaultError};

#[derive(Debug)]
pub enum ExportError {
    MissingVaultDir,
    Vault(VaultError),
    TemplateError(TemplateError),
    PatternError(globset::Error),
    SerializationError(serde_json::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<VaultError> for ExportError {
    fn from(err: VaultError) -> Self {
        ExportError::Vault(err)
    }
}

impl From<TemplateError> for ExportError {
    fn from(err: TemplateError) -> Self {
        ExportError::TemplateError(err)
    }
}

impl From<globset::Error> for ExportError {
    fn from(err: globset::Error) -> Self {
        ExportError::PatternError(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::SerializationError(err)
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::MissingVaultDir => write!(f, "Vault directory not specified"),
            ExportError::Vault(e) => write!(f, "Vault error: {}", e),
            ExportError::TemplateError(e) => write!(f, "Template error: {}", e),
            ExportError::PatternError(e) => write!(f, "Exclude pattern error: {}", e),
            ExportError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            ExportError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ExportError {}

#[derive(Debug, Serialize)]
pub struct NavItem {
    pub text: String,
    pub link: String,
}

/// What one export run did.
#[derive(Debug)]
pub struct ExportReport {
    pub pages: usize,
    pub assets: usize,
    pub broken_links: usize,
}

/// A wiki reference that does not lead to an exported file.
#[derive(Debug)]
pub struct BrokenReference {
    pub source: String,
    pub reference: String,
}

pub struct ExporterBuilder {
    vault_dir: Option<PathBuf>,
    output_dir: PathBuf,
    theme_dir: Option<PathBuf>,
    site: SiteConfig,
    options: ExportConfig,
    registry: MediaRegistry,
    custom: HashMap<String, serde_json::Value>,
}

impl Default for ExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterBuilder {
    pub fn new() -> Self {
        Self {
            vault_dir: None,
            output_dir: PathBuf::from("./out"),
            theme_dir: None,
            site: SiteConfig::default(),
            options: ExportConfig::default(),
            registry: MediaRegistry::default(),
            custom: HashMap::new(),
        }
    }

    // Required configuration
    pub fn vault_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.vault_dir = Some(path.as_ref().to_path_buf());
        self
    }

    // Optional paths
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn theme_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.theme_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn site_config(mut self, config: SiteConfig) -> Self {
        self.site = config;
        self
    }

    pub fn export_config(mut self, options: ExportConfig) -> Self {
        self.options = options;
        self
    }

    pub fn media_registry(mut self, registry: MediaRegistry) -> Self {
        self.registry = registry;
        self
    }

    // Custom template context data
    pub fn add_custom<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, ExportError> {
        let json_value = serde_json::to_value(value)?;
        self.custom.insert(key.to_string(), json_value);
        Ok(self)
    }

    /// Open the vault, load the theme and freeze the configuration.
    /// Missing required configuration is rejected here, before any
    /// per-file processing.
    pub fn build(self) -> Result<Exporter, ExportError> {
        let vault_dir = self.vault_dir.ok_or(ExportError::MissingVaultDir)?;
        let vault = Vault::open(&vault_dir)?;

        let mut renderer = match &self.theme_dir {
            Some(dir) => Renderer::from_theme(dir)?,
            None => Renderer::built_in()?,
        };
        renderer.set_global("site", &self.site);
        for (key, value) in &self.custom {
            renderer.set_global(key, value);
        }

        Ok(Exporter {
            vault,
            renderer,
            output_dir: self.output_dir,
            options: self.options,
            registry: self.registry,
        })
    }
}

struct Document {
    path: String,
    title: String,
    body: String,
}

pub struct Exporter {
    vault: Vault,
    renderer: Renderer,
    output_dir: PathBuf,
    options: ExportConfig,
    registry: MediaRegistry,
}

impl Exporter {
    pub fn builder() -> ExporterBuilder {
        ExporterBuilder::new()
    }

    /// Run the whole pipeline: build the path mapping, rewrite and
    /// render every document, then copy referenced media into `assets/`.
    /// Documents are processed strictly sequentially; the first failure
    /// aborts the remaining batch.
    pub fn run(&mut self) -> Result<ExportReport, ExportError> {
        let (documents, map) = self.collect_documents()?;
        let nav = navigation(&documents, &map);
        self.renderer.set_global("nav", &nav);

        let mut broken_links = 0;
        let mut seen_media: HashSet<String> = HashSet::new();
        let mut media: Vec<String> = Vec::new();

        for doc in &documents {
            // Embeds before links: an unconsumed embed's inner brackets
            // would be misparsed as a wiki link.
            let with_embeds =
                rewrite_embeds(&doc.body, &self.vault, &map, &self.registry, &doc.path);
            let with_links = rewrite_links(&with_embeds, &self.vault, &map, &doc.path);
            let rendered = render_markdown(&with_links, &self.options.syntax_theme);
            broken_links += marker_count(&rendered);
            let content = style_dead_links(&rendered);

            for target in collect_media(&doc.body, &self.vault, &self.registry, &doc.path) {
                if seen_media.insert(target.clone()) {
                    media.push(target);
                }
            }

            let out_rel = map.output_path(&doc.path);
            let mut context = Context::new();
            context.insert("title", &doc.title);
            context.insert("content", &content);
            context.insert("root", &"../".repeat(out_rel.matches('/').count()));

            let page = self.renderer.render("page.html", &context)?;
            write_file(&self.output_dir.join(&out_rel), page.as_bytes())?;
        }

        for target in &media {
            let data = self.vault.read_binary(target)?;
            let dest = self.output_dir.join(ASSETS_DIR).join(basename(target));
            write_file(&dest, &data)?;
        }

        Ok(ExportReport {
            pages: documents.len(),
            assets: media.len(),
            broken_links,
        })
    }

    /// Resolve every wiki reference without writing anything; returns
    /// the ones a full export would downgrade to dead links.
    pub fn check(&self) -> Result<Vec<BrokenReference>, ExportError> {
        let (documents, map) = self.collect_documents()?;
        let mut broken = Vec::new();

        for doc in &documents {
            for (is_embed, inner) in scan_wiki_references(&doc.body) {
                let resolves = if is_embed {
                    let embed = EmbedReference::parse(&inner);
                    self.vault
                        .resolve_linkpath(&embed.target, &doc.path)
                        .map(|target| self.registry.classify(&target) != MediaKind::Unrecognized)
                        .unwrap_or(false)
                } else {
                    let link = LinkReference::parse(&inner);
                    self.vault
                        .resolve_linkpath(link.linkpath, &doc.path)
                        .map(|target| map.is_exported(&target))
                        .unwrap_or(false)
                };
                if !resolves {
                    broken.push(BrokenReference {
                        source: doc.path.clone(),
                        reference: inner,
                    });
                }
            }
        }
        Ok(broken)
    }

    /// The export candidates (markdown, not excluded, not unpublished)
    /// and the path mapping built from them. The mapping is built before
    /// any per-document call and is read-only from then on.
    fn collect_documents(&self) -> Result<(Vec<Document>, PathMap), ExportError> {
        let excluded = build_globset(&self.options.exclude)?;

        let mut documents = Vec::new();
        for path in self.vault.files() {
            if !path.ends_with(".md") || excluded.is_match(path.as_str()) {
                continue;
            }
            let text = self.vault.read_text(path)?;
            let (matter, body) = split_frontmatter(&text);
            if matter.publish == Some(false) {
                continue;
            }
            let title = matter
                .title
                .clone()
                .or_else(|| first_heading(body))
                .unwrap_or_else(|| default_title(path));
            documents.push(Document {
                path: path.clone(),
                title,
                body: body.to_string(),
            });
        }

        let index = self.options.index.clone().or_else(|| {
            ["index.md", "README.md"]
                .iter()
                .find(|candidate| documents.iter().any(|d| d.path == **candidate))
                .map(|s| s.to_string())
        });

        let paths: Vec<String> = documents.iter().map(|d| d.path.clone()).collect();
        let map = PathMap::build(&paths, index.as_deref());
        Ok((documents, map))
    }
}

fn navigation(documents: &[Document], map: &PathMap) -> Vec<NavItem> {
    let mut items: Vec<NavItem> = documents
        .iter()
        .map(|doc| NavItem {
            text: doc.title.clone(),
            link: map.output_path(&doc.path),
        })
        .collect();
    // Index first, then alphabetical.
    items.sort_by(|a, b| {
        (a.link != "index.html")
            .cmp(&(b.link != "index.html"))
            .then_with(|| a.text.cmp(&b.text))
    });
    items
}

fn default_title(path: &str) -> String {
    basename(path).trim_end_matches(".md").to_string()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
