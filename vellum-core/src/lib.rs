pub mod config;
pub mod export;
pub mod links;
pub mod markdown;
pub mod media;
pub mod paths;
pub mod slug;
pub mod template;
pub mod vault;

// Re-export main types
pub use export::{BrokenReference, ExportError, ExportReport, Exporter, ExporterBuilder, NavItem};
pub use links::{rewrite_links, style_dead_links};
pub use media::{collect_media, rewrite_embeds, MediaKind, MediaRegistry};
pub use paths::{relative, PathMap};
pub use template::{Renderer, TemplateError};
pub use vault::{Vault, VaultError};
