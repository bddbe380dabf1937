use std::collections::HashSet;
use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::{Captures, Regex};

use crate::links::rewrite_outside_code;
use crate::paths::{relative, PathMap};
use crate::vault::Vault;

/// Every referenced media file is copied, unmodified, into this flat
/// directory at the export root and addressed by basename.
pub const ASSETS_DIR: &str = "assets";

pub(crate) static EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\[\]]+?)\]\]").unwrap());

const URL_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'%');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unrecognized,
}

/// Extension → kind tables. Classification is data, not control flow;
/// the default registry carries the stock allow-lists, hosts may supply
/// their own.
#[derive(Debug, Clone)]
pub struct MediaRegistry {
    image_exts: Vec<String>,
    video_exts: Vec<String>,
    video_mime: Vec<(String, String)>,
}

impl Default for MediaRegistry {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            image_exts: owned(&["png", "jpg", "jpeg", "gif", "svg", "webp", "avif"]),
            video_exts: owned(&["mp4", "webm", "mov", "m4v", "ogv", "ogg"]),
            video_mime: [
                ("mp4", "video/mp4"),
                ("m4v", "video/mp4"),
                ("webm", "video/webm"),
                ("mov", "video/quicktime"),
                ("ogv", "video/ogg"),
                ("ogg", "video/ogg"),
            ]
            .iter()
            .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
            .collect(),
        }
    }
}

impl MediaRegistry {
    pub fn new(image_exts: Vec<String>, video_exts: Vec<String>, video_mime: Vec<(String, String)>) -> Self {
        Self {
            image_exts,
            video_exts,
            video_mime,
        }
    }

    /// Classify purely by case-insensitive filename extension.
    pub fn classify(&self, path: &str) -> MediaKind {
        let Some(ext) = extension(path) else {
            return MediaKind::Unrecognized;
        };
        if self.image_exts.iter().any(|e| *e == ext) {
            MediaKind::Image
        } else if self.video_exts.iter().any(|e| *e == ext) {
            MediaKind::Video
        } else {
            MediaKind::Unrecognized
        }
    }

    pub fn video_mime(&self, path: &str) -> Option<&str> {
        let ext = extension(path)?;
        self.video_mime
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| mime.as_str())
    }
}

fn extension(path: &str) -> Option<String> {
    let basename = basename(path);
    let (_, ext) = basename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

pub(crate) fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A parsed `![[...]]` embed. Trailing pipe-delimited parameters are
/// interpreted by shape: a positive integer is the pixel width, anything
/// else non-empty is the caption. Repeats: last one wins.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EmbedReference {
    pub target: String,
    pub width: Option<u32>,
    pub caption: Option<String>,
}

impl EmbedReference {
    pub fn parse(inner: &str) -> Self {
        let mut parts = inner.split('|').map(str::trim);
        let target = parts.next().unwrap_or("").to_string();
        let mut width = None;
        let mut caption = None;
        for part in parts {
            if part.is_empty() {
                continue;
            }
            match part.parse::<u32>() {
                Ok(parsed) => width = Some(parsed),
                Err(_) => caption = Some(part.to_string()),
            }
        }
        Self {
            target,
            width,
            caption,
        }
    }
}

/// Rewrite every `![[...]]` embed in `text` into concrete HTML markup.
/// Must run before the plain-link pass, which would otherwise misparse
/// an embed's inner brackets as a wiki link.
pub fn rewrite_embeds(
    text: &str,
    vault: &Vault,
    map: &PathMap,
    registry: &MediaRegistry,
    source: &str,
) -> String {
    let source_out = map.output_path(source);
    rewrite_outside_code(text, |chunk| {
        EMBED_RE
            .replace_all(chunk, |caps: &Captures| {
                render_embed(&caps[1], vault, registry, source, &source_out)
            })
            .into_owned()
    })
}

fn render_embed(
    inner: &str,
    vault: &Vault,
    registry: &MediaRegistry,
    source: &str,
    source_out: &str,
) -> String {
    let embed = EmbedReference::parse(inner);

    let Some(target) = vault.resolve_linkpath(&embed.target, source) else {
        return missing_media(registry, &embed);
    };

    match registry.classify(&target) {
        MediaKind::Image => render_image(&embed, &target, source_out),
        MediaKind::Video => render_video(&embed, &target, source_out, registry),
        // A real file of a kind we cannot render reads as not found.
        MediaKind::Unrecognized => missing_media(registry, &embed),
    }
}

fn asset_src(target: &str, source_out: &str) -> String {
    let rel = relative(source_out, &format!("{ASSETS_DIR}/{}", basename(target)));
    utf8_percent_encode(&rel, URL_ENCODE_SET).to_string()
}

fn width_style(embed: &EmbedReference) -> String {
    match embed.width {
        Some(width) if width > 0 => format!(r#" style="width: {width}px;""#),
        _ => String::new(),
    }
}

fn render_image(embed: &EmbedReference, target: &str, source_out: &str) -> String {
    let alt = embed.caption.as_deref().unwrap_or(basename(target));
    format!(
        r#"<img src="{}" alt="{}"{}>"#,
        asset_src(target, source_out),
        html_escape::encode_quoted_attribute(alt),
        width_style(embed),
    )
}

fn render_video(
    embed: &EmbedReference,
    target: &str,
    source_out: &str,
    registry: &MediaRegistry,
) -> String {
    let title_attr = match &embed.caption {
        Some(caption) => format!(
            r#" title="{}""#,
            html_escape::encode_quoted_attribute(caption)
        ),
        None => String::new(),
    };
    let type_attr = match registry.video_mime(target) {
        Some(mime) => format!(r#" type="{mime}""#),
        None => String::new(),
    };
    format!(
        r#"<video controls{}{}><source src="{}"{}></video>"#,
        title_attr,
        width_style(embed),
        asset_src(target, source_out),
        type_attr,
    )
}

fn missing_media(registry: &MediaRegistry, embed: &EmbedReference) -> String {
    // Guess the icon from the reference text; the target never resolved.
    let icon = match registry.classify(&embed.target) {
        MediaKind::Video => "\u{1F39E}",
        _ => "\u{1F5BC}",
    };
    format!(
        r#"<span class="media-missing" title="Media not found: {}">{} {}</span>"#,
        html_escape::encode_quoted_attribute(&embed.target),
        icon,
        html_escape::encode_text(&embed.target),
    )
}

/// Every distinct resolvable media file referenced by `text`, in first
/// appearance order, de-duplicated by resolved identity rather than by
/// literal reference text. The asset-copy step consumes this.
pub fn collect_media(
    text: &str,
    vault: &Vault,
    registry: &MediaRegistry,
    source: &str,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    rewrite_outside_code(text, |chunk| {
        for caps in EMBED_RE.captures_iter(chunk) {
            let embed = EmbedReference::parse(&caps[1]);
            if let Some(target) = vault.resolve_linkpath(&embed.target, source) {
                if registry.classify(&target) != MediaKind::Unrecognized
                    && seen.insert(target.clone())
                {
                    found.push(target);
                }
            }
        }
        chunk.to_string()
    });
    found
}
