/// Normalize free text into a URL-safe slug: lowercase, diacritics
/// transliterated, non-alphanumeric runs collapsed to single hyphens.
/// Heading anchors and path segments both go through here.
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Slug an entire vault-relative path, segment by segment.
///
/// Markdown segments keep their `.md` suffix through slugging so the
/// mapping table can still tell documents from assets; the suffix is
/// only swapped for `.html` when output paths are computed.
pub fn slug_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_suffix(".md") {
            Some(stem) => format!("{}.md", slugify(stem)),
            None => slugify(segment),
        })
        .collect::<Vec<_>>()
        .join("/")
}
