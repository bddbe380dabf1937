use std::sync::LazyLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use regex::{Captures, Regex};

use crate::media::EMBED_RE;
use crate::paths::{relative, PathMap};
use crate::slug::slugify;
use crate::vault::Vault;

/// Private URI scheme used to smuggle "this reference did not resolve"
/// through the Markdown renderer, which accepts only Markdown and returns
/// only HTML. Every anchor carrying this scheme is consumed by
/// [`style_dead_links`] after rendering; none may survive into output.
pub const BROKEN_SCHEME: &str = "vellum-broken:";

pub(crate) static WIKI_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+?)\]\]").unwrap());

static BROKEN_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?s)<a href="{BROKEN_SCHEME}([^"]*)"[^>]*>(.*?)</a>"#
    ))
    .unwrap()
});

/// A parsed `[[...]]` wiki link: `[[linkpath#subpath|display]]` with the
/// subpath and alias both optional.
#[derive(Debug, PartialEq, Eq)]
pub struct LinkReference<'a> {
    pub linkpath: &'a str,
    pub subpath: Option<&'a str>,
    pub display: &'a str,
}

impl<'a> LinkReference<'a> {
    pub fn parse(inner: &'a str) -> Self {
        let (target, alias) = match inner.split_once('|') {
            Some((target, alias)) => (target, Some(alias)),
            None => (inner, None),
        };
        let (linkpath, subpath) = match target.split_once('#') {
            Some((linkpath, subpath)) => (linkpath, Some(subpath)),
            None => (target, None),
        };
        // Without an alias the reader sees the linkpath alone; for
        // same-document references ([[#Heading]]) the subpath stands in.
        let display = alias.unwrap_or(if linkpath.is_empty() {
            subpath.unwrap_or(linkpath)
        } else {
            linkpath
        });
        Self {
            linkpath,
            subpath,
            display,
        }
    }
}

/// Emit the sentinel Markdown hyperlink for an unresolvable reference,
/// carrying the percent-encoded original link text for diagnostics.
fn broken_marker(display: &str, original: &str) -> String {
    let payload = utf8_percent_encode(original, NON_ALPHANUMERIC);
    format!("[{display}]({BROKEN_SCHEME}{payload})")
}

/// Rewrite every `[[...]]` occurrence in `text` into either a standard
/// relative hyperlink or a broken-reference marker. Must run after the
/// embed pass (which consumes `![[...]]`) and before the Markdown
/// renderer, which has no notion of wiki syntax.
pub fn rewrite_links(text: &str, vault: &Vault, map: &PathMap, source: &str) -> String {
    let source_out = map.output_path(source);
    rewrite_outside_code(text, |chunk| {
        WIKI_LINK_RE
            .replace_all(chunk, |caps: &Captures| {
                rewrite_link(&caps[1], vault, map, source, &source_out)
            })
            .into_owned()
    })
}

fn rewrite_link(inner: &str, vault: &Vault, map: &PathMap, source: &str, source_out: &str) -> String {
    let link = LinkReference::parse(inner);

    let Some(target) = vault.resolve_linkpath(link.linkpath, source) else {
        return broken_marker(link.display, inner);
    };
    // An excluded target reads the same as a missing one.
    if !map.is_exported(&target) {
        return broken_marker(link.display, inner);
    }

    let mut href = relative(source_out, &map.output_path(&target));
    if let Some(subpath) = link.subpath {
        href.push('#');
        href.push_str(&slugify(subpath));
    }
    format!("[{}]({})", link.display, href)
}

/// Second pass over rendered HTML: replace every sentinel anchor with an
/// inert span, keeping the anchor text visible and the decoded original
/// reference in the title attribute. Ordinary anchors are left alone.
pub fn style_dead_links(html: &str) -> String {
    BROKEN_ANCHOR_RE
        .replace_all(html, |caps: &Captures| {
            let original = percent_decode_str(&caps[1]).decode_utf8_lossy();
            format!(
                r#"<span class="broken-link" title="Unresolved reference: {}">{}</span>"#,
                html_escape::encode_quoted_attribute(&original),
                &caps[2],
            )
        })
        .into_owned()
}

/// Number of broken-reference markers present in `text`. Counted on the
/// rendered HTML just before styling, this is the run's broken-link tally.
pub fn marker_count(text: &str) -> usize {
    text.matches(BROKEN_SCHEME).count()
}

/// Apply `rewrite` to the stretches of `text` that are neither fenced
/// code blocks nor inline code spans, so wiki syntax inside code is
/// never touched.
pub(crate) fn rewrite_outside_code<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut fence: Option<&str> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            out.push_str(line);
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(if trimmed.starts_with("```") { "```" } else { "~~~" });
            out.push_str(line);
            continue;
        }

        // Backtick-delimited segments alternate outside/inside code.
        for (i, segment) in line.split('`').enumerate() {
            if i > 0 {
                out.push('`');
            }
            if i % 2 == 0 {
                out.push_str(&rewrite(segment));
            } else {
                out.push_str(segment);
            }
        }
    }
    out
}

/// Every wiki reference in `text` outside code regions, embeds first,
/// tagged with whether it was an embed. Drives `check`-style reporting.
pub(crate) fn scan_wiki_references(text: &str) -> Vec<(bool, String)> {
    let mut found = Vec::new();
    rewrite_outside_code(text, |chunk| {
        let without_embeds = EMBED_RE.replace_all(chunk, |caps: &Captures| {
            found.push((true, caps[1].to_string()));
            String::new()
        });
        for caps in WIKI_LINK_RE.captures_iter(&without_embeds) {
            found.push((false, caps[1].to_string()));
        }
        chunk.to_string()
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> Vault {
        Vault::assemble(
            "/vault",
            vec![
                "index.md".to_string(),
                "dir/Note.md".to_string(),
                "dir/source.md".to_string(),
                "Private/Secret.md".to_string(),
            ],
        )
    }

    fn map() -> PathMap {
        PathMap::build(
            &[
                "index.md".to_string(),
                "dir/Note.md".to_string(),
                "dir/source.md".to_string(),
            ],
            Some("index.md"),
        )
    }

    #[test]
    fn parses_all_three_wiki_link_shapes() {
        assert_eq!(
            LinkReference::parse("Note"),
            LinkReference {
                linkpath: "Note",
                subpath: None,
                display: "Note"
            }
        );
        assert_eq!(
            LinkReference::parse("Note#My Heading"),
            LinkReference {
                linkpath: "Note",
                subpath: Some("My Heading"),
                display: "Note"
            }
        );
        assert_eq!(
            LinkReference::parse("Note#My Heading|see here"),
            LinkReference {
                linkpath: "Note",
                subpath: Some("My Heading"),
                display: "see here"
            }
        );
        assert_eq!(
            LinkReference::parse("#Heading"),
            LinkReference {
                linkpath: "",
                subpath: Some("Heading"),
                display: "Heading"
            }
        );
    }

    #[test]
    fn resolved_link_becomes_relative_hyperlink() {
        let out = rewrite_links("See [[Note]].", &vault(), &map(), "dir/source.md");
        assert_eq!(out, "See [Note](note.html).");
    }

    #[test]
    fn heading_subpath_becomes_slugged_fragment() {
        let out = rewrite_links("[[Note#My Heading]]", &vault(), &map(), "index.md");
        assert_eq!(out, "[Note](dir/note.html#my-heading)");
    }

    #[test]
    fn alias_is_kept_as_display_text() {
        let out = rewrite_links("[[Note|the note]]", &vault(), &map(), "index.md");
        assert_eq!(out, "[the note](dir/note.html)");
    }

    #[test]
    fn link_to_designated_index_uses_index_html() {
        let out = rewrite_links("[[index|home]]", &vault(), &map(), "dir/source.md");
        assert_eq!(out, "[home](../index.html)");
    }

    #[test]
    fn unresolved_link_becomes_marker() {
        let out = rewrite_links("[[Missing]]", &vault(), &map(), "index.md");
        assert!(out.starts_with("[Missing]("));
        assert!(out.contains(BROKEN_SCHEME));
    }

    #[test]
    fn excluded_target_becomes_marker() {
        // Secret.md exists in the vault but is not in the export set.
        let out = rewrite_links("[[Secret]]", &vault(), &map(), "index.md");
        assert!(out.contains(BROKEN_SCHEME));
    }

    #[test]
    fn code_regions_are_left_alone() {
        let text = "a [[Note]] b\n```\n[[Note]]\n```\nand `[[Note]]` inline\n";
        let out = rewrite_links(text, &vault(), &map(), "index.md");
        assert_eq!(
            out,
            "a [Note](dir/note.html) b\n```\n[[Note]]\n```\nand `[[Note]]` inline\n"
        );
    }

    #[test]
    fn styler_replaces_sentinel_anchor_with_inert_span() {
        // What the renderer produces from a broken_marker("Missing", "Missing").
        let html =
            r#"<p><a href="vellum-broken:Missing">Missing</a> and <a href="real.html">ok</a></p>"#;
        let styled = style_dead_links(html);
        assert!(styled.contains(r#"<span class="broken-link" title="Unresolved reference: Missing">Missing</span>"#));
        assert!(styled.contains(r#"<a href="real.html">ok</a>"#));
        assert_eq!(marker_count(&styled), 0);
    }

    #[test]
    fn styler_is_inert_on_ordinary_html() {
        let html = r#"<p><a href="https://example.com">out</a></p>"#;
        assert_eq!(style_dead_links(html), html);
    }

    #[test]
    fn scan_separates_embeds_from_links() {
        let refs = scan_wiki_references("![[pic.png|300]] and [[Note]]\n");
        assert_eq!(
            refs,
            vec![(true, "pic.png|300".to_string()), (false, "Note".to_string())]
        );
    }
}
