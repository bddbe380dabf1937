use std::sync::LazyLock;

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::slug::slugify;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const FALLBACK_SYNTAX_THEME: &str = "base16-ocean.dark";

/// Render a Markdown document (with wiki syntax already rewritten away)
/// to an HTML fragment. Fenced code blocks are syntax highlighted and
/// headings get stable slug ids so `#fragment` links resolve.
pub fn render_markdown(markdown: &str, syntax_theme: &str) -> String {
    let options = Options::all();
    let events: Vec<Event> = Parser::new_ext(markdown, options).collect();

    let mut processed: Vec<Event> = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                // Collect the block's text events, then emit one
                // highlighted HTML event in their place.
                let mut code = String::new();
                i += 1;
                while i < events.len() {
                    match &events[i] {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(text),
                        _ => {}
                    }
                    i += 1;
                }
                processed.push(Event::Html(highlight_code(lang, &code, syntax_theme).into()));
            }
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let id = match id {
                    Some(explicit) => explicit.clone(),
                    None => slugify(&heading_text(&events[i..])).into(),
                };
                processed.push(Event::Start(Tag::Heading {
                    level: *level,
                    id: Some(id),
                    classes: classes.clone(),
                    attrs: attrs.clone(),
                }));
            }
            event => processed.push(event.clone()),
        }
        i += 1;
    }

    let mut out = String::new();
    html::push_html(&mut out, processed.into_iter());
    out
}

/// Plain text of the heading whose Start event leads `events`.
fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in &events[1..] {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(part) | Event::Code(part) => text.push_str(part),
            _ => {}
        }
    }
    text
}

fn highlight_code(lang: &str, code: &str, theme_name: &str) -> String {
    let syntax = SYNTAX_SET.find_syntax_by_token(lang).or_else(|| {
        // Fallback mappings for unsupported languages
        match lang {
            "nix" => SYNTAX_SET.find_syntax_by_name("JavaScript"),
            "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
            _ => None,
        }
    });

    let plain = || {
        format!(
            "<pre><code>{}</code></pre>",
            html_escape::encode_text(code)
        )
    };

    match syntax {
        Some(syntax) => {
            let theme = THEME_SET
                .themes
                .get(theme_name)
                .unwrap_or(&THEME_SET.themes[FALLBACK_SYNTAX_THEME]);
            highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
        }
        None => plain(),
    }
}

/// Text of the first heading in the document, used as the page title
/// when the frontmatter does not name one.
pub fn first_heading(markdown: &str) -> Option<String> {
    let parser = Parser::new_ext(markdown, Options::all());
    let mut in_heading = false;
    let mut text = String::new();
    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) => {
                if in_heading {
                    return Some(text);
                }
            }
            Event::Text(part) | Event::Code(part) => {
                if in_heading {
                    text.push_str(&part);
                }
            }
            _ => {}
        }
    }
    None
}
