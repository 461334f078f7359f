//! ``src/preview/render.rs``
//! ============================================================================
//! # Markdown Rendering and Outline Extraction
//!
//! `CmarkRenderer` turns Markdown into HTML with `pulldown-cmark` and stamps
//! every heading with an anchor id. The outline returned by
//! [`MarkdownRenderer::headings`] uses the very same ids, so an outline click
//! can scroll the preview to `#anchor`.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1..=6
    pub level: u8,
    pub text: String,
    pub anchor_id: String,
}

/// Rendering seam used by the preview coordinator.
pub trait MarkdownRenderer: Send + Sync {
    fn render_to_html(&self, source: &str) -> String;

    /// Headings in document order, with ids matching the rendered HTML.
    fn headings(&self, source: &str) -> Vec<Heading>;
}

/// CommonMark renderer with the GitHub-style extensions the viewer supports.
#[derive(Debug, Clone, Copy)]
pub struct CmarkRenderer {
    options: Options,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);

        Self { options }
    }
}

impl CmarkRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and assign anchor ids to every heading start tag.
    fn annotate<'a>(&self, source: &'a str) -> (Vec<Event<'a>>, Vec<Heading>) {
        let mut events: Vec<Event<'a>> = Parser::new_ext(source, self.options).collect();
        let mut headings: Vec<Heading> = Vec::new();
        let mut anchors = AnchorSet::default();

        let mut open: Option<(usize, String)> = None;

        for index in 0..events.len() {
            match &events[index] {
                Event::Start(Tag::Heading { .. }) => open = Some((index, String::new())),

                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, buf)) = open.as_mut() {
                        buf.push_str(text);
                    }
                }

                Event::SoftBreak | Event::HardBreak => {
                    if let Some((_, buf)) = open.as_mut() {
                        buf.push(' ');
                    }
                }

                Event::End(TagEnd::Heading(level)) => {
                    let level = *level as u8;

                    if let Some((start, text)) = open.take() {
                        let text = text.trim().to_string();
                        let anchor_id = anchors.claim(&slugify(&text));

                        if let Event::Start(Tag::Heading { id, .. }) = &mut events[start]
                            && !anchor_id.is_empty()
                        {
                            *id = Some(CowStr::from(anchor_id.clone()));
                        }

                        headings.push(Heading {
                            level,
                            text,
                            anchor_id,
                        });
                    }
                }

                _ => {}
            }
        }

        (events, headings)
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render_to_html(&self, source: &str) -> String {
        let (events, _) = self.annotate(source);

        let mut html_output = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    fn headings(&self, source: &str) -> Vec<Heading> {
        self.annotate(source).1
    }
}

/// Anchor slug for heading text: lower-cased, whitespace runs become `-`,
/// then everything except letters, digits, `_` and `-` is dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
            continue;
        }

        in_space = false;
        if ch.is_alphanumeric() || ch == '_' || ch == '-' {
            slug.push(ch);
        }
    }

    slug
}

/// Hands out unique anchors: `intro`, `intro-1`, `intro-2`, …
#[derive(Debug, Default)]
struct AnchorSet {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl AnchorSet {
    fn claim(&mut self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }

        if self.used.insert(base.to_string()) {
            return base.to_string();
        }

        let suffix = self.next_suffix.entry(base.to_string()).or_insert(1);
        loop {
            let candidate = format!("{base}-{suffix}");
            *suffix += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Getting Started\n\
        Intro text.\n\n\
        ## Install `mdview`\n\n\
        ```sh\n# not a heading\n```\n\n\
        ### Getting Started\n\n\
        | a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn test_slug_rule() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("A  &  B"), "a--b");
        assert_eq!(slugify("Überblick der Änderungen"), "überblick-der-änderungen");
        assert_eq!(slugify("snake_case-name"), "snake_case-name");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_headings_skip_code_and_dedupe() {
        let headings = CmarkRenderer::new().headings(DOC);

        let outline: Vec<(u8, &str, &str)> = headings
            .iter()
            .map(|h| (h.level, h.text.as_str(), h.anchor_id.as_str()))
            .collect();
        assert_eq!(
            outline,
            [
                (1, "Getting Started", "getting-started"),
                (2, "Install mdview", "install-mdview"),
                (3, "Getting Started", "getting-started-1"),
            ]
        );
    }

    #[test]
    fn test_html_carries_outline_ids() {
        let renderer = CmarkRenderer::new();
        let html = renderer.render_to_html(DOC);

        for heading in renderer.headings(DOC) {
            assert!(
                html.contains(&format!("id=\"{}\"", heading.anchor_id)),
                "missing anchor {} in {html}",
                heading.anchor_id
            );
        }
        assert!(html.contains("<table>"));
        assert!(html.contains("# not a heading"));
    }

    #[test]
    fn test_extensions_enabled() {
        let html = CmarkRenderer::new().render_to_html("- [x] done\n\n~~old~~\n\nnote[^1]\n\n[^1]: foot\n");

        assert!(html.contains("checkbox"));
        assert!(html.contains("<del>old</del>"));
        assert!(html.contains("footnote"));
    }

    #[test]
    fn test_setext_and_suffix_collisions() {
        let source = "Intro\n=====\n\n# Intro 1\n\n# Intro\n";
        let anchors: Vec<String> = CmarkRenderer::new()
            .headings(source)
            .into_iter()
            .map(|h| h.anchor_id)
            .collect();

        assert_eq!(anchors, ["intro", "intro-1", "intro-2"]);
    }
}
