//! Markdown rendering service
//!
//! Renders user-authored markdown (FAQ answers, program descriptions,
//! college sections) to HTML:
//! - fenced code blocks are syntax highlighted with syntect
//! - headings carry `id` anchors matching the table of contents
//! - external links open in a new tab with `rel="noopener noreferrer"`
//! - images load lazily and hide themselves when broken
//! - raw HTML in the source is escaped
//!
//! The table of contents is extracted line by line from the display string,
//! after truncation, so headings past the cut never appear in it.
//!
//! ```
//! use unicms::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Admissions\n\nApply by **May**.");
//! assert!(html.contains("<h1 id=\"admissions\">"));
//! assert!(html.contains("<strong>"));
//! ```

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::university::generate_slug;

/// Words per minute used for read-time estimates
const WORDS_PER_MINUTE: usize = 200;

static TOC_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#{1,3})\s+(.+?)\s*#*\s*$").expect("valid TOC heading regex")
});

static IMAGE_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));

static LINK_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link regex"));

static FIRST_H1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s+(.+?)\s*#*\s*$").expect("valid H1 regex"));

/// Table of contents entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level, 1 to 3
    pub level: u8,
    pub text: String,
    /// Anchor id of the rendered heading
    pub id: String,
}

/// Rendered markdown with its table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMarkdown {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub truncated: bool,
}

/// Compact projection: first H1 plus reading metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactView {
    pub title: Option<String>,
    pub word_count: usize,
    pub read_minutes: usize,
    /// There is more to read than the title
    pub has_more: bool,
}

/// A thread-safe Markdown renderer with syntax highlighting support.
#[derive(Clone)]
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Creates a renderer using the "base16-ocean.dark" highlighting theme.
    pub fn new() -> Self {
        Self::with_theme("base16-ocean.dark")
    }

    /// Creates a renderer with a specific syntect theme, falling back to
    /// "base16-ocean.dark" if the theme is unknown.
    pub fn with_theme(theme_name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();

        let validated_theme = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            "base16-ocean.dark".to_string()
        };

        Self {
            syntax_set,
            theme_set: Arc::new(theme_set),
            theme_name: validated_theme,
        }
    }

    /// Renders Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        let parser = Parser::new_ext(markdown, options);
        let events = self.process_events(parser);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Truncates to `max_len` (if any), then renders and extracts the TOC
    /// from the same truncated string.
    pub fn render_with_toc(&self, markdown: &str, max_len: Option<usize>) -> RenderedMarkdown {
        let display = match max_len {
            Some(max) => truncate(markdown, max),
            None => markdown.to_string(),
        };
        RenderedMarkdown {
            html: self.render(&display),
            toc: extract_toc(&display),
            truncated: display != markdown,
        }
    }

    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut ids = HeadingIds::default();
        let mut heading: Option<PendingHeading<'a>> = None;
        let mut image: Option<PendingImage> = None;
        let mut code: Option<PendingCode> = None;

        for event in parser {
            if let Some(block) = code.as_mut() {
                match event {
                    Event::Text(text) => block.content.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let highlighted = match &block.lang {
                            Some(lang) => self.highlight_code(&block.content, lang),
                            None => self.plain_code_block(&block.content),
                        };
                        code = None;
                        emit(&mut events, &mut heading, Event::Html(highlighted.into()));
                    }
                    _ => {}
                }
                continue;
            }

            if let Some(img) = image.as_mut() {
                match event {
                    Event::End(TagEnd::Image) => {
                        let tag = img.to_html();
                        image = None;
                        emit(&mut events, &mut heading, Event::Html(tag.into()));
                    }
                    Event::Text(text) | Event::Code(text) => img.alt.push_str(&text),
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code = Some(PendingCode {
                        lang,
                        content: String::new(),
                    });
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    heading = Some(PendingHeading {
                        level: level as usize,
                        events: Vec::new(),
                        text: String::new(),
                    });
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(pending) = heading.take() {
                        let id = ids.next(&pending.text);
                        events.push(Event::Html(format!("<h{} id=\"{}\">", pending.level, id).into()));
                        events.extend(pending.events);
                        events.push(Event::Html(format!("</h{}>\n", pending.level).into()));
                    }
                }
                Event::Start(Tag::Image { dest_url, title, .. }) => {
                    image = Some(PendingImage {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }
                Event::Start(Tag::Link { dest_url, title, .. }) if is_external(&dest_url) => {
                    let title_attr = if title.is_empty() {
                        String::new()
                    } else {
                        format!(" title=\"{}\"", html_escape(&title))
                    };
                    let open = format!(
                        "<a href=\"{}\"{} target=\"_blank\" rel=\"noopener noreferrer\">",
                        html_escape(&dest_url),
                        title_attr
                    );
                    emit(&mut events, &mut heading, Event::Html(open.into()));
                }
                // Author-supplied HTML is shown as text
                Event::Html(raw) | Event::InlineHtml(raw) => {
                    if let Some(pending) = heading.as_mut() {
                        pending.text.push_str(&raw);
                    }
                    emit(&mut events, &mut heading, Event::Text(raw));
                }
                Event::Text(ref text) | Event::Code(ref text) => {
                    if let Some(pending) = heading.as_mut() {
                        pending.text.push_str(text);
                    }
                    emit(&mut events, &mut heading, event);
                }
                other => emit(&mut events, &mut heading, other),
            }
        }

        events
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang));

        match syntax {
            Some(syntax) => {
                let theme = &self.theme_set.themes[&self.theme_name];
                match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
                    Ok(html) => html,
                    Err(_) => self.plain_code_block(code),
                }
            }
            None => self.plain_code_block_with_lang(code, lang),
        }
    }

    fn plain_code_block(&self, code: &str) -> String {
        format!("<pre><code>{}</code></pre>", html_escape(code))
    }

    fn plain_code_block_with_lang(&self, code: &str, lang: &str) -> String {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            html_escape(lang),
            html_escape(code)
        )
    }
}

struct PendingHeading<'a> {
    level: usize,
    events: Vec<Event<'a>>,
    text: String,
}

struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

impl PendingImage {
    fn to_html(&self) -> String {
        let title_attr = if self.title.is_empty() {
            String::new()
        } else {
            format!(" title=\"{}\"", html_escape(&self.title))
        };
        format!(
            "<img src=\"{}\" alt=\"{}\"{} loading=\"lazy\" onerror=\"this.style.display='none'\" />",
            html_escape(&self.src),
            html_escape(&self.alt),
            title_attr
        )
    }
}

struct PendingCode {
    lang: Option<String>,
    content: String,
}

fn emit<'a>(events: &mut Vec<Event<'a>>, heading: &mut Option<PendingHeading<'a>>, event: Event<'a>) {
    match heading {
        Some(pending) => pending.events.push(event),
        None => events.push(event),
    }
}

fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}

/// Unique heading anchors; repeats get `-1`, `-2`, ...
#[derive(Default)]
struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    fn next(&mut self, text: &str) -> String {
        let mut base = generate_slug(&strip_inline_markers(text));
        if base.is_empty() {
            base = "section".to_string();
        }
        let count = self.seen.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        id
    }
}

/// Visible text of a raw heading line: images dropped, links reduced to
/// their label, emphasis and code markers removed
fn heading_text(raw: &str) -> String {
    let without_images = IMAGE_SYNTAX.replace_all(raw, "");
    let labels = LINK_SYNTAX.replace_all(&without_images, "$1");
    strip_inline_markers(&labels).trim().to_string()
}

fn strip_inline_markers(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '*' | '`')).collect()
}

/// Clips `content` to at most `max_len` characters, appending "..." when cut.
pub fn truncate(content: &str, max_len: usize) -> String {
    match content.char_indices().nth(max_len) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

/// Extracts `#`, `##` and `###` headings line by line, skipping fenced code.
pub fn extract_toc(content: &str) -> Vec<TocEntry> {
    let mut ids = HeadingIds::default();
    let mut in_fence = false;
    let mut toc = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = TOC_HEADING.captures(line) {
            let text = heading_text(&caps[2]);
            if text.is_empty() {
                continue;
            }
            toc.push(TocEntry {
                level: caps[1].len() as u8,
                id: ids.next(&text),
                text,
            });
        }
    }

    toc
}

/// Compact projection of a document: only the first H1 and reading metadata.
pub fn compact_view(content: &str) -> CompactView {
    let title = FIRST_H1
        .captures(content)
        .map(|caps| strip_inline_markers(&caps[1]).trim().to_string());
    let word_count = content.split_whitespace().filter(|w| w.chars().any(char::is_alphanumeric)).count();
    let title_words = title.as_deref().map(|t| t.split_whitespace().count()).unwrap_or(0);

    CompactView {
        title,
        word_count,
        read_minutes: word_count.div_ceil(WORDS_PER_MINUTE).max(1),
        has_more: word_count > title_words,
    }
}

/// Escapes HTML special characters in a string.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
