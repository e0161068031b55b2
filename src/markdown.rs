//! Markdown subset used in AI replies.
//!
//! Replies are rendered line by line. Each line becomes exactly one
//! [`Block`]: a spacer, a heading (`#`, `##`, `###`), a bullet (`* ` or
//! `- `), a numbered item (`1. `) or a paragraph. Bullets, numbered items
//! and paragraphs may contain `**bold**` spans; headings are taken
//! literally. Nothing else is interpreted.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::locale::{Direction, font_family_for};

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\.\s(.*)").expect("numbered item pattern is valid"));

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").expect("bold span pattern is valid"));

const ACCENT: &str = "text-[#FF5C00]";

/// Inline run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
}

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Blank line.
    Spacer,
    Heading { level: u8, text: String },
    Bullet(Vec<Inline>),
    Numbered { number: String, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
}

/// Split `text` into blocks, one per line.
#[must_use]
pub fn parse(text: &str) -> Vec<(Block, &str)> {
    text.split('\n').map(|line| (parse_line(line), line)).collect()
}

fn parse_line(line: &str) -> Block {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Block::Spacer;
    }

    for (level, marker) in [(3, "### "), (2, "## "), (1, "# ")] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Block::Heading {
                level,
                text: rest.to_string(),
            };
        }
    }

    if let Some(rest) = trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))
    {
        return Block::Bullet(parse_inline(rest));
    }

    if let Some(caps) = NUMBERED.captures(trimmed) {
        return Block::Numbered {
            number: caps[1].to_string(),
            content: parse_inline(&caps[2]),
        };
    }

    Block::Paragraph(parse_inline(line))
}

/// Split `text` into plain and `**bold**` runs. Bold spans are matched
/// lazily, so `**a** and **b**` yields two bold runs.
#[must_use]
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut runs = Vec::new();
    let mut last = 0;
    for m in BOLD.find_iter(text) {
        if m.start() > last {
            runs.push(Inline::Text(text[last..m.start()].to_string()));
        }
        let span = m.as_str();
        runs.push(Inline::Bold(span[2..span.len() - 2].to_string()));
        last = m.end();
    }
    if last < text.len() {
        runs.push(Inline::Text(text[last..].to_string()));
    }
    runs
}

/// Render an AI reply to an HTML fragment.
///
/// ```rust
/// use mandaleen_chat::locale::Direction;
/// use mandaleen_chat::markdown::render_html;
///
/// let html = render_html("Hello **there**", Direction::Ltr);
/// assert!(html.contains("<strong"));
/// assert!(html.contains(">there</strong>"));
/// ```
#[must_use]
pub fn render_html(text: &str, direction: Direction) -> String {
    let row_class = if direction.is_rtl() {
        "flex items-start gap-2 mb-1 flex-row-reverse"
    } else {
        "flex items-start gap-2 mb-1"
    };

    let mut out = String::from(r#"<div class="space-y-1">"#);
    for (block, line) in parse(text) {
        let font = font_family_for(line);
        match block {
            Block::Spacer => out.push_str(r#"<div class="h-2"></div>"#),
            Block::Heading { level, text } => {
                let size = match level {
                    1 => "text-2xl font-bold mb-3 mt-4",
                    2 => "text-xl font-bold mb-2 mt-4",
                    _ => "text-lg font-bold mb-2 mt-3",
                };
                let _ = write!(
                    out,
                    r#"<h{level} class="{size} {ACCENT}" style="font-family: {font}">{}</h{level}>"#,
                    escape_html(&text)
                );
            }
            Block::Bullet(content) => {
                let _ = write!(
                    out,
                    r#"<div class="{row_class}" style="font-family: {font}"><span class="{ACCENT} mt-1 text-sm">•</span><span class="flex-1">{}</span></div>"#,
                    render_inline(&content)
                );
            }
            Block::Numbered { number, content } => {
                let _ = write!(
                    out,
                    r#"<div class="{row_class}" style="font-family: {font}"><span class="{ACCENT} mt-1 text-sm font-semibold">{number}.</span><span class="flex-1">{}</span></div>"#,
                    render_inline(&content)
                );
            }
            Block::Paragraph(content) => {
                let _ = write!(
                    out,
                    r#"<p class="mb-2 leading-relaxed" style="font-family: {font}">{}</p>"#,
                    render_inline(&content)
                );
            }
        }
    }
    out.push_str("</div>");
    out
}

fn render_inline(runs: &[Inline]) -> String {
    let mut out = String::new();
    for run in runs {
        match run {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Bold(text) => {
                let _ = write!(
                    out,
                    r#"<strong class="font-bold {ACCENT}" style="font-family: {}">{}</strong>"#,
                    font_family_for(text),
                    escape_html(text)
                );
            }
        }
    }
    out
}

/// Escape text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
