//! Structural scanning shared by the parser and the mutator.
//!
//! Both sides locate declarations and their closing braces through [`Outline`],
//! so they always agree on where an entity body ends.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(datasource|generator|model|enum)[ \t]+(\w+)\s*\{").unwrap()
});

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//[ \t]*===[ \t]*(.+?)[ \t]*===[ \t]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Datasource,
    Generator,
    Model,
    Enum,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "datasource" => Some(Self::Datasource),
            "generator" => Some(Self::Generator),
            "model" => Some(Self::Model),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Datasource => "datasource",
            Self::Generator => "generator",
            Self::Model => "model",
            Self::Enum => "enum",
        }
    }
}

/// A top-level `keyword Name { ... }` block, as byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub keyword: Keyword,
    pub name: String,
    /// Offset of the first character of the declaration line.
    pub start: usize,
    /// Offset of the opening brace.
    pub open: usize,
    /// Offset of the matching closing brace, if the block is balanced.
    pub close: Option<usize>,
    /// Where the body stops: the closing brace, or the next declaration when unbalanced.
    pub end: usize,
}

impl Declaration {
    pub fn body_range(&self) -> Range<usize> {
        self.open + 1..self.end
    }

    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body_range()]
    }
}

/// Declarations of a text, found on a masked copy so that braces and keywords
/// inside comments and string literals are never seen.
#[derive(Debug, Clone)]
pub struct Outline {
    declarations: Vec<Declaration>,
}

impl Outline {
    pub fn new(text: &str) -> Self {
        let masked = scrub(text, Mode::Mask);
        let mut declarations: Vec<Declaration> = Vec::new();
        let mut resume = 0;

        let captures: Vec<_> = DECLARATION_RE.captures_iter(&masked).collect();
        for (i, caps) in captures.iter().enumerate() {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            if whole.start < resume {
                continue;
            }
            let Some(keyword) = caps.get(1).and_then(|m| Keyword::from_str(m.as_str())) else {
                continue;
            };
            let name = caps.get(2).map_or("", |m| m.as_str()).to_string();
            let open = whole.end - 1;
            let close = block_end(&masked, open);

            let end = match close {
                Some(close) => close,
                None => {
                    let next = captures[i + 1..]
                        .iter()
                        .filter_map(|c| c.get(0))
                        .map(|m| m.start())
                        .find(|&s| s > open);
                    tracing::debug!(%name, "unbalanced braces, body truncated at next declaration");
                    next.unwrap_or(masked.len())
                }
            };
            resume = close.map_or(open + 1, |c| c + 1);

            declarations.push(Declaration {
                keyword,
                name,
                start: whole.start,
                open,
                close,
                end,
            });
        }

        Self { declarations }
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn find(&self, keyword: Keyword, name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.keyword == keyword && d.name == name)
    }

    pub fn model(&self, name: &str) -> Option<&Declaration> {
        self.find(Keyword::Model, name)
    }
}

/// Offset of the brace closing the one at `open`, by counted depth.
///
/// `masked` must come from [`mask`] (or be free of comments and strings).
pub fn block_end(masked: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in masked.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace comments with spaces, keeping newlines, byte offsets and file separator lines.
pub fn strip_comments(text: &str) -> String {
    scrub(text, Mode::Strip)
}

/// Like [`strip_comments`], but also blanks string literal contents and separator lines.
pub fn mask(text: &str) -> String {
    scrub(text, Mode::Mask)
}

/// The file name announced by a `// === name ===` separator line.
pub fn separator_name(line: &str) -> Option<&str> {
    SEPARATOR_RE
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn separator_line(name: &str) -> String {
    format!("// === {} ===", name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strip,
    Mask,
}

fn scrub(text: &str, mode: Mode) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        if in_string {
            match c {
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                // Unterminated literal: stop at end of line.
                '\n' => {
                    in_string = false;
                    out.push(c);
                }
                '\\' => {
                    let escaped = text[i + 1..].chars().next().filter(|&e| e != '\n');
                    let len = 1 + escaped.map_or(0, char::len_utf8);
                    keep_or_blank(&mut out, &text[i..i + len], mode == Mode::Strip);
                    i += len;
                    continue;
                }
                _ => keep_or_blank(&mut out, &text[i..i + c.len_utf8()], mode == Mode::Strip),
            }
            i += c.len_utf8();
            continue;
        }

        let rest = &text[i..];
        if rest.starts_with("//") {
            let len = rest.find('\n').unwrap_or(rest.len());
            let comment = &rest[..len];
            let keep = mode == Mode::Strip && at_line_start(text, i) && separator_name(comment).is_some();
            keep_or_blank(&mut out, comment, keep);
            i += len;
        } else if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map_or(rest.len(), |n| n + 4);
            keep_or_blank(&mut out, &rest[..len], false);
            i += len;
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            i += c.len_utf8();
        }
    }

    out
}

fn keep_or_blank(out: &mut String, s: &str, keep: bool) {
    if keep {
        out.push_str(s);
        return;
    }
    for c in s.chars() {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        }
    }
}

fn at_line_start(text: &str, pos: usize) -> bool {
    let line_start = text[..pos].rfind('\n').map_or(0, |n| n + 1);
    text[line_start..pos].trim().is_empty()
}
