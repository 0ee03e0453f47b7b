//! Text-splice primitives on raw schema text.
//!
//! Every primitive returns new text and leaves the input untouched when the
//! model it targets cannot be found.

use crate::scan::{Declaration, Outline, mask, strip_comments};
use std::ops::Range;

const DEFAULT_INDENT: &str = "  ";

/// Name of the field that is never rewritten.
pub const PROTECTED_FIELD: &str = "id";

struct ModelSpan {
    decl: Declaration,
    close: usize,
}

fn model_span(text: &str, entity: &str) -> Option<ModelSpan> {
    let outline = Outline::new(text);
    let decl = outline.model(entity)?.clone();
    let Some(close) = decl.close else {
        tracing::debug!(entity, "model has no closing brace, not editing");
        return None;
    };
    Some(ModelSpan { decl, close })
}

/// Byte range of the line declaring `field` inside `entity`, without its newline.
///
/// Text after the opening brace counts as a line of its own, as it does for the
/// parser. The range stops short of the model's closing brace when both share a line.
fn field_line(text: &str, entity: &str, field: &str) -> Option<Range<usize>> {
    let span = model_span(text, entity)?;
    let masked = mask(text);
    let body = span.decl.open + 1..span.close;

    let mut line_start = body.start;
    for line in masked[body.clone()].split_inclusive('\n') {
        let content = line.trim_start();
        let declares = content
            .strip_prefix(field)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace));
        if declares {
            let end = line_start + line.trim_end_matches(['\n', '\r']).len();
            return Some(line_start..end.min(span.close));
        }
        line_start += line.len();
    }

    None
}

pub fn has_field(text: &str, entity: &str, field: &str) -> bool {
    field_line(text, entity, field).is_some()
}

/// Insert `line` as the model's last field, indented like the line before it.
pub fn insert_field(text: &str, entity: &str, line: &str) -> String {
    let Some(span) = model_span(text, entity) else {
        return text.to_string();
    };
    let masked = mask(text);
    let open = span.decl.open;
    let close = span.close;

    // End of the last line in the body carrying anything other than whitespace.
    let content_end = open + 1 + masked[open + 1..close].trim_end().len();
    let has_content = content_end > open + 1;

    let indent = if has_content {
        let line_start = text[..content_end].rfind('\n').map_or(0, |n| n + 1);
        if line_start > open {
            leading_whitespace(&text[line_start..content_end])
        } else {
            DEFAULT_INDENT
        }
    } else {
        DEFAULT_INDENT
    };

    let mut output = String::with_capacity(text.len() + line.len() + 8);
    match text[content_end..close].find('\n') {
        Some(n) => {
            let at = content_end + n + 1;
            output.push_str(&text[..at]);
            output.push_str(indent);
            output.push_str(line);
            output.push('\n');
            output.push_str(&text[at..]);
        }
        None => {
            output.push_str(text[..close].trim_end());
            output.push('\n');
            output.push_str(indent);
            output.push_str(line);
            output.push('\n');
            output.push_str(&text[close..]);
        }
    }
    output
}

/// Replace the declaration line of `field`, keeping its indentation.
pub fn replace_field(text: &str, entity: &str, field: &str, line: &str) -> String {
    if field == PROTECTED_FIELD {
        tracing::debug!(entity, "refusing to rewrite identity field");
        return text.to_string();
    }
    let Some(range) = field_line(text, entity, field) else {
        return text.to_string();
    };

    let current = &text[range.clone()];
    let indent = leading_whitespace(current);
    let shares_brace_line = text[range.end..].starts_with('}');
    let line = line.trim_end().trim_end_matches('}').trim_end();

    let mut output = String::with_capacity(text.len() + line.len());
    output.push_str(&text[..range.start]);
    output.push_str(indent);
    output.push_str(line);
    if let Some(comment) = trailing_comment(text, &range).filter(|_| !line.contains("//")) {
        output.push(' ');
        output.push_str(comment);
    }
    if shares_brace_line {
        output.push('\n');
    }
    output.push_str(&text[range.end..]);
    output
}

/// Replace `field` if the model declares it, otherwise append it.
pub fn upsert_field(text: &str, entity: &str, field: &str, line: &str) -> String {
    if field == PROTECTED_FIELD {
        tracing::debug!(entity, "refusing to rewrite identity field");
        return text.to_string();
    }
    if has_field(text, entity, field) {
        replace_field(text, entity, field, line)
    } else {
        insert_field(text, entity, line)
    }
}

/// Append a new model block at the end of the text.
pub fn append_model(text: &str, name: &str, lines: &[String], attributes: &[String]) -> String {
    let mut output = text.trim_end().to_string();
    if !output.is_empty() {
        output.push_str("\n\n");
    }
    output.push_str(&format!("model {} {{\n", name));
    for line in lines {
        output.push_str(DEFAULT_INDENT);
        output.push_str(line);
        output.push('\n');
    }
    if !attributes.is_empty() {
        output.push('\n');
        for attr in attributes {
            output.push_str(DEFAULT_INDENT);
            output.push_str(attr);
            output.push('\n');
        }
    }
    output.push_str("}\n");
    output
}

/// The comment closing the line at `range`, if any.
fn trailing_comment<'a>(text: &'a str, range: &Range<usize>) -> Option<&'a str> {
    let stripped = strip_comments(text);
    let blanked = stripped.as_bytes();
    let line = &text[range.clone()];
    (0..line.len())
        .find(|&i| {
            (line[i..].starts_with("//") || line[i..].starts_with("/*")) && blanked[range.start + i] == b' '
        })
        .map(|i| line[i..].trim_end())
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}
