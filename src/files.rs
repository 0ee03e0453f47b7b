//! Multi-file schemas joined into one text with `// === name ===` separators.

use crate::scan::{Outline, separator_line, separator_name};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

pub const DEFAULT_FILE_NAME: &str = "schema.prisma";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub name: String,
    pub content: String,
}

impl SchemaFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Join files into one editable text. A single file is returned as is.
pub fn merge(files: &[SchemaFile]) -> String {
    if let [only] = files {
        return only.content.clone();
    }

    let mut output = String::new();
    for file in files {
        output.push_str(&separator_line(&file.name));
        output.push('\n');
        let content = file.content.trim_end_matches(['\n', '\r']);
        if !content.is_empty() {
            output.push_str(content);
            output.push('\n');
        }
    }
    output
}

/// Split merged text back into its files.
///
/// Text ahead of the first separator, or text with no separator at all,
/// belongs to [`DEFAULT_FILE_NAME`].
pub fn split(text: &str) -> Vec<SchemaFile> {
    let mut files: Vec<SchemaFile> = Vec::new();
    let mut name: Option<String> = None;
    let mut content = String::new();

    for line in text.split_inclusive('\n') {
        if let Some(next) = separator_name(line) {
            flush(&mut files, name.take(), &mut content);
            name = Some(next.to_string());
        } else {
            content.push_str(line);
        }
    }
    flush(&mut files, name, &mut content);

    files
}

fn flush(files: &mut Vec<SchemaFile>, name: Option<String>, content: &mut String) {
    let content = std::mem::take(content);
    match name {
        Some(name) => files.push(SchemaFile::new(name, content)),
        None if !content.trim().is_empty() => files.push(SchemaFile::new(DEFAULT_FILE_NAME, content)),
        None => {}
    }
}

/// Fail on the first file whose name is not a plain file name.
///
/// Names come from separator lines in user text, so anything that could leave
/// the output directory (`..`, `/abs`, `dir/name`) is refused.
pub fn check_names(files: &[SchemaFile]) -> Result<(), crate::Error> {
    match files.iter().find(|f| !is_plain_file_name(&f.name)) {
        Some(file) => Err(crate::Error::UnsafeFileName(file.name.clone())),
        None => Ok(()),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => part.to_str() == Some(name),
        _ => false,
    }
}

/// Name of the file declaring `model entity`, if any.
pub fn file_of_entity(text: &str, entity: &str) -> Option<String> {
    let decl = Outline::new(text).model(entity)?.clone();
    let mut current = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if offset > decl.start {
            break;
        }
        if let Some(name) = separator_name(line) {
            current = Some(name.to_string());
        }
        offset += line.len();
    }
    Some(current.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn files() -> Vec<SchemaFile> {
        vec![
            SchemaFile::new("user.prisma", "model User {\n  id Int @id\n}\n\n"),
            SchemaFile::new("post.prisma", "model Post {\n  id Int @id\n}"),
        ]
    }

    #[test]
    fn test_merge() {
        assert_eq!(
            merge(&files()),
            "// === user.prisma ===\nmodel User {\n  id Int @id\n}\n// === post.prisma ===\nmodel Post {\n  id Int @id\n}\n"
        );
    }

    #[test]
    fn test_single_file_merges_unchanged() {
        let only = vec![SchemaFile::new("schema.prisma", "model A {\n}\n")];
        assert_eq!(merge(&only), "model A {\n}\n");
    }

    #[test]
    fn test_split_inverts_merge() {
        let split = split(&merge(&files()));
        let names: Vec<_> = split.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["user.prisma", "post.prisma"]);
        assert_eq!(split[0].content, "model User {\n  id Int @id\n}\n");
        assert_eq!(split[1].content, "model Post {\n  id Int @id\n}\n");
    }

    #[test]
    fn test_split_leading_text() {
        let text = "datasource db {\n}\n// === post.prisma ===\nmodel Post {\n}\n";
        let split = split(text);
        assert_eq!(split[0].name, DEFAULT_FILE_NAME);
        assert_eq!(split[1].name, "post.prisma");
    }

    #[test]
    fn test_split_without_separator() {
        let split = split("model A {\n}\n");
        assert_eq!(split, vec![SchemaFile::new(DEFAULT_FILE_NAME, "model A {\n}\n")]);
        assert!(super::split("").is_empty());
    }

    #[test]
    fn test_check_names() {
        assert!(check_names(&split(&merge(&files()))).is_ok());

        let escaping = split("// === ../../escape.prisma ===\nmodel A {\n}\n");
        assert_eq!(escaping[0].name, "../../escape.prisma");
        assert!(matches!(
            check_names(&escaping),
            Err(crate::Error::UnsafeFileName(name)) if name == "../../escape.prisma"
        ));

        for name in ["/etc/schema.prisma", "nested/b.prisma", "..", ".", "b.prisma/"] {
            assert!(check_names(&[SchemaFile::new(name, "")]).is_err(), "{}", name);
        }
    }

    #[test]
    fn test_merged_text_parses() {
        let doc = parse(&merge(&files()));
        assert_eq!(doc.models.len(), 2);
    }

    #[test]
    fn test_file_of_entity() {
        let merged = merge(&files());
        assert_eq!(file_of_entity(&merged, "Post").as_deref(), Some("post.prisma"));
        assert_eq!(file_of_entity(&merged, "User").as_deref(), Some("user.prisma"));
        assert_eq!(file_of_entity(&merged, "Ghost"), None);
        assert_eq!(file_of_entity("model A {\n}\n", "A").as_deref(), Some(DEFAULT_FILE_NAME));
    }
}
