use crate::ast::*;
use crate::scan::{Declaration, Keyword, Outline, strip_comments};
use once_cell::sync::Lazy;
use regex::Regex;

static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\s+(\w+(?:\([^)]*\))?)(\[\])?(\?)?\s*(.*)$").unwrap()
});
static PROVIDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*provider\s*=\s*"([^"]*)""#).unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*url\s*=\s*(.+?)\s*$").unwrap());
static OUTPUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*output\s*=\s*(.+?)\s*$").unwrap());
static RELATION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:name\s*:\s*)?"([^"]*)"|[(,]\s*name\s*:\s*"([^"]*)""#).unwrap()
});
static RELATION_FIELDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfields\s*:\s*\[([^\]]*)\]").unwrap());
static RELATION_REFERENCES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\breferences\s*:\s*\[([^\]]*)\]").unwrap());

pub const DEFAULT_DATASOURCE_PROVIDER: &str = "postgresql";
pub const DEFAULT_GENERATOR_PROVIDER: &str = "prisma-client-js";

/// Built-in scalar types, never treated as entity references.
pub const SCALAR_TYPES: &[&str] = &[
    "String",
    "Boolean",
    "Int",
    "BigInt",
    "Float",
    "Decimal",
    "DateTime",
    "Json",
    "Bytes",
];

/// Parse schema text into a [`Document`], best effort.
///
/// Lines that do not look like fields are skipped and unbalanced blocks are
/// cut short, so a half-typed schema still yields everything recognizable.
pub fn parse(text: &str) -> Document {
    Parser::new(text).parse()
}

pub struct Parser {
    text: String,
    outline: Outline,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let text = strip_comments(input);
        let outline = Outline::new(&text);
        Self { text, outline }
    }

    pub fn parse(&self) -> Document {
        let mut doc = Document::default();

        for decl in self.outline.declarations() {
            let body = decl.body(&self.text);
            match decl.keyword {
                Keyword::Datasource => {
                    if doc.datasource.is_none() {
                        doc.datasource = Some(parse_datasource(body));
                    }
                }
                Keyword::Generator => {
                    if doc.generator.is_none() {
                        doc.generator = Some(parse_generator(body));
                    }
                }
                Keyword::Model => {
                    if doc.has_entity(&decl.name) {
                        tracing::debug!(name = %decl.name, "duplicate model ignored");
                        continue;
                    }
                    doc.models.push(parse_model(decl, body));
                }
                Keyword::Enum => {
                    if doc.enums.iter().any(|e| e.name == decl.name) {
                        continue;
                    }
                    doc.enums.push(EnumDecl {
                        name: decl.name.clone(),
                        values: parse_enum_values(body),
                    });
                }
            }
        }

        doc
    }
}

fn parse_datasource(body: &str) -> Datasource {
    Datasource {
        provider: capture(&PROVIDER_RE, body)
            .unwrap_or(DEFAULT_DATASOURCE_PROVIDER)
            .to_string(),
        url: capture(&URL_RE, body).map(unquote),
    }
}

fn parse_generator(body: &str) -> Generator {
    Generator {
        provider: capture(&PROVIDER_RE, body)
            .unwrap_or(DEFAULT_GENERATOR_PROVIDER)
            .to_string(),
        output: capture(&OUTPUT_RE, body).map(unquote),
    }
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn parse_model(decl: &Declaration, body: &str) -> Entity {
    let mut fields: Vec<Field> = Vec::new();
    let mut attributes = Vec::new();

    for line in body.lines().map(str::trim) {
        if line.is_empty() || line == "}" {
            continue;
        }
        if line.starts_with('@') {
            attributes.extend(extract_attributes(line));
            continue;
        }
        match parse_field(line) {
            Some(field) if fields.iter().any(|f| f.name == field.name) => {
                tracing::debug!(model = %decl.name, field = %field.name, "duplicate field ignored");
            }
            Some(field) => fields.push(field),
            None => tracing::debug!(model = %decl.name, line, "skipping unrecognized line"),
        }
    }

    Entity {
        name: decl.name.clone(),
        fields,
        attributes,
    }
}

/// Match one body line against `name Type[]? @attr(...)...`.
pub fn parse_field(line: &str) -> Option<Field> {
    let caps = FIELD_RE.captures(line)?;
    let name = caps.get(1)?.as_str().to_string();
    let typ = caps.get(2)?.as_str().to_string();
    let is_list = caps.get(3).is_some();
    let is_optional = caps.get(4).is_some();
    let attributes = caps
        .get(5)
        .map(|m| extract_attributes(m.as_str()))
        .unwrap_or_default();

    let relation = match attributes.iter().find(|a| a.starts_with("@relation")) {
        Some(attr) => Some(parse_relation(attr)),
        None if looks_like_reference(&typ, is_list) => Some(RelationSpec::default()),
        None => None,
    };

    Some(Field {
        name,
        typ,
        is_list,
        is_optional,
        attributes,
        relation,
    })
}

/// List types and capitalized non-scalar types are presumed entity references.
fn looks_like_reference(typ: &str, is_list: bool) -> bool {
    if SCALAR_TYPES.contains(&typ) || typ.starts_with("Unsupported") {
        return false;
    }
    is_list || typ.chars().next().is_some_and(char::is_uppercase)
}

/// Split trailing field text into `@name(args)` tokens, kept verbatim.
pub fn extract_attributes(text: &str) -> Vec<String> {
    let mut attributes = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'@' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'@' {
            i += 1;
        }
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.') {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'(' {
            i = skip_parens(bytes, i);
        }
        let attr = text[start..i].trim();
        if attr.len() > 1 {
            attributes.push(attr.to_string());
        }
    }

    attributes
}

/// Index just past the parenthesis group opened at `open`, or end of input.
fn skip_parens(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    bytes.len()
}

fn parse_relation(attr: &str) -> RelationSpec {
    let args = attr
        .strip_prefix("@relation")
        .map(str::trim)
        .and_then(|a| a.strip_prefix('('))
        .map(|a| a.strip_suffix(')').unwrap_or(a))
        .unwrap_or("");

    let name = RELATION_NAME_RE.captures(args).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    });

    RelationSpec {
        name,
        fields: capture(&RELATION_FIELDS_RE, args).map(split_list),
        references: capture(&RELATION_REFERENCES_RE, args).map(split_list),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_enum_values(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != "}" && !l.starts_with('@'))
        .filter_map(|l| l.trim_end_matches(',').split_whitespace().next())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"
        datasource db {
          provider = "mysql"
          url      = env("DATABASE_URL")
        }

        generator client {
          provider = "prisma-client-js"
          output   = "../generated"
        }

        /// A registered user
        model User {
          id    Int     @id @default(autoincrement())
          email String  @unique
          name  String?
          posts Post[]
          role  Role    @default(USER)
        }

        model Post {
          id       Int    @id @default(autoincrement())
          title    String
          authorId Int
          author   User   @relation("Authored", fields: [authorId], references: [id], onDelete: Cascade)

          @@index([authorId])
        }

        enum Role {
          USER,
          ADMIN // full access
        }
    "#;

    #[test]
    fn test_parse_blocks() {
        let doc = parse(BLOG);
        assert_eq!(
            doc.datasource,
            Some(Datasource {
                provider: "mysql".into(),
                url: Some("env(\"DATABASE_URL\")".into()),
            })
        );
        assert_eq!(doc.generator.as_ref().and_then(|g| g.output.as_deref()), Some("../generated"));
        assert_eq!(doc.models.len(), 2);
        assert_eq!(doc.enums[0].values, vec!["USER", "ADMIN"]);
    }

    #[test]
    fn test_parse_fields() {
        let doc = parse(BLOG);
        let user = doc.entity("User").unwrap();
        let names: Vec<_> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "name", "posts", "role"]);

        let id = user.field("id").unwrap();
        assert_eq!(id.attributes, vec!["@id", "@default(autoincrement())"]);
        assert!(id.relation.is_none());

        let name = user.field("name").unwrap();
        assert!(name.is_optional);
        assert!(!name.is_list);

        let posts = user.field("posts").unwrap();
        assert!(posts.is_list);
        assert_eq!(posts.relation, Some(RelationSpec::default()));
    }

    #[test]
    fn test_parse_relation_attribute() {
        let doc = parse(BLOG);
        let post = doc.entity("Post").unwrap();
        let author = post.field("author").unwrap();
        assert_eq!(
            author.relation,
            Some(RelationSpec {
                name: Some("Authored".into()),
                fields: Some(vec!["authorId".into()]),
                references: Some(vec!["id".into()]),
            })
        );
        assert_eq!(post.attributes, vec!["@@index([authorId])"]);
    }

    #[test]
    fn test_named_relation_keyword_form() {
        let field = parse_field(r#"editor User? @relation(name: "Edits", fields: [editorId], references: [id])"#).unwrap();
        assert_eq!(field.relation_name(), Some("Edits"));
        assert!(field.is_optional);
    }

    #[test]
    fn test_capitalized_type_is_implicit_relation() {
        let doc = parse("model A {\n  b B\n  role Role\n  n String\n}");
        let a = doc.entity("A").unwrap();
        assert!(a.field("b").unwrap().relation.is_some());
        assert!(a.field("role").unwrap().relation.is_some());
        assert!(a.field("n").unwrap().relation.is_none());
    }

    #[test]
    fn test_brace_in_string_default() {
        let input = r#"
            model Profile {
              id  Int    @id
              bio String @default("{}")
              raw Json   @default("{\"a\": {\"b\": 1}}")
            }

            model After {
              id Int @id
            }
        "#;
        let doc = parse(input);
        assert_eq!(doc.models.len(), 2);
        let profile = doc.entity("Profile").unwrap();
        assert_eq!(profile.fields.len(), 3);
        assert_eq!(profile.field("bio").unwrap().attributes, vec![r#"@default("{}")"#]);
        assert_eq!(doc.entity("After").unwrap().fields.len(), 1);
    }

    #[test]
    fn test_defaults_for_blocks() {
        let doc = parse("datasource db {\n}\ngenerator client {\n}\n");
        assert_eq!(doc.datasource.unwrap().provider, DEFAULT_DATASOURCE_PROVIDER);
        assert_eq!(doc.generator.unwrap().provider, DEFAULT_GENERATOR_PROVIDER);
    }

    #[test]
    fn test_first_datasource_wins() {
        let input = r#"
            datasource a { provider = "sqlite" }
            datasource b { provider = "mysql" }
        "#;
        // One-line blocks still match: the brace scan does not need line breaks.
        let doc = parse(input);
        assert_eq!(doc.datasource.unwrap().provider, "sqlite");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let input = "model A {\n  id Int @id\n  ???\n  justname\n  ok String\n}";
        let doc = parse(input);
        let names: Vec<_> = doc.models[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "ok"]);
    }

    #[test]
    fn test_unbalanced_input_degrades() {
        let input = "model A {\n  id Int @id\n\nmodel B {\n  id Int @id\n  a A\n}\n";
        let doc = parse(input);
        assert_eq!(doc.models.len(), 2);
        assert_eq!(doc.entity("A").unwrap().fields.len(), 1);
        assert_eq!(doc.entity("B").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_unterminated_model_at_end() {
        let doc = parse("model A {\n  id Int @id\n  name String");
        assert_eq!(doc.entity("A").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_multi_file_separators() {
        let input = "// === user.prisma ===\nmodel User {\n  id Int @id\n}\n// === post.prisma ===\nmodel Post {\n  id Int @id\n}\n";
        let doc = parse(input);
        assert_eq!(doc.models.len(), 2);
    }

    #[test]
    fn test_summary() {
        let summary = parse(BLOG).summary();
        assert_eq!(
            summary,
            Summary {
                models: 2,
                enums: 1,
                fields: 9,
                relations: 3,
            }
        );
    }

    #[test]
    fn test_extract_attributes() {
        let attrs = extract_attributes(r#"@id @default(uuid()) @map("user_id") @db.VarChar(36)"#);
        assert_eq!(attrs, vec!["@id", "@default(uuid())", r#"@map("user_id")"#, "@db.VarChar(36)"]);
    }

    #[test]
    fn test_extract_attributes_paren_in_string() {
        let attrs = extract_attributes(r#"@default(")(") @unique"#);
        assert_eq!(attrs, vec![r#"@default(")(")"#, "@unique"]);
    }
}
