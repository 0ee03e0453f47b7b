//! Serializer for converting a Document back to schema text.

use crate::ast::{Datasource, Document, Entity, EnumDecl, Field, Generator};

/// Serialize a Document to canonical schema text.
///
/// Blocks come out in a fixed order (datasource, generator, models, enums),
/// field columns are aligned, comments are not preserved.
pub fn serialize(doc: &Document) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(ds) = &doc.datasource {
        blocks.push(serialize_datasource(ds));
    }
    if let Some(generator) = &doc.generator {
        blocks.push(serialize_generator(generator));
    }
    for entity in &doc.models {
        blocks.push(serialize_entity(entity));
    }
    for decl in &doc.enums {
        blocks.push(serialize_enum(decl));
    }

    blocks.join("\n")
}

/// One field line without indentation: `name Type[]? @attr ...`.
pub fn render_field(field: &Field) -> String {
    let mut line = format!("{} {}", field.name, field.type_label());
    for attr in &field.attributes {
        line.push(' ');
        line.push_str(attr);
    }
    line
}

fn serialize_datasource(ds: &Datasource) -> String {
    let mut pairs = vec![("provider", quote(&ds.provider))];
    if let Some(url) = &ds.url {
        pairs.push(("url", quote(url)));
    }
    serialize_key_values("datasource db", &pairs)
}

fn serialize_generator(generator: &Generator) -> String {
    let mut pairs = vec![("provider", quote(&generator.provider))];
    if let Some(output) = &generator.output {
        pairs.push(("output", quote(output)));
    }
    serialize_key_values("generator client", &pairs)
}

fn serialize_key_values(header: &str, pairs: &[(&str, String)]) -> String {
    let key_width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut output = format!("{} {{\n", header);
    for (key, value) in pairs {
        output.push_str(&format!("  {:<width$} = {}\n", key, value, width = key_width));
    }
    output.push_str("}\n");
    output
}

/// Function calls such as `env("URL")` are kept raw, plain values get quoted.
fn quote(value: &str) -> String {
    if value.contains('(') {
        value.to_string()
    } else {
        format!("\"{}\"", value)
    }
}

fn serialize_entity(entity: &Entity) -> String {
    let mut output = format!("model {} {{\n", entity.name);

    let name_width = entity.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let type_width = entity
        .fields
        .iter()
        .map(|f| f.type_label().len())
        .max()
        .unwrap_or(0);

    for field in &entity.fields {
        let mut line = format!(
            "  {:<nw$} {:<tw$}",
            field.name,
            field.type_label(),
            nw = name_width,
            tw = type_width
        );
        if !field.attributes.is_empty() {
            line.push(' ');
            line.push_str(&field.attributes.join(" "));
        }
        output.push_str(line.trim_end());
        output.push('\n');
    }

    if !entity.attributes.is_empty() {
        if !entity.fields.is_empty() {
            output.push('\n');
        }
        for attr in &entity.attributes {
            output.push_str("  ");
            output.push_str(attr);
            output.push('\n');
        }
    }

    output.push_str("}\n");
    output
}

fn serialize_enum(decl: &EnumDecl) -> String {
    let mut output = format!("enum {} {{\n", decl.name);
    for value in &decl.values {
        output.push_str("  ");
        output.push_str(value);
        output.push('\n');
    }
    output.push_str("}\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const SCHEMA: &str = r#"
        generator client {
          provider = "prisma-client-js"
        }
        datasource db {
          provider = "sqlite"
          url = "file:./dev.db"
        }
        // people
        model User {
          id Int @id @default(autoincrement())
          email String @unique
          posts Post[]
          role Role @default(USER)
        }
        model Post {
          id Int @id
          authorId Int?
          author User? @relation(fields: [authorId], references: [id])
          tags Tag[]
          @@index([authorId])
        }
        model Tag {
          id Int @id
          posts Post[]
        }
        enum Role {
          USER
          ADMIN
        }
    "#;

    #[test]
    fn test_serialize_layout() {
        let out = serialize(&parse(SCHEMA));
        assert!(out.starts_with("datasource db {\n  provider = \"sqlite\"\n  url      = \"file:./dev.db\"\n}\n"));
        assert!(out.contains("model User {\n  id    Int    @id @default(autoincrement())\n"));
        assert!(out.contains("  tags     Tag[]\n\n  @@index([authorId])\n}\n"));
        assert!(out.ends_with("enum Role {\n  USER\n  ADMIN\n}\n"));
    }

    #[test]
    fn test_round_trip_shape() {
        let first = parse(SCHEMA);
        let second = parse(&serialize(&first));

        let shape = |doc: &Document| {
            doc.models
                .iter()
                .map(|m| {
                    let fields: Vec<_> = m
                        .fields
                        .iter()
                        .map(|f| (f.name.clone(), f.type_label(), f.relation.is_some()))
                        .collect();
                    (m.name.clone(), fields)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
        assert_eq!(first.enums, second.enums);
        assert_eq!(first.datasource, second.datasource);
        assert_eq!(first, second);
    }

    #[test]
    fn test_env_url_kept_raw() {
        let doc = parse("datasource db {\n  provider = \"postgresql\"\n  url = env(\"DATABASE_URL\")\n}");
        assert!(serialize(&doc).contains("url      = env(\"DATABASE_URL\")"));
    }

    #[test]
    fn test_render_field() {
        let doc = parse(SCHEMA);
        let post = doc.entity("Post").unwrap();
        assert_eq!(
            render_field(post.field("author").unwrap()),
            "author User? @relation(fields: [authorId], references: [id])"
        );
        assert_eq!(render_field(post.field("tags").unwrap()), "tags Tag[]");
    }
}
