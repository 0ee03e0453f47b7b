//! Schema text mutation for relations drawn on the diagram.
//!
//! [`add_relation`] turns a connection between two entity fields into schema
//! edits: foreign key columns, relation fields, list back-references and, for
//! explicit many-to-many, a junction model. Unrelated text is left byte-for-byte
//! intact, and running the same request twice yields the same text.

mod junction;
mod naming;
mod splice;

pub use naming::{
    foreign_key_name, holds_foreign_key, list_field_name, pluralize, relation_field_name,
};
pub use splice::PROTECTED_FIELD;

use crate::Error;
use crate::ast::{Document, Entity};
use crate::ir::Cardinality;
use crate::parser::parse;
use crate::serializer::render_field;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source_entity: String,
    pub source_field: String,
    pub target_entity: String,
    pub target_field: String,
}

impl Connection {
    /// Build from two `Entity.field` endpoints.
    pub fn from_endpoints(source: &str, target: &str) -> Result<Self, Error> {
        let split = |endpoint: &str| {
            endpoint
                .split_once('.')
                .filter(|(e, f)| !e.is_empty() && !f.is_empty())
                .map(|(e, f)| (e.to_string(), f.to_string()))
                .ok_or_else(|| Error::InvalidConnection(endpoint.to_string()))
        };
        let (source_entity, source_field) = split(source)?;
        let (target_entity, target_field) = split(target)?;
        Ok(Self {
            source_entity,
            source_field,
            target_entity,
            target_field,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationMode {
    #[default]
    Implicit,
    Explicit,
}

impl FromStr for RelationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "implicit" => Ok(Self::Implicit),
            "explicit" => Ok(Self::Explicit),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

/// Which entity's name leads the junction model name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JunctionOrder {
    /// `{Source}On{Target}`
    #[default]
    AonB,
    /// `{Target}On{Source}`
    BonA,
}

impl FromStr for JunctionOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AonB" => Ok(Self::AonB),
            "BonA" => Ok(Self::BonA),
            _ => Err(Error::UnknownOrder(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullableSides {
    pub source: bool,
    pub target: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRequest {
    pub cardinality: Cardinality,
    #[serde(default)]
    pub mode: RelationMode,
    #[serde(default)]
    pub junction_name_order: JunctionOrder,
    #[serde(default)]
    pub nullable_sides: NullableSides,
}

impl RelationRequest {
    pub fn new(cardinality: Cardinality) -> Self {
        Self {
            cardinality,
            mode: RelationMode::default(),
            junction_name_order: JunctionOrder::default(),
            nullable_sides: NullableSides::default(),
        }
    }
}

/// Apply a relation between the two connected fields and return the new text.
///
/// Returns `text` unchanged when either entity is missing.
pub fn add_relation(text: &str, connection: &Connection, request: &RelationRequest) -> String {
    let doc = parse(text);
    for name in [&connection.source_entity, &connection.target_entity] {
        if !doc.has_entity(name) {
            tracing::debug!(entity = %name, "relation references unknown model, no change");
            return text.to_string();
        }
    }

    match (request.cardinality, request.mode) {
        (Cardinality::OneToOne, _) => key_relation(text, &doc, connection, request, false),
        (Cardinality::OneToMany, _) => key_relation(text, &doc, connection, request, true),
        (Cardinality::ManyToMany, RelationMode::Implicit) => implicit_many_to_many(text, connection),
        (Cardinality::ManyToMany, RelationMode::Explicit) => {
            junction::explicit_many_to_many(text, &doc, connection, request.junction_name_order)
        }
    }
}

/// Where the foreign key of a 1:1 or 1:M relation lives.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyPlacement {
    holder: String,
    foreign_key: String,
    referenced: String,
    referenced_field: String,
    holder_is_source: bool,
}

impl KeyPlacement {
    fn resolve(doc: &Document, c: &Connection) -> Self {
        let source = doc.entity(&c.source_entity);
        let target = doc.entity(&c.target_entity);

        if holds_foreign_key(source, &c.source_field) {
            return Self {
                holder: c.source_entity.clone(),
                foreign_key: c.source_field.clone(),
                referenced: c.target_entity.clone(),
                referenced_field: referenced_field(target, &c.target_field),
                holder_is_source: true,
            };
        }

        let referenced_field = referenced_field(source, &c.source_field);
        let foreign_key = if holds_foreign_key(target, &c.target_field) {
            c.target_field.clone()
        } else {
            foreign_key_name(&c.source_entity, &referenced_field)
        };
        Self {
            holder: c.target_entity.clone(),
            foreign_key,
            referenced: c.source_entity.clone(),
            referenced_field,
            holder_is_source: false,
        }
    }
}

/// The requested field if it is a scalar column of the entity, else its identity field.
fn referenced_field(entity: Option<&Entity>, requested: &str) -> String {
    let Some(entity) = entity else {
        return requested.to_string();
    };
    entity
        .field(requested)
        .filter(|f| f.relation.is_none() && !f.is_list)
        .or_else(|| entity.identity_field())
        .map_or_else(|| PROTECTED_FIELD.to_string(), |f| f.name.clone())
}

fn key_relation(
    text: &str,
    doc: &Document,
    connection: &Connection,
    request: &RelationRequest,
    one_to_many: bool,
) -> String {
    let placement = KeyPlacement::resolve(doc, connection);
    let nullable = if placement.holder_is_source {
        request.nullable_sides.source
    } else {
        request.nullable_sides.target
    };
    tracing::debug!(?placement, nullable, one_to_many, "placing foreign key");

    let key_type = doc
        .entity(&placement.referenced)
        .and_then(|e| e.field(&placement.referenced_field))
        .map_or_else(|| "Int".to_string(), |f| f.typ.clone());

    let mut output = ensure_foreign_key(text, doc, &placement, &key_type, nullable, !one_to_many);

    let relation_field = relation_field_name(&placement.foreign_key, &placement.referenced);
    let line = format!(
        "{} {}{} @relation(fields: [{}], references: [{}])",
        relation_field,
        placement.referenced,
        if nullable { "?" } else { "" },
        placement.foreign_key,
        placement.referenced_field
    );
    output = splice::upsert_field(&output, &placement.holder, &relation_field, &line);

    if one_to_many {
        let back_reference = list_field_name(&placement.holder);
        let line = format!("{} {}[]", back_reference, placement.holder);
        output = splice::upsert_field(&output, &placement.referenced, &back_reference, &line);
    }

    output
}

/// Create the scalar key column, or mark an existing one optional when asked to.
fn ensure_foreign_key(
    text: &str,
    doc: &Document,
    placement: &KeyPlacement,
    key_type: &str,
    nullable: bool,
    unique: bool,
) -> String {
    let existing = doc
        .entity(&placement.holder)
        .and_then(|e| e.field(&placement.foreign_key));

    match existing {
        Some(field) if nullable && !field.is_optional => {
            let mut field = field.clone();
            field.is_optional = true;
            splice::replace_field(text, &placement.holder, &field.name, &render_field(&field))
        }
        Some(_) => text.to_string(),
        None => {
            let line = format!(
                "{} {}{}{}",
                placement.foreign_key,
                key_type,
                if nullable { "?" } else { "" },
                if unique { " @unique" } else { "" }
            );
            splice::insert_field(text, &placement.holder, &line)
        }
    }
}

fn implicit_many_to_many(text: &str, c: &Connection) -> String {
    let source_list = list_field_name(&c.target_entity);
    let output = splice::upsert_field(
        text,
        &c.source_entity,
        &source_list,
        &format!("{} {}[]", source_list, c.target_entity),
    );

    let target_list = list_field_name(&c.source_entity);
    splice::upsert_field(
        &output,
        &c.target_entity,
        &target_list,
        &format!("{} {}[]", target_list, c.source_entity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Diagram;

    const BLOG: &str = r#"datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

// Accounts
model User {
  id    Int    @id @default(autoincrement())
  email String @unique
}

model Post {
  id       Int    @id @default(autoincrement())
  title    String
  authorId Int
}
"#;

    fn conn(source: &str, target: &str) -> Connection {
        Connection::from_endpoints(source, target).unwrap()
    }

    #[test]
    fn test_one_to_many_existing_key_on_target() {
        let out = add_relation(
            BLOG,
            &conn("User.id", "Post.authorId"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        assert!(out.contains("  authorId Int\n  author User @relation(fields: [authorId], references: [id])\n}"));
        assert!(out.contains("  email String @unique\n  posts Post[]\n}"));
        assert!(out.starts_with("datasource db {"));
        assert!(out.contains("// Accounts\n"));

        let diagram = Diagram::from_document(&parse(&out));
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].cardinality, Cardinality::OneToMany);
        assert_eq!(diagram.edges[0].one_side(), Some("User"));
        assert_eq!(diagram.edges[0].many_side(), Some("Post"));
    }

    #[test]
    fn test_one_to_many_existing_key_on_source() {
        let from_source = add_relation(
            BLOG,
            &conn("Post.authorId", "User.id"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        let from_target = add_relation(
            BLOG,
            &conn("User.id", "Post.authorId"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        assert_eq!(from_source, from_target);
    }

    #[test]
    fn test_one_to_many_creates_key() {
        let out = add_relation(
            BLOG,
            &conn("User.id", "Post.title"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        let doc = parse(&out);
        let post = doc.entity("Post").unwrap();
        assert_eq!(post.field("userId").map(|f| f.typ.as_str()), Some("Int"));
        let user_field = post.field("user").unwrap();
        assert!(user_field.has_foreign_key());
        assert_eq!(doc.entity("User").unwrap().field("posts").map(|f| f.is_list), Some(true));
    }

    #[test]
    fn test_list_field_endpoint_references_identity() {
        let text = BLOG.replace("  email String @unique\n", "  email String @unique\n  posts Post[]\n");
        let out = add_relation(
            &text,
            &conn("User.posts", "Post.title"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        assert!(out.contains("  userId Int\n  user User @relation(fields: [userId], references: [id])\n}"));
        assert!(!out.contains("userPosts"));
        assert_eq!(out.matches("posts Post[]").count(), 1);
    }

    #[test]
    fn test_one_to_many_idempotent() {
        let request = RelationRequest::new(Cardinality::OneToMany);
        let c = conn("User.id", "Post.title");
        let once = add_relation(BLOG, &c, &request);
        let twice = add_relation(&once, &c, &request);
        assert_eq!(once, twice);
        assert_eq!(twice.matches("userId Int").count(), 1);
    }

    #[test]
    fn test_one_to_many_nullable_existing_key() {
        let mut request = RelationRequest::new(Cardinality::OneToMany);
        request.nullable_sides.target = true;
        let c = conn("User.id", "Post.authorId");
        let once = add_relation(BLOG, &c, &request);
        assert!(once.contains("  authorId Int?\n"));
        assert!(once.contains("author User? @relation(fields: [authorId], references: [id])"));
        assert_eq!(add_relation(&once, &c, &request), once);
    }

    #[test]
    fn test_one_to_many_nullable_new_key() {
        let mut request = RelationRequest::new(Cardinality::OneToMany);
        request.nullable_sides.target = true;
        let out = add_relation(BLOG, &conn("User.id", "Post.title"), &request);
        assert!(out.contains("  userId Int?\n"));
    }

    #[test]
    fn test_nullable_flag_follows_key_holder() {
        let mut request = RelationRequest::new(Cardinality::OneToMany);
        request.nullable_sides.source = true;
        // The key lives on the target, so a nullable source changes nothing.
        let out = add_relation(BLOG, &conn("User.id", "Post.authorId"), &request);
        assert!(out.contains("  authorId Int\n"));
    }

    #[test]
    fn test_one_to_one_single_sided() {
        let text = "model User {\n  id Int @id\n}\n\nmodel Profile {\n  id Int @id\n}\n";
        let out = add_relation(
            text,
            &conn("User.id", "Profile.id"),
            &RelationRequest::new(Cardinality::OneToOne),
        );
        assert_eq!(
            out,
            "model User {\n  id Int @id\n}\n\nmodel Profile {\n  id Int @id\n  userId Int @unique\n  user User @relation(fields: [userId], references: [id])\n}\n"
        );
        let diagram = Diagram::from_document(&parse(&out));
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].cardinality, Cardinality::OneToOne);
    }

    #[test]
    fn test_implicit_many_to_many() {
        let text = "model Post {\n  id Int @id\n}\n\nmodel Category {\n  id Int @id\n}\n";
        let request = RelationRequest::new(Cardinality::ManyToMany);
        let c = conn("Post.id", "Category.id");
        let out = add_relation(text, &c, &request);
        assert!(out.contains("  categories Category[]\n"));
        assert!(out.contains("  posts Post[]\n"));
        assert_eq!(add_relation(&out, &c, &request), out);

        let diagram = Diagram::from_document(&parse(&out));
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].id, "Category-Post-M-M");
    }

    #[test]
    fn test_identity_field_never_touched() {
        let text = "model Id {\n  id Int @id\n}\n\nmodel Post {\n  id Int @id\n  title String\n}\n";
        // The relation field for `idId` would be named `id`, which is protected.
        let out = add_relation(
            text,
            &conn("Id.id", "Post.title"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        assert!(out.contains("model Post {\n  id Int @id\n  title String\n  idId Int\n}"));
        assert!(!out.contains("@relation"));
    }

    #[test]
    fn test_unknown_entity_is_noop() {
        let out = add_relation(
            BLOG,
            &conn("User.id", "Ghost.userId"),
            &RelationRequest::new(Cardinality::OneToMany),
        );
        assert_eq!(out, BLOG);
    }

    #[test]
    fn test_connection_from_endpoints() {
        let c = conn("Post.authorId", "User.id");
        assert_eq!(c.source_entity, "Post");
        assert_eq!(c.target_field, "id");
        assert!(Connection::from_endpoints("Post", "User.id").is_err());
        assert!(Connection::from_endpoints("Post.", "User.id").is_err());
    }

    #[test]
    fn test_request_json_defaults() {
        let request: RelationRequest = serde_json::from_str(r#"{"cardinality": "M-M"}"#).unwrap();
        assert_eq!(request.mode, RelationMode::Implicit);
        assert_eq!(request.junction_name_order, JunctionOrder::AonB);
        assert_eq!(request.nullable_sides, NullableSides::default());

        let request: RelationRequest = serde_json::from_str(
            r#"{"cardinality": "M-M", "mode": "explicit", "junctionNameOrder": "BonA", "nullableSides": {"target": true}}"#,
        )
        .unwrap();
        assert_eq!(request.mode, RelationMode::Explicit);
        assert_eq!(request.junction_name_order, JunctionOrder::BonA);
        assert!(request.nullable_sides.target);
        assert!(!request.nullable_sides.source);
    }
}
