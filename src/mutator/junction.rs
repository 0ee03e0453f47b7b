//! Explicit many-to-many through a synthesized junction model.

use super::naming::{foreign_key_name, list_field_name, singular_field_name};
use super::splice;
use super::{Connection, JunctionOrder};
use crate::ast::{Document, Entity};

pub fn junction_name(connection: &Connection, order: JunctionOrder) -> String {
    match order {
        JunctionOrder::AonB => format!("{}On{}", connection.source_entity, connection.target_entity),
        JunctionOrder::BonA => format!("{}On{}", connection.target_entity, connection.source_entity),
    }
}

struct Side<'a> {
    entity: &'a str,
    foreign_key: String,
    relation_field: String,
    key_type: String,
    identity: String,
}

impl<'a> Side<'a> {
    fn new(doc: &Document, entity: &'a str) -> Self {
        let identity = doc.entity(entity).and_then(Entity::identity_field);
        let identity_name = identity.map_or_else(|| "id".to_string(), |f| f.name.clone());
        Self {
            entity,
            foreign_key: foreign_key_name(entity, &identity_name),
            relation_field: singular_field_name(entity),
            key_type: identity.map_or_else(|| "Int".to_string(), |f| f.typ.clone()),
            identity: identity_name,
        }
    }

    fn lines(&self) -> [String; 2] {
        [
            format!("{} {}", self.foreign_key, self.key_type),
            format!(
                "{} {} @relation(fields: [{}], references: [{}])",
                self.relation_field, self.entity, self.foreign_key, self.identity
            ),
        ]
    }
}

pub fn explicit_many_to_many(
    text: &str,
    doc: &Document,
    connection: &Connection,
    order: JunctionOrder,
) -> String {
    let name = junction_name(connection, order);
    let (first, second) = match order {
        JunctionOrder::AonB => (&connection.source_entity, &connection.target_entity),
        JunctionOrder::BonA => (&connection.target_entity, &connection.source_entity),
    };

    let mut output = if doc.has_entity(&name) {
        tracing::debug!(%name, "junction model already exists");
        text.to_string()
    } else {
        let first = Side::new(doc, first);
        let mut second = Side::new(doc, second);
        if first.foreign_key == second.foreign_key {
            // Self relation: keep both column pairs distinct.
            second.foreign_key = format!("related{}", capitalize(&second.foreign_key));
            second.relation_field = format!("related{}", capitalize(&second.relation_field));
        }

        let lines: Vec<String> = first.lines().into_iter().chain(second.lines()).collect();
        let id = format!("@@id([{}, {}])", first.foreign_key, second.foreign_key);
        splice::append_model(text, &name, &lines, &[id])
    };

    let list = list_field_name(&name);
    let line = format!("{} {}[]", list, name);
    for entity in [&connection.source_entity, &connection.target_entity] {
        output = splice::upsert_field(&output, entity, &list, &line);
    }
    output
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}
