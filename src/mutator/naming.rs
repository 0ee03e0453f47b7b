//! Field naming for synthesized relations.

use crate::ast::Entity;
use heck::{ToLowerCamelCase, ToUpperCamelCase};

/// Naive English plural: `y` -> `ies`, sibilants take `es`, everything else `s`.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        return format!("{}ies", stem);
    }
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// `Category` -> `category`.
pub fn singular_field_name(entity: &str) -> String {
    entity.to_lower_camel_case()
}

/// `Category` -> `categories`.
pub fn list_field_name(entity: &str) -> String {
    pluralize(&singular_field_name(entity))
}

/// `User` + `id` -> `userId`.
pub fn foreign_key_name(entity: &str, referenced_field: &str) -> String {
    format!(
        "{}{}",
        singular_field_name(entity),
        referenced_field.to_upper_camel_case()
    )
}

/// Relation field for a foreign key column: `authorId` -> `author`.
///
/// Falls back to the referenced entity's name when the column has no id suffix.
pub fn relation_field_name(foreign_key: &str, referenced_entity: &str) -> String {
    let stem = strip_id_suffix(foreign_key).filter(|s| !s.is_empty());
    match stem {
        Some(stem) => stem.to_string(),
        None => singular_field_name(referenced_entity),
    }
}

fn strip_id_suffix(name: &str) -> Option<&str> {
    name.strip_suffix("Id")
        .or_else(|| name.strip_suffix("ID"))
        .or_else(|| name.strip_suffix("_id"))
}

/// Whether `field` on `entity` looks like the foreign key column of a relation.
///
/// This is a naming guess: the field must already exist and carry an id-like
/// suffix. The identity field itself never qualifies.
pub fn holds_foreign_key(entity: Option<&Entity>, field: &str) -> bool {
    if field == "id" || strip_id_suffix(field).is_none_or(str::is_empty) {
        return false;
    }
    entity.is_some_and(|e| e.field(field).is_some())
}
