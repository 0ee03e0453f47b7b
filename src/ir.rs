use crate::Error;
use crate::ast::{Document, Entity, Field};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1-1")]
    OneToOne,
    #[serde(rename = "1-M")]
    OneToMany,
    #[serde(rename = "M-M")]
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "1-1",
            Self::OneToMany => "1-M",
            Self::ManyToMany => "M-M",
        }
    }

    /// Both sides lists: M-M. Exactly one: 1-M. Neither: 1-1.
    pub fn from_lists(a: bool, b: bool) -> Self {
        match (a, b) {
            (true, true) => Self::ManyToMany,
            (true, false) | (false, true) => Self::OneToMany,
            (false, false) => Self::OneToOne,
        }
    }
}

impl FromStr for Cardinality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-1" => Ok(Self::OneToOne),
            "1-M" | "1-m" => Ok(Self::OneToMany),
            "M-M" | "m-m" => Ok(Self::ManyToMany),
            _ => Err(Error::UnknownCardinality(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    /// The entity name.
    pub id: String,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub is_list: bool,
    pub is_optional: bool,
    pub is_id: bool,
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    pub cardinality: Cardinality,
    /// `Entity.field` the edge leaves from.
    pub source_field: String,
    /// `Entity.field` the edge arrives at.
    pub target_field: String,
    pub source_is_list: bool,
    pub target_is_list: bool,
}

impl DiagramEdge {
    /// For 1-M edges, the entity holding the list side.
    pub fn one_side(&self) -> Option<&str> {
        if self.cardinality != Cardinality::OneToMany {
            return None;
        }
        Some(if self.source_is_list { &self.source } else { &self.target })
    }

    /// For 1-M edges, the entity holding the singular reference.
    pub fn many_side(&self) -> Option<&str> {
        if self.cardinality != Cardinality::OneToMany {
            return None;
        }
        Some(if self.source_is_list { &self.target } else { &self.source })
    }
}

pub fn source_handle(entity: &str, field: &str) -> String {
    format!("{}-{}-source", entity, field)
}

pub fn target_handle(entity: &str, field: &str) -> String {
    format!("{}-{}-target", entity, field)
}

impl Diagram {
    pub fn from_document(doc: &Document) -> Self {
        let nodes = doc.models.iter().map(DiagramNode::from_entity).collect();
        let edges = infer_edges(doc);
        Diagram { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl DiagramNode {
    fn from_entity(entity: &Entity) -> Self {
        let fields = entity
            .fields
            .iter()
            .map(|f| FieldView {
                name: f.name.clone(),
                typ: f.typ.clone(),
                is_list: f.is_list,
                is_optional: f.is_optional,
                is_id: f.is_id(),
                is_unique: f.is_unique(),
                relation_name: f.relation_name().map(String::from),
            })
            .collect();

        DiagramNode {
            id: entity.name.clone(),
            fields,
        }
    }
}

fn infer_edges(doc: &Document) -> Vec<DiagramEdge> {
    let mut edges = Vec::new();
    let mut emitted: HashSet<String> = HashSet::new();

    for entity in &doc.models {
        for field in &entity.fields {
            if field.relation.is_none() {
                continue;
            }
            let Some(target) = doc.entity(&field.typ) else {
                continue;
            };

            let inverse = find_inverse(entity, field, target);
            let own_fk = field.has_foreign_key();
            let inverse_fk = inverse.is_some_and(Field::has_foreign_key);
            let inverse_list = inverse.is_some_and(|f| f.is_list);

            let edge = match (own_fk, inverse_fk) {
                (true, false) => Some(explicit_edge(entity, field, target, inverse)),
                (false, true) => inverse.map(|inv| explicit_edge(target, inv, entity, Some(field))),
                (false, false) if field.is_list && inverse_list => {
                    if entity.name > target.name {
                        // Emitted from the other entity.
                        continue;
                    }
                    Some(implicit_many_to_many(entity, target))
                }
                _ => None,
            };

            let Some(edge) = edge else {
                tracing::debug!(
                    entity = %entity.name,
                    field = %field.name,
                    own_fk,
                    inverse_fk,
                    "ambiguous relation pair, no edge"
                );
                continue;
            };

            let reverse = reverse_id(&edge);
            if emitted.contains(&edge.id) || emitted.contains(&reverse) {
                continue;
            }
            tracing::trace!(id = %edge.id, cardinality = edge.cardinality.as_str(), "edge");
            emitted.insert(edge.id.clone());
            edges.push(edge);
        }
    }

    edges
}

/// The field on `target` pointing back at `source`.
///
/// Relation names must agree: both equal, or both absent. When neither side is
/// named, the first field of the right type wins.
fn find_inverse<'a>(source: &Entity, field: &Field, target: &'a Entity) -> Option<&'a Field> {
    target.fields.iter().find(|candidate| {
        if candidate.typ != source.name || candidate.relation.is_none() {
            return false;
        }
        if source.name == target.name && candidate.name == field.name {
            return false;
        }
        match (field.relation_name(), candidate.relation_name()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    })
}

/// Edge from the foreign key holder to the entity it references.
fn explicit_edge(
    holder: &Entity,
    holder_field: &Field,
    other: &Entity,
    other_field: Option<&Field>,
) -> DiagramEdge {
    let relation = holder_field.relation.as_ref();
    let fk_column = relation
        .and_then(|r| r.fields.as_ref())
        .and_then(|f| f.first())
        .map_or(holder_field.name.as_str(), String::as_str);
    let referenced = relation
        .and_then(|r| r.references.as_ref())
        .and_then(|r| r.first())
        .map_or("id", String::as_str);

    let other_list = other_field.is_some_and(|f| f.is_list);

    DiagramEdge {
        id: format!("{}-{}-{}", holder.name, other.name, holder_field.name),
        source: holder.name.clone(),
        target: other.name.clone(),
        source_handle: source_handle(&holder.name, fk_column),
        target_handle: target_handle(&other.name, referenced),
        cardinality: Cardinality::from_lists(holder_field.is_list, other_list),
        source_field: format!("{}.{}", holder.name, fk_column),
        target_field: format!("{}.{}", other.name, referenced),
        source_is_list: holder_field.is_list,
        target_is_list: other_list,
    }
}

fn implicit_many_to_many(a: &Entity, b: &Entity) -> DiagramEdge {
    let (a, b) = if a.name <= b.name { (a, b) } else { (b, a) };
    let a_id = identity_name(a);
    let b_id = identity_name(b);

    DiagramEdge {
        id: format!("{}-{}-{}", a.name, b.name, Cardinality::ManyToMany.as_str()),
        source: a.name.clone(),
        target: b.name.clone(),
        source_handle: source_handle(&a.name, a_id),
        target_handle: target_handle(&b.name, b_id),
        cardinality: Cardinality::ManyToMany,
        source_field: format!("{}.{}", a.name, a_id),
        target_field: format!("{}.{}", b.name, b_id),
        source_is_list: true,
        target_is_list: true,
    }
}

fn identity_name(entity: &Entity) -> &str {
    entity.identity_field().map_or("id", |f| f.name.as_str())
}

/// The id the same relation would get if discovered from the other end.
fn reverse_id(edge: &DiagramEdge) -> String {
    let suffix = edge
        .id
        .strip_prefix(&format!("{}-{}-", edge.source, edge.target))
        .unwrap_or_default();
    format!("{}-{}-{}", edge.target, edge.source, suffix)
}
