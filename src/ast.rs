use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub datasource: Option<Datasource>,
    pub generator: Option<Generator>,
    pub models: Vec<Entity>,
    pub enums: Vec<EnumDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generator {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    /// Block-level attributes (`@@id([a, b])`, `@@map("t")`), kept verbatim.
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub is_list: bool,
    pub is_optional: bool,
    #[serde(default)]
    pub attributes: Vec<String>,
    /// `Some` marks the field as relational, even when `@relation` has no arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub models: usize,
    pub enums: usize,
    pub fields: usize,
    pub relations: usize,
}

impl Document {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    pub fn summary(&self) -> Summary {
        let fields = self.models.iter().map(|m| m.fields.len()).sum();
        let relations = self
            .models
            .iter()
            .flat_map(|m| &m.fields)
            .filter(|f| f.relation.is_some())
            .count();

        Summary {
            models: self.models.len(),
            enums: self.enums.len(),
            fields,
            relations,
        }
    }
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The first field carrying `@id`, falling back to a field literally named `id`.
    pub fn identity_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.is_id())
            .or_else(|| self.field("id"))
    }
}

impl Field {
    pub fn is_id(&self) -> bool {
        self.attributes.iter().any(|a| a.contains("@id"))
    }

    pub fn is_unique(&self) -> bool {
        self.attributes.iter().any(|a| a.contains("@unique"))
    }

    /// A field holds a foreign key when its relation lists referenced columns.
    pub fn has_foreign_key(&self) -> bool {
        self.relation
            .as_ref()
            .and_then(|r| r.references.as_ref())
            .is_some_and(|refs| !refs.is_empty())
    }

    pub fn relation_name(&self) -> Option<&str> {
        self.relation.as_ref().and_then(|r| r.name.as_deref())
    }

    /// Type as written in schema text, with list and optional markers.
    pub fn type_label(&self) -> String {
        let mut label = self.typ.clone();
        if self.is_list {
            label.push_str("[]");
        }
        if self.is_optional {
            label.push('?');
        }
        label
    }
}
