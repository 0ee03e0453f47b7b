pub mod ast;
pub mod files;
pub mod history;
pub mod ir;
pub mod layout;
pub mod measure;
pub mod mutator;
pub mod parser;
pub mod scan;
pub mod serializer;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

use files::SchemaFile;
use history::History;
use ir::{Diagram, DiagramEdge};
use layout::{Position, PositionedNode};
use mutator::{Connection, RelationRequest};

pub use parser::parse;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown cardinality: {0} (expected 1-1, 1-M or M-M)")]
    UnknownCardinality(String),
    #[error("Unknown relation mode: {0} (expected implicit or explicit)")]
    UnknownMode(String),
    #[error("Unknown junction order: {0} (expected AonB or BonA)")]
    UnknownOrder(String),
    #[error("Invalid connection endpoint: {0} (expected Entity.field)")]
    InvalidConnection(String),
    #[error("Unsafe schema file name: {0} (expected a plain file name)")]
    UnsafeFileName(String),
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| Error::from(e).to_string())
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| Error::from(e).to_string())
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse schema text into the document model, as JSON.
#[wasm_bindgen(js_name = "parseSchema")]
pub fn parse_schema(source: &str) -> Result<String, String> {
    to_json(&parse(source))
}

/// Parse schema text and convert it to diagram nodes and edges, as JSON.
#[wasm_bindgen(js_name = "schemaToDiagram")]
pub fn schema_to_diagram(source: &str) -> Result<String, String> {
    let diagram = Diagram::from_document(&parse(source));
    to_json(&diagram)
}

/// Place diagram nodes, honoring saved positions keyed by entity name.
#[wasm_bindgen(js_name = "layoutDiagram")]
pub fn layout_diagram(source: &str, saved_positions: Option<String>) -> Result<String, String> {
    let saved: HashMap<String, Position> = match saved_positions.as_deref() {
        Some(json) if !json.trim().is_empty() => from_json(json)?,
        _ => HashMap::new(),
    };
    let diagram = Diagram::from_document(&parse(source));
    let placed = layout::arrange(&diagram, &saved);
    to_json(&placed)
}

/// Apply a relation drawn between two fields and return the new schema text.
#[wasm_bindgen(js_name = "addRelation")]
pub fn add_relation(source: &str, connection: &str, request: &str) -> Result<String, String> {
    let connection: Connection = from_json(connection)?;
    let request: RelationRequest = from_json(request)?;
    Ok(mutator::add_relation(source, &connection, &request))
}

/// Reformat schema text canonically.
#[wasm_bindgen(js_name = "formatSchema")]
pub fn format_schema(source: &str) -> String {
    serializer::serialize(&parse(source))
}

#[wasm_bindgen(js_name = "mergeFiles")]
pub fn merge_files(files: &str) -> Result<String, String> {
    let files: Vec<SchemaFile> = from_json(files)?;
    Ok(files::merge(&files))
}

#[wasm_bindgen(js_name = "splitFiles")]
pub fn split_files(source: &str) -> Result<String, String> {
    to_json(&files::split(source))
}

/// Undo/redo buffer for the canvas, holding positioned nodes and edges.
#[wasm_bindgen]
pub struct DiagramHistory {
    inner: History<PositionedNode, DiagramEdge>,
}

impl Default for DiagramHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl DiagramHistory {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: History::default(),
        }
    }

    pub fn push(&mut self, nodes: &str, edges: &str) -> Result<(), String> {
        let nodes = from_json(nodes)?;
        let edges = from_json(edges)?;
        self.inner.push(nodes, edges);
        Ok(())
    }

    /// The previous snapshot as JSON, or `undefined` at the oldest entry.
    pub fn undo(&mut self) -> Result<Option<String>, String> {
        self.inner.undo().map(to_json).transpose()
    }

    /// The next snapshot as JSON, or `undefined` at the newest entry.
    pub fn redo(&mut self) -> Result<Option<String>, String> {
        self.inner.redo().map(to_json).transpose()
    }

    #[wasm_bindgen(js_name = "canUndo")]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(js_name = "canRedo")]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }
}
