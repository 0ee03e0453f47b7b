//! Screen placement of diagram nodes.
//!
//! Saved positions are joined onto nodes by entity name; nodes without one are
//! laid out left to right. Placement never feeds back into parsing or edges.

use crate::ir::{Diagram, DiagramNode};
use crate::measure::TextMetrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    #[serde(flatten)]
    pub node: DiagramNode,
    pub position: Position,
    pub width: f64,
    pub height: f64,
}

/// Layout configuration.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub metrics: TextMetrics,
    pub origin_x: f64,
    pub origin_y: f64,
    pub gap_x: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            origin_x: 50.0,
            origin_y: 50.0,
            gap_x: 80.0,
        }
    }
}

impl LayoutConfig {
    /// Place every node of `diagram`, preferring `saved` positions.
    pub fn arrange(&self, diagram: &Diagram, saved: &HashMap<String, Position>) -> Vec<PositionedNode> {
        let mut next_x = self.origin_x;

        diagram
            .nodes
            .iter()
            .map(|node| {
                let (width, height) = self.metrics.node_size(node);
                let position = match saved.get(&node.id) {
                    Some(position) => *position,
                    None => {
                        let position = Position {
                            x: next_x,
                            y: self.origin_y,
                        };
                        next_x += width + self.gap_x;
                        position
                    }
                };

                PositionedNode {
                    node: node.clone(),
                    position,
                    width,
                    height,
                }
            })
            .collect()
    }
}

pub fn arrange(diagram: &Diagram, saved: &HashMap<String, Position>) -> Vec<PositionedNode> {
    LayoutConfig::default().arrange(diagram, saved)
}
