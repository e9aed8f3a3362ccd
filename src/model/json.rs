//! Cell JSON.
//!
//! A graph serializes to `{"cells": [...]}` with one flat object per cell.
//! Attributes are written as a diff against the type defaults and merged back
//! on load, so a round trip keeps ids, z order and effective attrs.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::attrs::AttrTree;
use super::cell::{Cell, CellKind, ElementGeometry, Endpoint, LINK_TYPE, Label, LinkData, TypeDefaults};
use super::graph::Graph;
use crate::errors::ModelError;
use crate::geometry::Point;
use crate::types::{CellId, Size};

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Serialize, Deserialize)]
struct CellJson {
    id: CellId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    cell_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<CellId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<CellId>,
    #[serde(default, skip_serializing_if = "AttrTree::is_empty")]
    attrs: AttrTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    vertices: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "is_false")]
    smooth: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    manhattan: bool,
}

impl CellJson {
    fn from_cell(cell: &Cell, defaults: &TypeDefaults) -> Self {
        let attrs = match defaults.get(&cell.cell_type) {
            Some(type_defaults) => cell.attrs.diff(type_defaults),
            None => cell.attrs.clone(),
        };
        let mut json = CellJson {
            id: cell.id.clone(),
            cell_type: Some(cell.cell_type.clone()),
            position: None,
            size: None,
            angle: None,
            z: cell.z,
            parent: cell.parent.clone(),
            embeds: cell.embeds.clone(),
            attrs,
            source: None,
            target: None,
            vertices: Vec::new(),
            labels: Vec::new(),
            smooth: false,
            manhattan: false,
        };
        match &cell.kind {
            CellKind::Element(geometry) => {
                json.position = Some(geometry.position);
                json.size = Some(geometry.size);
                json.angle = Some(geometry.angle);
            }
            CellKind::Link(link) => {
                json.source = Some(link.source.clone());
                json.target = Some(link.target.clone());
                json.vertices = link.vertices.clone();
                json.labels = link.labels.clone();
                json.smooth = link.smooth;
                json.manhattan = link.manhattan;
            }
        }
        json
    }

    /// A cell is a link when it has either end.
    fn into_cell(self) -> Result<Cell, ModelError> {
        let kind = match (self.source, self.target) {
            (None, None) => CellKind::Element(ElementGeometry {
                position: self.position.unwrap_or(Point::ORIGIN),
                size: self.size.unwrap_or(Size::ZERO),
                angle: self.angle.unwrap_or(0.0),
            }),
            (Some(source), Some(target)) => CellKind::Link(LinkData {
                source,
                target,
                vertices: self.vertices,
                smooth: self.smooth,
                manhattan: self.manhattan,
                labels: self.labels,
            }),
            _ => {
                return Err(ModelError::InvalidJson(serde_json::Error::custom(format!(
                    "link `{}` needs both a source and a target",
                    self.id
                ))));
            }
        };
        let cell_type = self.cell_type.unwrap_or_else(|| match kind {
            CellKind::Link(_) => LINK_TYPE.to_string(),
            CellKind::Element(_) => String::new(),
        });
        Ok(Cell {
            id: self.id,
            cell_type,
            z: self.z,
            parent: self.parent,
            embeds: self.embeds,
            attrs: self.attrs,
            kind,
        })
    }
}

impl Cell {
    /// This cell as JSON, attrs diffed against `defaults`.
    pub fn to_json(&self, defaults: &TypeDefaults) -> Value {
        serde_json::to_value(CellJson::from_cell(self, defaults)).unwrap_or_default()
    }

    /// A cell from its JSON. Type defaults are merged in when it is added to
    /// a graph.
    pub fn from_json(value: &Value) -> Result<Cell, ModelError> {
        let json: CellJson = serde_json::from_value(value.clone())?;
        json.into_cell()
    }
}

impl Graph {
    pub fn to_json(&self) -> Value {
        let cells: Vec<Value> = self
            .cells
            .values()
            .map(|cell| cell.to_json(self.defaults()))
            .collect();
        json!({ "cells": cells })
    }

    /// A new graph (built-in type defaults) holding the document's cells.
    pub fn from_json(value: &Value) -> Result<Graph, ModelError> {
        let mut graph = Graph::new();
        graph.load_json(value)?;
        Ok(graph)
    }

    /// Replace every cell with the document's, publishing a single reset.
    /// Nothing changes when the document is invalid.
    pub fn load_json(&mut self, value: &Value) -> Result<(), ModelError> {
        let cells = value
            .get("cells")
            .and_then(Value::as_array)
            .ok_or(ModelError::MissingCells)?;
        let cells = cells
            .iter()
            .map(Cell::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        self.reset_cells(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;
    use crate::model::events::GraphEvent;
    use proptest::prelude::*;

    fn doc() -> Value {
        json!({
            "cells": [
                {
                    "id": "a", "type": "basic.Rect",
                    "position": {"x": 10, "y": 20}, "size": {"width": 100, "height": 60},
                    "angle": 0, "z": 1,
                    "attrs": {"rect": {"fill": "red"}, "text": {"text": "A"}}
                },
                {
                    "id": "b", "type": "basic.Circle",
                    "position": {"x": 300, "y": 20}, "size": {"width": 60, "height": 60},
                    "z": 2
                },
                {
                    "id": "ab", "type": "link", "z": 3,
                    "source": {"id": "a"}, "target": {"id": "b"},
                    "vertices": [{"x": 200, "y": 50}],
                    "labels": [{"position": 0.5, "attrs": {"text": {"text": "x"}}}],
                    "manhattan": true
                }
            ]
        })
    }

    #[test]
    fn test_load_applies_defaults() {
        let graph = Graph::from_json(&doc()).unwrap();
        assert_eq!(graph.len(), 3);
        let a = CellId::new("a");
        assert_eq!(graph.attr(&a, "rect/fill"), Some(&json!("red")));
        assert_eq!(graph.attr(&a, "rect/stroke"), Some(&json!("#000000")));
        let link = graph.link(&CellId::new("ab")).unwrap();
        assert!(link.manhattan);
        assert_eq!(link.vertices, vec![pt(200.0, 50.0)]);
        assert_eq!(link.labels[0].position.distance, 0.5);
    }

    #[test]
    fn test_round_trip_writes_only_overrides() {
        let graph = Graph::from_json(&doc()).unwrap();
        let out = graph.to_json();
        assert_eq!(
            out["cells"][0]["attrs"],
            json!({"rect": {"fill": "red"}, "text": {"text": "A"}})
        );
        assert!(out["cells"][1].get("attrs").is_none());
        assert_eq!(out["cells"][2]["source"], json!({"id": "a"}));

        let again = Graph::from_json(&out).unwrap();
        assert_eq!(again.to_json(), out);
    }

    #[test]
    fn test_rejects_documents_without_cells() {
        assert!(matches!(
            Graph::from_json(&json!({"nodes": []})),
            Err(ModelError::MissingCells)
        ));
    }

    #[test]
    fn test_rejects_half_links_and_bad_sizes() {
        let half = json!({"cells": [{"id": "l", "source": {"x": 0, "y": 0}}]});
        assert!(matches!(
            Graph::from_json(&half),
            Err(ModelError::InvalidJson(_))
        ));
        let negative = json!({"cells": [{"id": "e", "size": {"width": -5, "height": 1}}]});
        assert!(matches!(
            Graph::from_json(&negative),
            Err(ModelError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_failed_load_keeps_cells() {
        let mut graph = Graph::from_json(&doc()).unwrap();
        let events = graph.subscribe();
        let dangling = json!({"cells": [{"id": "l", "source": {"id": "ghost"}, "target": {"x": 1, "y": 1}}]});
        assert!(matches!(
            graph.load_json(&dangling),
            Err(ModelError::UnknownCell(_))
        ));
        assert_eq!(graph.len(), 3);
        assert!(events.is_empty());

        graph.load_json(&json!({"cells": []})).unwrap();
        assert!(graph.is_empty());
        assert_eq!(events.drain(), vec![GraphEvent::Reset]);
    }

    #[test]
    fn test_embedding_survives_round_trip() {
        let mut graph = Graph::from_json(&doc()).unwrap();
        graph.embed(&CellId::new("a"), &CellId::new("b")).unwrap();
        let again = Graph::from_json(&graph.to_json()).unwrap();
        let a = again.cell(&CellId::new("a")).unwrap();
        assert_eq!(a.embeds(), [CellId::new("b")]);
        assert_eq!(
            again.cell(&CellId::new("b")).unwrap().parent(),
            Some(&CellId::new("a"))
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip_keeps_ids_order_and_attrs(
            boxes in prop::collection::vec(
                (-500i32..500, -500i32..500, 0i32..200, 0i32..200, -10i64..10),
                1..8,
            ),
            fill in "[a-z]{1,8}",
        ) {
            let mut graph = Graph::new();
            let mut ids = Vec::new();
            for (i, (x, y, w, h, z)) in boxes.iter().enumerate() {
                let cell = Cell::element("basic.Rect")
                    .with_id(format!("e{i}"))
                    .at(f64::from(*x), f64::from(*y))
                    .with_size(Size::try_new(f64::from(*w), f64::from(*h)).unwrap())
                    .with_z(*z)
                    .with_attr("rect/fill", json!(fill));
                ids.push(graph.add_cell(cell).unwrap());
            }
            for pair in ids.windows(2) {
                graph
                    .add_cell(Cell::link(Endpoint::cell(pair[0].clone()), Endpoint::cell(pair[1].clone())))
                    .unwrap();
            }

            let again = Graph::from_json(&graph.to_json()).unwrap();
            let before: Vec<&CellId> = graph.cells().map(Cell::id).collect();
            let after: Vec<&CellId> = again.cells().map(Cell::id).collect();
            prop_assert_eq!(before, after);
            for cell in graph.cells() {
                let twin = again.cell(cell.id()).unwrap();
                prop_assert_eq!(cell, twin);
            }
        }
    }
}
