//! Cells: elements and links.
//!
//! Relations between cells (parent, embeds, link ends) are ids, never
//! references; the graph resolves them.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use super::attrs::AttrTree;
use crate::geometry::{Point, Rect, pt};
use crate::types::{CellId, PortId, Size};

/// Type name used for links that do not say otherwise.
pub const LINK_TYPE: &str = "link";

// ============================================================================
// Link ends and labels
// ============================================================================

/// One end of a link: a free point or a reference to a cell (optionally a
/// port or sub-element of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Cell {
        id: CellId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<PortId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Point(Point),
}

impl Endpoint {
    pub fn point(x: f64, y: f64) -> Self {
        Endpoint::Point(pt(x, y))
    }

    pub fn cell(id: impl Into<CellId>) -> Self {
        Endpoint::Cell {
            id: id.into(),
            port: None,
            selector: None,
        }
    }

    pub fn port(id: impl Into<CellId>, port: impl Into<PortId>) -> Self {
        Endpoint::Cell {
            id: id.into(),
            port: Some(port.into()),
            selector: None,
        }
    }

    pub fn cell_id(&self) -> Option<&CellId> {
        match self {
            Endpoint::Cell { id, .. } => Some(id),
            Endpoint::Point(_) => None,
        }
    }

    pub fn port_id(&self) -> Option<&PortId> {
        match self {
            Endpoint::Cell { port, .. } => port.as_ref(),
            Endpoint::Point(_) => None,
        }
    }
}

/// Extra displacement of a label from its anchor on the path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelOffset {
    /// Distance perpendicular to the path, positive to the right of travel.
    Normal(f64),
    /// Fixed displacement.
    Absolute(Point),
}

impl Default for LabelOffset {
    fn default() -> Self {
        LabelOffset::Absolute(Point::ORIGIN)
    }
}

/// Where a label sits along its link.
///
/// `distance` in `[0, 1]` is a ratio of the path length, larger values are
/// absolute lengths from the start and negative values count from the end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelPosition {
    pub distance: f64,
    pub offset: LabelOffset,
}

impl Default for LabelPosition {
    fn default() -> Self {
        LabelPosition {
            distance: 0.5,
            offset: LabelOffset::default(),
        }
    }
}

impl<'de> Deserialize<'de> for LabelPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Distance(f64),
            Full {
                distance: f64,
                #[serde(default)]
                offset: LabelOffset,
            },
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Distance(distance) => LabelPosition {
                distance,
                offset: LabelOffset::default(),
            },
            Raw::Full { distance, offset } => LabelPosition { distance, offset },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub position: LabelPosition,
    #[serde(default, skip_serializing_if = "AttrTree::is_empty")]
    pub attrs: AttrTree,
}

impl Label {
    /// A text label at `distance` along the link.
    pub fn text(text: &str, distance: f64) -> Self {
        let mut attrs = AttrTree::new();
        attrs.set("text/text", json!(text));
        Label {
            position: LabelPosition {
                distance,
                offset: LabelOffset::default(),
            },
            attrs,
        }
    }

    pub fn with_offset(mut self, offset: LabelOffset) -> Self {
        self.position.offset = offset;
        self
    }
}

// ============================================================================
// Cells
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementGeometry {
    pub position: Point,
    pub size: Size,
    /// Clockwise rotation in degrees about the element's center.
    pub angle: f64,
}

impl ElementGeometry {
    /// The untransformed bounding box.
    pub fn bbox(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.size.width(),
            self.size.height(),
        )
    }

    /// Axis-aligned box around the rotated element.
    pub fn rotated_bbox(&self) -> Rect {
        self.bbox().rotated_bbox(self.angle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkData {
    pub source: Endpoint,
    pub target: Endpoint,
    pub vertices: Vec<Point>,
    pub smooth: bool,
    pub manhattan: bool,
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Element(ElementGeometry),
    Link(LinkData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub(crate) id: CellId,
    pub(crate) cell_type: String,
    pub(crate) z: Option<i64>,
    pub(crate) parent: Option<CellId>,
    pub(crate) embeds: Vec<CellId>,
    pub(crate) attrs: AttrTree,
    pub(crate) kind: CellKind,
}

impl Cell {
    /// An element of type `cell_type` at the origin with zero size.
    pub fn element(cell_type: impl Into<String>) -> Self {
        Cell {
            id: CellId::generate(),
            cell_type: cell_type.into(),
            z: None,
            parent: None,
            embeds: Vec::new(),
            attrs: AttrTree::new(),
            kind: CellKind::Element(ElementGeometry {
                position: Point::ORIGIN,
                size: Size::ZERO,
                angle: 0.0,
            }),
        }
    }

    /// A straight link between two ends.
    pub fn link(source: Endpoint, target: Endpoint) -> Self {
        Cell {
            id: CellId::generate(),
            cell_type: LINK_TYPE.to_string(),
            z: None,
            parent: None,
            embeds: Vec::new(),
            attrs: AttrTree::new(),
            kind: CellKind::Link(LinkData {
                source,
                target,
                vertices: Vec::new(),
                smooth: false,
                manhattan: false,
                labels: Vec::new(),
            }),
        }
    }

    pub fn with_id(mut self, id: impl Into<CellId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_type(mut self, cell_type: impl Into<String>) -> Self {
        self.cell_type = cell_type.into();
        self
    }

    pub fn with_z(mut self, z: i64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_attrs(mut self, attrs: AttrTree) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_attr(mut self, path: &str, value: Value) -> Self {
        self.attrs.set(path, value);
        self
    }

    /// Element position. No effect on links.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        if let CellKind::Element(geometry) = &mut self.kind {
            geometry.position = pt(x, y);
        }
        self
    }

    /// Element size. No effect on links.
    pub fn with_size(mut self, size: Size) -> Self {
        if let CellKind::Element(geometry) = &mut self.kind {
            geometry.size = size;
        }
        self
    }

    /// Element rotation. No effect on links.
    pub fn with_angle(mut self, angle: f64) -> Self {
        if let CellKind::Element(geometry) = &mut self.kind {
            geometry.angle = angle;
        }
        self
    }

    /// Link vertices. No effect on elements.
    pub fn with_vertices(mut self, vertices: Vec<Point>) -> Self {
        if let CellKind::Link(link) = &mut self.kind {
            link.vertices = vertices;
        }
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        if let CellKind::Link(link) = &mut self.kind {
            link.labels.push(label);
        }
        self
    }

    pub fn smooth(mut self, smooth: bool) -> Self {
        if let CellKind::Link(link) = &mut self.kind {
            link.smooth = smooth;
        }
        self
    }

    pub fn manhattan(mut self, manhattan: bool) -> Self {
        if let CellKind::Link(link) = &mut self.kind {
            link.manhattan = manhattan;
        }
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn cell_type(&self) -> &str {
        &self.cell_type
    }

    /// Stacking order. Cells inside a graph always have one.
    pub fn z(&self) -> i64 {
        self.z.unwrap_or(0)
    }

    pub fn parent(&self) -> Option<&CellId> {
        self.parent.as_ref()
    }

    pub fn embeds(&self) -> &[CellId] {
        &self.embeds
    }

    pub fn attrs(&self) -> &AttrTree {
        &self.attrs
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, CellKind::Link(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, CellKind::Element(_))
    }

    pub fn as_element(&self) -> Option<&ElementGeometry> {
        match &self.kind {
            CellKind::Element(geometry) => Some(geometry),
            CellKind::Link(_) => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkData> {
        match &self.kind {
            CellKind::Link(link) => Some(link),
            CellKind::Element(_) => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementGeometry> {
        match &mut self.kind {
            CellKind::Element(geometry) => Some(geometry),
            CellKind::Link(_) => None,
        }
    }

    pub(crate) fn as_link_mut(&mut self) -> Option<&mut LinkData> {
        match &mut self.kind {
            CellKind::Link(link) => Some(link),
            CellKind::Element(_) => None,
        }
    }

    /// Ports declared in the attrs.
    pub fn ports(&self) -> Vec<PortId> {
        self.attrs.ports().into_iter().map(|(_, port)| port).collect()
    }

    /// Cell ids this cell refers to: link ends, parent and embeds.
    pub(crate) fn references(&self) -> Vec<&CellId> {
        let mut refs: Vec<&CellId> = self.parent.iter().chain(&self.embeds).collect();
        if let Some(link) = self.as_link() {
            refs.extend(link.source.cell_id());
            refs.extend(link.target.cell_id());
        }
        refs
    }
}

// ============================================================================
// Type defaults
// ============================================================================

/// Default attrs per cell type. Attrs equal to these are not serialized.
#[derive(Debug, Clone, Default)]
pub struct TypeDefaults {
    attrs: HashMap<String, AttrTree>,
}

impl TypeDefaults {
    /// No defaults at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Defaults for the built-in `basic.Rect`, `basic.Circle` and `link`
    /// types.
    pub fn builtin() -> Self {
        let mut defaults = TypeDefaults::empty();
        defaults.register(
            "basic.Rect",
            json!({
                "rect": {"fill": "#ffffff", "stroke": "#000000"},
                "text": {
                    "font-size": 14, "text-anchor": "middle", "fill": "#000000",
                    "ref": "rect", "ref-x": 0.5, "ref-y": 0.5, "y-alignment": "middle"
                }
            }),
        );
        defaults.register(
            "basic.Circle",
            json!({
                "circle": {"fill": "#ffffff", "stroke": "#000000"},
                "text": {
                    "font-size": 14, "text-anchor": "middle", "fill": "#000000",
                    "ref": "circle", "ref-x": 0.5, "ref-y": 0.5, "y-alignment": "middle"
                }
            }),
        );
        defaults.register(
            LINK_TYPE,
            json!({
                ".connection": {"stroke": "#000000", "stroke-width": 1, "fill": "none"},
                ".connection-wrap": {"stroke": "transparent", "stroke-width": 15, "fill": "none"}
            }),
        );
        defaults
    }

    /// Register defaults for a type. Non-object values are ignored.
    pub fn register(&mut self, cell_type: impl Into<String>, attrs: Value) {
        if let Some(tree) = AttrTree::from_value(attrs) {
            self.attrs.insert(cell_type.into(), tree);
        }
    }

    pub fn get(&self, cell_type: &str) -> Option<&AttrTree> {
        self.attrs.get(cell_type)
    }
}
