//! Element views: markup, attrs, geometry and ports of one element.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::geometry::{Ellipse, Rect, fmt_num, pt};
use crate::model::Cell;
use crate::routing::{Anchor, RotatedRect};
use crate::types::{CellId, PortId};

use super::defaults;
use super::flags::DirtyFlags;
use super::tree::{Drawable, Transform, TransformOp};

/// Attributes handled by the view instead of being written to nodes.
const SPECIAL_ATTRS: &[&str] = &[
    "port",
    "ref",
    "ref-x",
    "ref-y",
    "ref-dx",
    "ref-dy",
    "ref-width",
    "ref-height",
    "x-alignment",
    "y-alignment",
    "text",
    "filter",
];

/// A JSON attribute value as node attribute text. `null` means "remove".
pub fn attr_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(fmt_num),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn attr_number(props: &Map<String, Value>, name: &str) -> Option<f64> {
    let value = props.get(name)?;
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Write attrs to a node. Layout attrs and `port` are skipped, `text` becomes
/// the node's text content.
pub(crate) fn apply_attrs<D: Drawable>(tree: &mut D, node: D::Node, props: &Map<String, Value>) {
    for (name, value) in props {
        if name == "text" {
            if let Some(text) = attr_text(value) {
                tree.set_text(node, &text);
            }
            continue;
        }
        if SPECIAL_ATTRS.contains(&name.as_str()) {
            continue;
        }
        match attr_text(value) {
            Some(text) => tree.set_attr(node, name, &text),
            None => tree.remove_attr(node, name),
        }
    }
}

/// Tag of the main shape for a cell type.
fn shape_tag(cell_type: &str) -> &'static str {
    match cell_type {
        "basic.Circle" => "circle",
        "basic.Ellipse" => "ellipse",
        _ => "rect",
    }
}

pub struct ElementView<N> {
    id: CellId,
    root: N,
    rotatable: Option<N>,
    shape: Option<N>,
    ports: IndexMap<PortId, N>,
    generated_ports: Vec<N>,
}

impl<N: fmt::Debug> fmt::Debug for ElementView<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementView")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("ports", &self.ports.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<N: Copy + Eq + Hash + fmt::Debug> ElementView<N> {
    /// Create the view's root group under `parent`. Nothing is drawn until the
    /// first `RENDER`.
    pub fn mount<D: Drawable<Node = N>>(tree: &mut D, parent: N, cell: &Cell) -> Self {
        let root = tree.create("g");
        let mut classes: Vec<&str> = cell.cell_type().split('.').collect();
        classes.push("element");
        tree.set_attr(root, "class", &classes.join(" "));
        tree.set_attr(root, "model-id", cell.id().as_str());
        tree.append(parent, root);
        ElementView {
            id: cell.id().clone(),
            root,
            rotatable: None,
            shape: None,
            ports: IndexMap::new(),
            generated_ports: Vec::new(),
        }
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn root(&self) -> N {
        self.root
    }

    /// Whether markup exists, i.e. the view has been rendered once.
    pub fn is_rendered(&self) -> bool {
        self.rotatable.is_some()
    }

    pub fn port_node(&self, port: &PortId) -> Option<N> {
        self.ports.get(port).copied()
    }

    /// Run the pending sub-renders. Returns the flags it could not handle.
    pub fn confirm_update<D: Drawable<Node = N>>(
        &mut self,
        tree: &mut D,
        cell: &Cell,
        mut flags: DirtyFlags,
    ) -> DirtyFlags {
        if flags.take(DirtyFlags::RENDER) {
            self.render(tree, cell);
            flags.remove(
                DirtyFlags::UPDATE
                    | DirtyFlags::TRANSLATE
                    | DirtyFlags::RESIZE
                    | DirtyFlags::ROTATE
                    | DirtyFlags::PORTS
                    | DirtyFlags::TOOLS,
            );
            return flags;
        }
        if flags.take(DirtyFlags::RESIZE) {
            self.resize(tree, cell);
            flags.remove(DirtyFlags::UPDATE);
        }
        if flags.take(DirtyFlags::UPDATE) {
            self.update(tree, cell);
        }
        if flags.take(DirtyFlags::TRANSLATE) {
            self.translate(tree, cell);
        }
        if flags.take(DirtyFlags::ROTATE) {
            self.rotate(tree, cell);
        }
        if flags.take(DirtyFlags::PORTS) {
            self.render_ports(tree, cell);
            self.update(tree, cell);
        }
        // no element tools
        flags.remove(DirtyFlags::TOOLS);
        flags
    }

    fn render<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell) {
        tree.clear_children(self.root);
        let rotatable = tree.create("g");
        tree.set_attr(rotatable, "class", "rotatable");
        tree.append(self.root, rotatable);
        let shape = tree.create(shape_tag(cell.cell_type()));
        tree.append(rotatable, shape);
        let text = tree.create("text");
        tree.append(rotatable, text);

        self.rotatable = Some(rotatable);
        self.shape = Some(shape);
        self.ports.clear();
        self.generated_ports.clear();

        self.render_ports(tree, cell);
        self.resize(tree, cell);
        self.translate(tree, cell);
    }

    /// Fit the main shape to the element size, then re-apply attrs and the
    /// rotation (its origin is the center).
    fn resize<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell) {
        let (Some(shape), Some(geometry)) = (self.shape, cell.as_element()) else {
            return;
        };
        let (w, h) = (geometry.size.width(), geometry.size.height());
        match tree.tag(shape) {
            Some("circle") => {
                tree.set_attr(shape, "cx", &fmt_num(w / 2.0));
                tree.set_attr(shape, "cy", &fmt_num(h / 2.0));
                tree.set_attr(shape, "r", &fmt_num(w.min(h) / 2.0));
            }
            Some("ellipse") => {
                tree.set_attr(shape, "cx", &fmt_num(w / 2.0));
                tree.set_attr(shape, "cy", &fmt_num(h / 2.0));
                tree.set_attr(shape, "rx", &fmt_num(w / 2.0));
                tree.set_attr(shape, "ry", &fmt_num(h / 2.0));
            }
            _ => {
                tree.set_attr(shape, "width", &fmt_num(w));
                tree.set_attr(shape, "height", &fmt_num(h));
            }
        }
        self.rotate(tree, cell);
        self.update(tree, cell);
    }

    fn update<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell) {
        let (Some(rotatable), Some(geometry)) = (self.rotatable, cell.as_element()) else {
            return;
        };
        let frame = Rect::new(0.0, 0.0, geometry.size.width(), geometry.size.height());
        let mut relative: Vec<(N, &Map<String, Value>)> = Vec::new();
        for selector in cell.attrs().selectors() {
            let Some(props) = cell.attrs().selector(selector) else {
                continue;
            };
            let positioned = props.keys().any(|k| {
                k.starts_with("ref") || k == "x-alignment" || k == "y-alignment"
            });
            for node in tree.select(self.root, selector) {
                apply_attrs(tree, node, props);
                if positioned {
                    relative.push((node, props));
                }
            }
        }
        for (node, props) in relative {
            self.position_relative(tree, node, props, frame, rotatable);
        }
    }

    /// Lay a sub-element out against the element box (or the `ref` node's
    /// box) following the `ref-*` and alignment attrs.
    fn position_relative<D: Drawable<Node = N>>(
        &self,
        tree: &mut D,
        node: N,
        props: &Map<String, Value>,
        frame: Rect,
        rotatable: N,
    ) {
        let bbox = props
            .get("ref")
            .and_then(Value::as_str)
            .and_then(|selector| tree.select_first(self.root, selector))
            .and_then(|reference| tree.bbox(reference, Some(rotatable)))
            .unwrap_or(frame);

        // in [0, 1] a fraction of the reference size, otherwise a delta
        if let Some(rw) = attr_number(props, "ref-width") {
            let width = if (0.0..=1.0).contains(&rw) {
                rw * bbox.width
            } else {
                (rw + bbox.width).max(0.0)
            };
            tree.set_attr(node, "width", &fmt_num(width));
        }
        if let Some(rh) = attr_number(props, "ref-height") {
            let height = if (0.0..=1.0).contains(&rh) {
                rh * bbox.height
            } else {
                (rh + bbox.height).max(0.0)
            };
            tree.set_attr(node, "height", &fmt_num(height));
        }

        let mut tx = 0.0;
        let mut ty = 0.0;
        if let Some(dx) = attr_number(props, "ref-dx") {
            tx = bbox.x + bbox.width + dx;
        }
        if let Some(dy) = attr_number(props, "ref-dy") {
            ty = bbox.y + bbox.height + dy;
        }
        if let Some(rx) = attr_number(props, "ref-x") {
            tx = if rx > 0.0 && rx < 1.0 {
                bbox.x + bbox.width * rx
            } else {
                bbox.x + rx
            };
        }
        if let Some(ry) = attr_number(props, "ref-y") {
            ty = if ry > 0.0 && ry < 1.0 {
                bbox.y + bbox.height * ry
            } else {
                bbox.y + ry
            };
        }

        let kept = tree.transform(node).without_translate();
        tree.set_transform(node, kept.clone());
        let own = tree
            .local_bbox(node)
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));

        match props.get("y-alignment") {
            Some(Value::String(s)) if s == "middle" => ty -= own.height / 2.0,
            _ => {
                if let Some(a) = attr_number(props, "y-alignment") {
                    ty += if a > -1.0 && a < 1.0 { own.height * a } else { a };
                }
            }
        }
        match props.get("x-alignment") {
            Some(Value::String(s)) if s == "middle" => tx -= own.width / 2.0,
            _ => {
                if let Some(a) = attr_number(props, "x-alignment") {
                    tx += if a > -1.0 && a < 1.0 { own.width * a } else { a };
                }
            }
        }

        let placed = kept
            .ops()
            .iter()
            .fold(Transform::new().translate(tx, ty), |t, op| t.then(*op));
        tree.set_transform(node, placed);
    }

    fn translate<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell) {
        if let Some(geometry) = cell.as_element() {
            let p = geometry.position;
            tree.set_transform(self.root, Transform::new().translate(p.x, p.y));
        }
    }

    fn rotate<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell) {
        let (Some(rotatable), Some(geometry)) = (self.rotatable, cell.as_element()) else {
            return;
        };
        let transform = if geometry.angle == 0.0 {
            Transform::new()
        } else {
            Transform::new().then(TransformOp::Rotate {
                angle: geometry.angle,
                cx: geometry.size.width() / 2.0,
                cy: geometry.size.height() / 2.0,
            })
        };
        tree.set_transform(rotatable, transform);
    }

    /// Map every declared port to its node. Ports whose `.class` selector
    /// matches nothing get a small circle of their own.
    fn render_ports<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell) {
        let Some(rotatable) = self.rotatable else {
            return;
        };
        for node in self.generated_ports.drain(..) {
            tree.remove(node);
        }
        self.ports.clear();
        for (selector, port) in cell.attrs().ports() {
            let node = match tree.select_first(self.root, &selector) {
                Some(node) => node,
                None => {
                    let Some(class) = selector.strip_prefix('.') else {
                        continue;
                    };
                    let node = tree.create("circle");
                    tree.set_attr(node, "class", class);
                    tree.set_attr(node, "r", &fmt_num(defaults::PORT_RADIUS));
                    tree.append(rotatable, node);
                    self.generated_ports.push(node);
                    node
                }
            };
            tree.set_attr(node, "port", port.as_str());
            self.ports.insert(port, node);
        }
    }

    /// The shape a link end attached to this element connects to: the port or
    /// selected sub-element when given and present, else the element itself.
    pub fn boundary<D: Drawable<Node = N>>(
        &self,
        tree: &D,
        cell: &Cell,
        port: Option<&PortId>,
        selector: Option<&str>,
    ) -> Anchor {
        let magnet = port
            .and_then(|p| self.port_node(p))
            .or_else(|| selector.and_then(|s| tree.select_first(self.root, s)));
        if let Some(bbox) = magnet.and_then(|node| tree.bbox(node, None)) {
            return Anchor::from(bbox);
        }
        let Some(geometry) = cell.as_element() else {
            return Anchor::Point(pt(0.0, 0.0));
        };
        let bbox = geometry.bbox();
        match shape_tag(cell.cell_type()) {
            "circle" | "ellipse" => Anchor::from(Ellipse::from_rect(&bbox)),
            _ => Anchor::from(RotatedRect::new(bbox, geometry.angle)),
        }
    }

    pub fn unmount<D: Drawable<Node = N>>(self, tree: &mut D) {
        tree.remove(self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Boundary;
    use crate::types::Size;
    use crate::view::tree::VTree;
    use serde_json::json;

    fn rect_cell() -> Cell {
        let mut cell = Cell::element("basic.Rect")
            .with_id("a")
            .at(10.0, 20.0)
            .with_size(Size::try_new(100.0, 60.0).unwrap())
            .with_attr("text/text", json!("Hello"));
        if let Some(defaults) = crate::model::TypeDefaults::builtin().get("basic.Rect") {
            let merged = cell.attrs().with_defaults(defaults);
            cell = cell.with_attrs(merged);
        }
        cell
    }

    fn rendered(cell: &Cell) -> (VTree, ElementView<crate::view::tree::NodeId>) {
        let mut tree = VTree::new();
        let root = tree.root();
        let mut view = ElementView::mount(&mut tree, root, cell);
        let left = view.confirm_update(&mut tree, cell, DirtyFlags::RENDER);
        assert!(left.is_empty());
        (tree, view)
    }

    #[test]
    fn test_render_markup() {
        let cell = rect_cell();
        let (tree, view) = rendered(&cell);
        insta::assert_snapshot!(
            tree.to_svg(view.root()),
            @r##"<g transform="translate(10,20)" class="basic Rect element" model-id="a"><g class="rotatable"><rect width="100" height="60" fill="#ffffff" stroke="#000000"/><text transform="translate(50,23)" font-size="14" text-anchor="middle" fill="#000000">Hello</text></g></g>"##
        );
    }

    #[test]
    fn test_translate_and_rotate_stages() {
        let mut cell = rect_cell();
        let (mut tree, mut view) = rendered(&cell);
        if let Some(g) = cell.as_element_mut() {
            g.position = pt(0.0, 0.0);
            g.angle = 90.0;
        }
        let left = view.confirm_update(
            &mut tree,
            &cell,
            DirtyFlags::TRANSLATE | DirtyFlags::ROTATE | DirtyFlags::TOOLS,
        );
        assert!(left.is_empty());
        assert_eq!(tree.transform(view.root()).to_string(), "translate(0,0)");
        let rotatable = tree.select_first(view.root(), ".rotatable").unwrap();
        assert_eq!(tree.transform(rotatable).to_string(), "rotate(90,50,30)");
    }

    #[test]
    fn test_attr_update_and_removal() {
        let mut cell = rect_cell();
        let (mut tree, mut view) = rendered(&cell);
        cell.attrs.set("rect/fill", json!("red"));
        cell.attrs.set("rect/stroke", Value::Null);
        view.confirm_update(&mut tree, &cell, DirtyFlags::UPDATE);
        let rect = tree.select_first(view.root(), "rect").unwrap();
        assert_eq!(tree.attr(rect, "fill"), Some("red"));
        assert_eq!(tree.attr(rect, "stroke"), None);
    }

    #[test]
    fn test_ports_registry() {
        let mut cell = rect_cell()
            .with_attr(".in/port", json!("in"))
            .with_attr(".in/ref-x", json!(0))
            .with_attr(".in/ref-y", json!(0.5));
        let (mut tree, mut view) = rendered(&cell);
        let node = view.port_node(&PortId::new("in")).unwrap();
        assert_eq!(tree.attr(node, "port"), Some("in"));
        assert_eq!(tree.transform(node).to_string(), "translate(0,30)");

        let anchor = view.boundary(&tree, &cell, Some(&PortId::new("in")), None);
        assert_eq!(anchor.bbox(), Rect::new(5.0, 45.0, 10.0, 10.0));

        cell.attrs.unset(".in/port");
        view.confirm_update(&mut tree, &cell, DirtyFlags::PORTS);
        assert!(view.port_node(&PortId::new("in")).is_none());
        assert!(tree.select_first(view.root(), ".in").is_none());
    }

    #[test]
    fn test_boundary_shapes() {
        let cell = rect_cell().with_angle(30.0);
        let (tree, view) = rendered(&cell);
        let anchor = view.boundary(&tree, &cell, None, None);
        assert_eq!(
            anchor,
            Anchor::from(RotatedRect::new(Rect::new(10.0, 20.0, 100.0, 60.0), 30.0))
        );

        let circle = Cell::element("basic.Circle")
            .with_size(Size::try_new(40.0, 40.0).unwrap())
            .at(0.0, 0.0);
        let (tree, view) = rendered(&circle);
        let Anchor::Shape(shape) = view.boundary(&tree, &circle, None, None) else {
            panic!("expected a shape");
        };
        assert_eq!(shape.center(), pt(20.0, 20.0));
        assert_eq!(shape.intersection_from_center(pt(100.0, 20.0)), pt(40.0, 20.0));
    }
}
