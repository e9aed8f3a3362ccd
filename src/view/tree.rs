//! The drawable tree views render into.
//!
//! [`Drawable`] is the small DOM-like surface the views need: create and
//! attach nodes, set attributes and transforms, and measure. [`VTree`] is an
//! in-memory implementation with approximate text metrics, used headless and
//! in tests.

use std::fmt;
use std::fmt::Write as _;
use std::hash::Hash;

use indexmap::IndexMap;
use slotmap::{SlotMap, new_key_type};

use crate::geometry::{Matrix, PathData, Point, Rect, fmt_num};

use super::defaults;

// ============================================================================
// Transforms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    Translate(f64, f64),
    /// Degrees, clockwise on screen, about `(cx, cy)`.
    Rotate { angle: f64, cx: f64, cy: f64 },
    Scale(f64, f64),
    Matrix(Matrix),
}

impl TransformOp {
    pub fn matrix(&self) -> Matrix {
        match *self {
            TransformOp::Translate(tx, ty) => Matrix::translate(tx, ty),
            TransformOp::Rotate { angle, cx, cy } => Matrix::rotate_about(angle, cx, cy),
            TransformOp::Scale(sx, sy) => Matrix::scale(sx, sy),
            TransformOp::Matrix(m) => m,
        }
    }
}

/// An SVG-style transform list, applied right to left.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transform(Vec<TransformOp>);

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(mut self, tx: f64, ty: f64) -> Self {
        self.0.push(TransformOp::Translate(tx, ty));
        self
    }

    pub fn rotate(mut self, angle: f64, cx: f64, cy: f64) -> Self {
        self.0.push(TransformOp::Rotate { angle, cx, cy });
        self
    }

    pub fn scale(mut self, sx: f64, sy: f64) -> Self {
        self.0.push(TransformOp::Scale(sx, sy));
        self
    }

    pub fn matrix(mut self, m: Matrix) -> Self {
        self.0.push(TransformOp::Matrix(m));
        self
    }

    pub fn then(mut self, op: TransformOp) -> Self {
        self.0.push(op);
        self
    }

    /// The list without its translations.
    pub fn without_translate(&self) -> Transform {
        Transform(
            self.0
                .iter()
                .filter(|op| !matches!(op, TransformOp::Translate(..)))
                .copied()
                .collect(),
        )
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The composed matrix.
    pub fn to_matrix(&self) -> Matrix {
        self.0
            .iter()
            .fold(Matrix::IDENTITY, |acc, op| acc * op.matrix())
    }

    /// Scale part of the list, if any.
    pub fn scale_factors(&self) -> (f64, f64) {
        self.0
            .iter()
            .rev()
            .find_map(|op| match *op {
                TransformOp::Scale(sx, sy) => Some((sx, sy)),
                _ => None,
            })
            .unwrap_or((1.0, 1.0))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match *op {
                TransformOp::Translate(tx, ty) => {
                    write!(f, "translate({},{})", fmt_num(tx), fmt_num(ty))?
                }
                TransformOp::Rotate { angle, cx, cy } if cx == 0.0 && cy == 0.0 => {
                    write!(f, "rotate({})", fmt_num(angle))?
                }
                TransformOp::Rotate { angle, cx, cy } => write!(
                    f,
                    "rotate({},{},{})",
                    fmt_num(angle),
                    fmt_num(cx),
                    fmt_num(cy)
                )?,
                TransformOp::Scale(sx, sy) => write!(f, "scale({},{})", fmt_num(sx), fmt_num(sy))?,
                TransformOp::Matrix(m) => write!(f, "{m}")?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// Drawable
// ============================================================================

/// A retained tree of drawable nodes.
///
/// Operations on removed nodes are ignored; queries on them return `None`.
pub trait Drawable {
    type Node: Copy + Eq + Hash + fmt::Debug;

    fn root(&self) -> Self::Node;

    /// A new, detached node.
    fn create(&mut self, tag: &str) -> Self::Node;
    fn append(&mut self, parent: Self::Node, child: Self::Node);
    /// Detach and drop a node with its subtree.
    fn remove(&mut self, node: Self::Node);
    fn clear_children(&mut self, node: Self::Node);
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn tag(&self, node: Self::Node) -> Option<&str>;

    fn set_attr(&mut self, node: Self::Node, name: &str, value: &str);
    fn remove_attr(&mut self, node: Self::Node, name: &str);
    fn attr(&self, node: Self::Node, name: &str) -> Option<&str>;
    fn set_text(&mut self, node: Self::Node, text: &str);
    fn text(&self, node: Self::Node) -> Option<&str>;

    fn set_transform(&mut self, node: Self::Node, transform: Transform);
    fn transform(&self, node: Self::Node) -> Transform;

    /// Bounding box in the node's own coordinates, before its transform.
    fn local_bbox(&self, node: Self::Node) -> Option<Rect>;

    fn total_length(&self, node: Self::Node) -> Option<f64>;
    fn point_at_length(&self, node: Self::Node, length: f64) -> Option<Point>;

    /// Matrix taking the node's coordinates into `ancestor`'s; all the way up
    /// when `ancestor` is `None` or not actually an ancestor.
    fn transform_to(&self, node: Self::Node, ancestor: Option<Self::Node>) -> Matrix {
        let mut m = self.transform(node).to_matrix();
        let mut current = self.parent(node);
        while let Some(up) = current {
            if Some(up) == ancestor {
                break;
            }
            m = self.transform(up).to_matrix() * m;
            current = self.parent(up);
        }
        m
    }

    /// Bounding box of the transformed node in `relative_to`'s coordinates.
    fn bbox(&self, node: Self::Node, relative_to: Option<Self::Node>) -> Option<Rect> {
        let local = self.local_bbox(node)?;
        Some(transform_rect(&self.transform_to(node, relative_to), &local))
    }

    /// Descendants matching a tag name or a `.class` selector, in document
    /// order.
    fn select(&self, node: Self::Node, selector: &str) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Self::Node> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            if self.matches(next, selector) {
                out.push(next);
            }
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    fn select_first(&self, node: Self::Node, selector: &str) -> Option<Self::Node> {
        self.select(node, selector).into_iter().next()
    }

    fn matches(&self, node: Self::Node, selector: &str) -> bool {
        match selector.strip_prefix('.') {
            Some(class) => self
                .attr(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            None => self.tag(node) == Some(selector),
        }
    }
}

/// Axis-aligned box around `rect` mapped through `m`.
pub fn transform_rect(m: &Matrix, rect: &Rect) -> Rect {
    let corners = [
        m.apply(rect.origin()),
        m.apply(rect.top_right()),
        m.apply(rect.corner()),
        m.apply(rect.bottom_left()),
    ];
    Rect::from_points(&corners).unwrap_or(*rect)
}

// ============================================================================
// VTree
// ============================================================================

new_key_type! {
    /// Handle to a [`VTree`] node. Stays dead once its node is removed, even
    /// after the slot is reused.
    pub struct NodeId;
}

#[derive(Debug, Clone)]
struct VNode {
    tag: String,
    attrs: IndexMap<String, String>,
    text: Option<String>,
    transform: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl VNode {
    fn new(tag: &str) -> Self {
        VNode {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            text: None,
            transform: Transform::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn num(&self, name: &str) -> f64 {
        self.attrs
            .get(name)
            .and_then(|v| v.trim_end_matches("px").parse().ok())
            .unwrap_or(0.0)
    }
}

/// In-memory drawable tree rooted at an `svg` node.
#[derive(Debug, Clone)]
pub struct VTree {
    nodes: SlotMap<NodeId, VNode>,
    root: NodeId,
}

impl Default for VTree {
    fn default() -> Self {
        VTree::new()
    }
}

impl VTree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(VNode::new("svg"));
        VTree { nodes, root }
    }

    fn node(&self, id: NodeId) -> Option<&VNode> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut VNode> {
        self.nodes.get_mut(id)
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes the arena holds room for; removed nodes leave their slot free
    /// for the next [`Drawable::create`].
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Serialize a subtree as SVG-like markup, attributes in insertion order.
    pub fn to_svg(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let Some(node) = self.node(id) else { return };
        let _ = write!(out, "<{}", node.tag);
        if !node.transform.is_empty() {
            let _ = write!(out, " transform=\"{}\"", node.transform);
        }
        for (name, value) in &node.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }
        for child in &node.children {
            self.write_node(out, *child);
        }
        let _ = write!(out, "</{}>", node.tag);
    }

    fn text_bbox(node: &VNode) -> Option<Rect> {
        let text = node.text.as_deref()?;
        let font_size = Some(node.num("font-size"))
            .filter(|size| *size > 0.0)
            .unwrap_or(defaults::FONT_SIZE);
        let width = text.chars().count() as f64 * font_size * defaults::CHAR_WIDTH;
        let x = match node.attrs.get("text-anchor").map(String::as_str) {
            Some("middle") => node.num("x") - width / 2.0,
            Some("end") => node.num("x") - width,
            _ => node.num("x"),
        };
        Some(Rect::new(x, node.num("y") - font_size * 0.8, width, font_size))
    }

    fn path(node: &VNode) -> Option<PathData> {
        match node.tag.as_str() {
            "path" => PathData::parse(node.attrs.get("d")?).ok(),
            "line" => Some(
                PathData::new()
                    .m(node.num("x1"), node.num("y1"))
                    .l(node.num("x2"), node.num("y2")),
            ),
            _ => None,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Drawable for VTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn create(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(VNode::new(tag))
    }

    fn append(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.root() {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(n) = self.nodes.remove(next) {
                stack.extend(n.children);
            }
        }
    }

    fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node) {
            self.remove(child);
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attrs.shift_remove(name);
        }
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attrs.get(name).map(String::as_str)
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.text = Some(text.to_string());
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node)?.text.as_deref()
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(n) = self.node_mut(node) {
            n.transform = transform;
        }
    }

    fn transform(&self, node: NodeId) -> Transform {
        self.node(node)
            .map(|n| n.transform.clone())
            .unwrap_or_default()
    }

    fn local_bbox(&self, node: NodeId) -> Option<Rect> {
        let n = self.node(node)?;
        match n.tag.as_str() {
            "rect" => Some(Rect::new(
                n.num("x"),
                n.num("y"),
                n.num("width"),
                n.num("height"),
            )),
            "circle" => {
                let r = n.num("r");
                Some(Rect::new(n.num("cx") - r, n.num("cy") - r, 2.0 * r, 2.0 * r))
            }
            "ellipse" => {
                let (rx, ry) = (n.num("rx"), n.num("ry"));
                Some(Rect::new(n.num("cx") - rx, n.num("cy") - ry, 2.0 * rx, 2.0 * ry))
            }
            "path" | "line" => VTree::path(n)?.bbox(),
            "text" => VTree::text_bbox(n),
            _ => n
                .children
                .iter()
                .filter_map(|child| self.bbox(*child, Some(node)))
                .reduce(|a, b| a.union(&b)),
        }
    }

    fn total_length(&self, node: NodeId) -> Option<f64> {
        Some(VTree::path(self.node(node)?)?.length())
    }

    fn point_at_length(&self, node: NodeId, length: f64) -> Option<Point> {
        VTree::path(self.node(node)?)?.point_at_length(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;

    #[test]
    fn test_transform_display_and_matrix() {
        let t = Transform::new()
            .translate(10.0, 20.0)
            .rotate(90.0, 0.0, 0.0)
            .scale(2.0, 2.0);
        insta::assert_snapshot!(t.to_string(), @"translate(10,20) rotate(90) scale(2,2)");
        let p = t.to_matrix().apply(pt(1.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-9 && (p.y - 22.0).abs() < 1e-9);
        assert_eq!(t.scale_factors(), (2.0, 2.0));
    }

    #[test]
    fn test_build_and_serialize() {
        let mut tree = VTree::new();
        let g = tree.create("g");
        tree.set_transform(g, Transform::new().translate(5.0, 5.0));
        tree.append(tree.root(), g);
        let rect = tree.create("rect");
        tree.set_attr(rect, "width", "10");
        tree.set_attr(rect, "height", "4");
        tree.append(g, rect);
        let text = tree.create("text");
        tree.set_text(text, "a<b");
        tree.append(g, text);
        insta::assert_snapshot!(
            tree.to_svg(tree.root()),
            @r#"<svg><g transform="translate(5,5)"><rect width="10" height="4"/><text>a&lt;b</text></g></svg>"#
        );
    }

    #[test]
    fn test_bbox_through_transforms() {
        let mut tree = VTree::new();
        let g = tree.create("g");
        tree.set_transform(g, Transform::new().translate(100.0, 50.0));
        tree.append(tree.root(), g);
        let rect = tree.create("rect");
        tree.set_attr(rect, "width", "20");
        tree.set_attr(rect, "height", "10");
        tree.set_transform(rect, Transform::new().scale(2.0, 1.0));
        tree.append(g, rect);

        assert_eq!(tree.bbox(rect, Some(g)), Some(Rect::new(0.0, 0.0, 40.0, 10.0)));
        assert_eq!(tree.bbox(rect, None), Some(Rect::new(100.0, 50.0, 40.0, 10.0)));
        assert_eq!(tree.local_bbox(g), Some(Rect::new(0.0, 0.0, 40.0, 10.0)));
    }

    #[test]
    fn test_select_by_class_and_tag() {
        let mut tree = VTree::new();
        let root = tree.root();
        let g = tree.create("g");
        tree.append(root, g);
        let a = tree.create("path");
        tree.set_attr(a, "class", "connection wide");
        tree.append(g, a);
        let b = tree.create("path");
        tree.append(g, b);
        assert_eq!(tree.select(root, ".connection"), vec![a]);
        assert_eq!(tree.select(root, "path"), vec![a, b]);
        assert_eq!(tree.select_first(root, ".missing"), None);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut tree = VTree::new();
        let g = tree.create("g");
        tree.append(tree.root(), g);
        let child = tree.create("circle");
        tree.append(g, child);
        assert_eq!(tree.node_count(), 3);
        tree.remove(g);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.attr(child, "r"), None);

        // a reused slot does not revive the old handle
        let capacity = tree.capacity();
        let fresh = tree.create("rect");
        tree.set_attr(fresh, "r", "1");
        assert_ne!(fresh, g);
        assert_ne!(fresh, child);
        assert_eq!(tree.attr(g, "r"), None);
        assert_eq!(tree.attr(child, "r"), None);
        assert_eq!(tree.capacity(), capacity);
    }

    #[test]
    fn test_path_measurements() {
        let mut tree = VTree::new();
        let path = tree.create("path");
        tree.set_attr(path, "d", "M 0 0 L 30 40");
        assert_eq!(tree.total_length(path), Some(50.0));
        assert_eq!(tree.point_at_length(path, 25.0), Some(pt(15.0, 20.0)));
        assert_eq!(tree.local_bbox(path), Some(Rect::new(0.0, 0.0, 30.0, 40.0)));
    }
}
