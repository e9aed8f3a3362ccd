//! Link views: route, connection points, path, markers, labels and tools.

use std::fmt;
use std::hash::Hash;

use serde_json::json;

use crate::geometry::{PathData, Point, curve_through_points, fmt_num, pt};
use crate::log::{debug, trace, warn};
use crate::model::{AttrTree, Cell, Endpoint, LabelOffset, LinkData};
use crate::routing::{Anchor, ResolveOptions, resolve, route_between};
use crate::types::CellId;

use super::defaults;
use super::element_view::apply_attrs;
use super::flags::DirtyFlags;
use super::orient::translate_and_auto_orient;
use super::paper::{Connector, PaperOptions, Router};
use super::tree::{Drawable, Transform};

/// What the paper knows about the cell one link end refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndState {
    /// No such cell in the graph.
    Missing,
    /// The cell exists but its view has not been rendered yet.
    Unmounted,
    Mounted(Anchor),
}

struct LinkNodes<N> {
    connection: N,
    connection_wrap: N,
    marker_source: N,
    marker_target: N,
    labels: N,
    vertices: N,
    tools: N,
}

pub struct LinkView<N> {
    id: CellId,
    root: N,
    nodes: Option<LinkNodes<N>>,
    ends: Option<(Anchor, Anchor)>,
    route: Vec<Point>,
    source_point: Option<Point>,
    target_point: Option<Point>,
    marker_points: Option<(Point, Point)>,
    path: PathData,
    label_nodes: Vec<N>,
    tool_nodes: Vec<N>,
}

impl<N: fmt::Debug> fmt::Debug for LinkView<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkView")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("source_point", &self.source_point)
            .field("target_point", &self.target_point)
            .field("route", &self.route)
            .finish()
    }
}

fn label_defaults() -> AttrTree {
    AttrTree::from_value(json!({
        "rect": {"fill": "#ffffff", "rx": 3, "ry": 3},
        "text": {"text-anchor": "middle", "font-size": defaults::FONT_SIZE}
    }))
    .unwrap_or_default()
}

/// Length along a path of `total` where a label at `distance` sits.
///
/// Ratios in `[0, 1]`, absolute lengths above, lengths from the end below
/// zero; always clamped to the path. Non-finite distances mean the middle.
pub fn label_distance(distance: f64, total: f64) -> f64 {
    let along = if !distance.is_finite() {
        total / 2.0
    } else if distance < 0.0 {
        total + distance
    } else if distance <= 1.0 {
        total * distance
    } else {
        distance
    };
    along.clamp(0.0, total.max(0.0))
}

impl<N: Copy + Eq + Hash + fmt::Debug> LinkView<N> {
    pub fn mount<D: Drawable<Node = N>>(tree: &mut D, parent: N, cell: &Cell) -> Self {
        let root = tree.create("g");
        let mut classes: Vec<&str> = cell.cell_type().split('.').collect();
        if cell.cell_type() != "link" {
            classes.push("link");
        }
        tree.set_attr(root, "class", &classes.join(" "));
        tree.set_attr(root, "model-id", cell.id().as_str());
        tree.append(parent, root);
        LinkView {
            id: cell.id().clone(),
            root,
            nodes: None,
            ends: None,
            route: Vec::new(),
            source_point: None,
            target_point: None,
            marker_points: None,
            path: PathData::new(),
            label_nodes: Vec::new(),
            tool_nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn root(&self) -> N {
        self.root
    }

    pub fn is_rendered(&self) -> bool {
        self.nodes.is_some()
    }

    /// Where the link touches its source end.
    pub fn source_point(&self) -> Option<Point> {
        self.source_point
    }

    pub fn target_point(&self) -> Option<Point> {
        self.target_point
    }

    /// Waypoints between the two ends, after routing.
    pub fn route(&self) -> &[Point] {
        &self.route
    }

    /// The drawn connection path.
    pub fn path(&self) -> &PathData {
        &self.path
    }

    pub fn label_node(&self, index: usize) -> Option<N> {
        self.label_nodes.get(index).copied()
    }

    pub fn tool_nodes(&self) -> &[N] {
        &self.tool_nodes
    }

    /// Run the pending sub-renders. Returns the flags it could not handle;
    /// when an end's view is not rendered yet nothing is done at all.
    pub fn confirm_update<D: Drawable<Node = N>>(
        &mut self,
        tree: &mut D,
        cell: &Cell,
        mut flags: DirtyFlags,
        ends: &dyn Fn(&Endpoint) -> EndState,
        options: &PaperOptions,
    ) -> DirtyFlags {
        let Some(link) = cell.as_link() else {
            return DirtyFlags::empty();
        };

        let geometry_flags =
            DirtyFlags::RENDER | DirtyFlags::UPDATE | DirtyFlags::SOURCE | DirtyFlags::TARGET;
        if flags.intersects(geometry_flags) {
            let Some(resolved) = self.resolve_ends(link, ends) else {
                trace!(id = %self.id, ?flags, "link end not rendered yet, waiting");
                return flags;
            };
            self.ends = Some(resolved);
            flags.remove(DirtyFlags::SOURCE | DirtyFlags::TARGET);
        }

        if flags.take(DirtyFlags::RENDER) {
            self.render(tree, cell, options);
            flags.remove(
                DirtyFlags::UPDATE | DirtyFlags::LABELS | DirtyFlags::TOOLS | DirtyFlags::CONNECTOR,
            );
        } else if flags.take(DirtyFlags::UPDATE) {
            self.update(tree, cell, options);
            flags.remove(DirtyFlags::TOOLS | DirtyFlags::CONNECTOR);
        } else if flags.take(DirtyFlags::CONNECTOR) {
            self.update_path(tree, link, options);
            self.position_labels(tree, link);
            self.position_tools(tree, options);
        }
        if flags.take(DirtyFlags::LABELS) {
            self.render_labels(tree, link);
        }
        if flags.take(DirtyFlags::TOOLS) {
            self.position_tools(tree, options);
        }
        flags
    }

    fn resolve_ends(
        &self,
        link: &LinkData,
        ends: &dyn Fn(&Endpoint) -> EndState,
    ) -> Option<(Anchor, Anchor)> {
        let previous = [self.source_point, self.target_point];
        let mut resolved = [Anchor::Point(Point::ORIGIN); 2];
        for (i, end) in [&link.source, &link.target].into_iter().enumerate() {
            let state = match end {
                Endpoint::Point(p) => EndState::Mounted(Anchor::Point(*p)),
                Endpoint::Cell { .. } => ends(end),
            };
            resolved[i] = match state {
                EndState::Mounted(anchor) => anchor,
                EndState::Unmounted => return None,
                EndState::Missing => {
                    warn!(id = %self.id, ?end, "link end refers to a missing cell");
                    Anchor::Point(previous[i].unwrap_or(Point::ORIGIN))
                }
            };
        }
        Some((resolved[0], resolved[1]))
    }

    fn render<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell, options: &PaperOptions) {
        tree.clear_children(self.root);
        let mut child = |tag: &str, class: &str| {
            let node = tree.create(tag);
            tree.set_attr(node, "class", class);
            tree.append(self.root, node);
            node
        };
        let nodes = LinkNodes {
            connection: child("path", "connection"),
            marker_source: child("path", "marker-source"),
            marker_target: child("path", "marker-target"),
            connection_wrap: child("path", "connection-wrap"),
            labels: child("g", "labels"),
            vertices: child("g", "marker-vertices"),
            tools: child("g", "link-tools"),
        };
        if let Some(d) = &options.marker_markup {
            tree.set_attr(nodes.marker_target, "d", d);
        }
        self.nodes = Some(nodes);
        self.label_nodes.clear();
        self.tool_nodes.clear();

        if let Some(link) = cell.as_link() {
            self.render_labels(tree, link);
            self.render_tools(tree, options);
        }
        self.update(tree, cell, options);
    }

    /// Attrs, then the whole geometry pipeline.
    fn update<D: Drawable<Node = N>>(&mut self, tree: &mut D, cell: &Cell, options: &PaperOptions) {
        let Some(link) = cell.as_link() else {
            return;
        };
        for selector in cell.attrs().selectors() {
            let Some(props) = cell.attrs().selector(selector) else {
                continue;
            };
            for node in tree.select(self.root, selector) {
                apply_attrs(tree, node, props);
            }
        }

        let Some((source, target)) = self.ends else {
            return;
        };
        let manhattan = link.manhattan || options.default_router == Router::Manhattan;
        self.route = if manhattan {
            route_between(&link.vertices, &source.bbox(), &target.bbox())
        } else {
            link.vertices.clone()
        };

        let resolve_options = ResolveOptions {
            orthogonal: options.orthogonal_links,
        };
        let first = self.route.first().map_or(target, |p| Anchor::Point(*p));
        let source_point = resolve(&source, &first, resolve_options);
        let last = self
            .route
            .last()
            .map_or(Anchor::Point(source_point), |p| Anchor::Point(*p));
        let target_point = resolve(&target, &last, resolve_options);
        self.source_point = Some(source_point);
        self.target_point = Some(target_point);

        self.update_marker_points(tree);
        self.update_path(tree, link, options);
        self.orient_markers(tree);
        self.render_vertex_markers(tree, link);
        self.position_labels(tree, link);
        self.position_tools(tree, options);
    }

    /// Pull the path ends back by the marker widths so the markers cap it.
    fn update_marker_points<D: Drawable<Node = N>>(&mut self, tree: &mut D) {
        let (Some(nodes), Some(sp), Some(tp)) =
            (&self.nodes, self.source_point, self.target_point)
        else {
            return;
        };
        let marker_width = |node: N| {
            let width = tree.local_bbox(node).map_or(0.0, |b| b.width);
            width * tree.transform(node).scale_factors().0
        };
        let toward_target = self.route.first().copied().unwrap_or(tp);
        let toward_source = self.route.last().copied().unwrap_or(sp);
        let msp = sp.move_along(toward_target, -marker_width(nodes.marker_source));
        let mtp = tp.move_along(toward_source, -marker_width(nodes.marker_target));
        self.marker_points = Some((msp, mtp));
    }

    fn update_path<D: Drawable<Node = N>>(
        &mut self,
        tree: &mut D,
        link: &LinkData,
        options: &PaperOptions,
    ) {
        let (Some(nodes), Some((msp, mtp))) = (&self.nodes, self.marker_points) else {
            return;
        };
        let mut points = Vec::with_capacity(self.route.len() + 2);
        points.push(msp);
        points.extend_from_slice(&self.route);
        points.push(mtp);

        let smooth = link.smooth || options.default_connector == Connector::Smooth;
        self.path = if smooth {
            curve_through_points(&points).unwrap_or_else(|err| {
                debug!(id = %self.id, %err, "smooth connector failed, drawing straight");
                PathData::polyline(&points)
            })
        } else {
            PathData::polyline(&points)
        };
        let d = self.path.to_string();
        tree.set_attr(nodes.connection, "d", &d);
        tree.set_attr(nodes.connection_wrap, "d", &d);
    }

    fn orient_markers<D: Drawable<Node = N>>(&self, tree: &mut D) {
        let (Some(nodes), Some(sp), Some(tp)) =
            (&self.nodes, self.source_point, self.target_point)
        else {
            return;
        };
        let source_ref = self.route.first().copied().unwrap_or(tp);
        let target_ref = self.route.last().copied().unwrap_or(sp);
        if tree.local_bbox(nodes.marker_source).is_some() {
            translate_and_auto_orient(tree, nodes.marker_source, sp, source_ref, Some(self.root));
        }
        if tree.local_bbox(nodes.marker_target).is_some() {
            translate_and_auto_orient(tree, nodes.marker_target, tp, target_ref, Some(self.root));
        }
    }

    fn render_vertex_markers<D: Drawable<Node = N>>(&self, tree: &mut D, link: &LinkData) {
        let Some(nodes) = &self.nodes else {
            return;
        };
        tree.clear_children(nodes.vertices);
        for (idx, vertex) in link.vertices.iter().enumerate() {
            let group = tree.create("g");
            tree.set_attr(group, "class", "marker-vertex-group");
            tree.set_transform(group, Transform::new().translate(vertex.x, vertex.y));
            let circle = tree.create("circle");
            tree.set_attr(circle, "class", "marker-vertex");
            tree.set_attr(circle, "idx", &idx.to_string());
            tree.set_attr(circle, "r", &fmt_num(defaults::VERTEX_RADIUS));
            tree.append(group, circle);
            tree.append(nodes.vertices, group);
        }
    }

    /// Rebuild the label markup; every label is a text on a backing rect.
    fn render_labels<D: Drawable<Node = N>>(&mut self, tree: &mut D, link: &LinkData) {
        let Some(nodes) = &self.nodes else {
            return;
        };
        tree.clear_children(nodes.labels);
        self.label_nodes.clear();
        let base = label_defaults();
        for label in &link.labels {
            let attrs = label.attrs.with_defaults(&base);
            let group = tree.create("g");
            tree.set_attr(group, "class", "label");
            let rect = tree.create("rect");
            let text = tree.create("text");
            tree.append(group, rect);
            tree.append(group, text);
            tree.append(nodes.labels, group);

            if let Some(props) = attrs.selector("text") {
                apply_attrs(tree, text, props);
            }
            if let Some(props) = attrs.selector("rect") {
                apply_attrs(tree, rect, props);
            }
            if let Some(bbox) = tree.local_bbox(text) {
                tree.set_transform(text, Transform::new().translate(0.0, -bbox.height / 2.0));
                tree.set_attr(rect, "x", &fmt_num(bbox.x));
                tree.set_attr(rect, "y", &fmt_num(bbox.y - bbox.height / 2.0));
                tree.set_attr(rect, "width", &fmt_num(bbox.width));
                tree.set_attr(rect, "height", &fmt_num(bbox.height));
            }
            self.label_nodes.push(group);
        }
        self.position_labels(tree, link);
    }

    fn position_labels<D: Drawable<Node = N>>(&self, tree: &mut D, link: &LinkData) {
        let Some(nodes) = &self.nodes else {
            return;
        };
        let Some(total) = tree.total_length(nodes.connection) else {
            return;
        };
        for (label, node) in link.labels.iter().zip(&self.label_nodes) {
            let along = label_distance(label.position.distance, total);
            let Some(anchor) = tree.point_at_length(nodes.connection, along) else {
                continue;
            };
            let at = match label.position.offset {
                LabelOffset::Absolute(offset) => anchor.offset(offset.x, offset.y),
                LabelOffset::Normal(n) => {
                    let t = self.path.tangent_at_length(along).unwrap_or(pt(1.0, 0.0));
                    anchor.offset(-t.y * n, t.x * n)
                }
            };
            tree.set_transform(*node, Transform::new().translate(at.x, at.y));
        }
    }

    fn render_tools<D: Drawable<Node = N>>(&mut self, tree: &mut D, options: &PaperOptions) {
        let Some(nodes) = &self.nodes else {
            return;
        };
        tree.clear_children(nodes.tools);
        self.tool_nodes.clear();
        let count = if options.double_link_tools { 2 } else { 1 };
        for _ in 0..count {
            let tool = tree.create("g");
            tree.set_attr(tool, "class", "link-tool");

            let remove = tree.create("g");
            tree.set_attr(remove, "class", "tool-remove");
            tree.set_attr(remove, "event", "remove");
            let circle = tree.create("circle");
            tree.set_attr(circle, "r", &fmt_num(defaults::TOOL_RADIUS));
            tree.append(remove, circle);
            tree.append(tool, remove);

            let opts = tree.create("g");
            tree.set_attr(opts, "class", "tool-options");
            tree.set_attr(opts, "event", "link:options");
            let circle = tree.create("circle");
            tree.set_attr(circle, "r", &fmt_num(defaults::TOOL_RADIUS));
            tree.set_transform(circle, Transform::new().translate(25.0, 0.0));
            tree.append(opts, circle);
            tree.append(tool, opts);

            tree.append(nodes.tools, tool);
            self.tool_nodes.push(tool);
        }
    }

    /// Tools sit a fixed distance from the source; short links get them at
    /// half size and half the distance.
    fn position_tools<D: Drawable<Node = N>>(&self, tree: &mut D, options: &PaperOptions) {
        let Some(nodes) = &self.nodes else {
            return;
        };
        let Some(total) = tree.total_length(nodes.connection) else {
            return;
        };
        let mut offset = options.link_tools_offset;
        let short = total < options.short_link_length;
        if short {
            offset /= 2.0;
        }
        let placed = |at: Point| {
            let t = Transform::new().translate(at.x, at.y);
            if short {
                t.scale(defaults::SHORT_LINK_TOOLS_SCALE, defaults::SHORT_LINK_TOOLS_SCALE)
            } else {
                t
            }
        };

        if let (Some(first), Some(at)) = (
            self.tool_nodes.first(),
            tree.point_at_length(nodes.connection, offset),
        ) {
            tree.set_transform(*first, placed(at));
        }
        if let Some(second) = self.tool_nodes.get(1) {
            let far = total - options.double_link_tools_offset;
            match tree.point_at_length(nodes.connection, far) {
                Some(at) if total >= options.long_link_length => {
                    tree.set_transform(*second, placed(at));
                    tree.set_attr(*second, "visibility", "visible");
                }
                _ => tree.set_attr(*second, "visibility", "hidden"),
            }
        }
    }

    pub fn unmount<D: Drawable<Node = N>>(self, tree: &mut D) {
        tree.remove(self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{Label, TypeDefaults};
    use crate::routing::RotatedRect;
    use crate::view::tree::{NodeId, VTree};

    fn boxes(end: &Endpoint) -> EndState {
        match end.cell_id().map(|id| id.as_str()) {
            Some("a") => EndState::Mounted(Anchor::from(RotatedRect::new(
                Rect::new(0.0, 0.0, 100.0, 60.0),
                0.0,
            ))),
            Some("b") => EndState::Mounted(Anchor::from(RotatedRect::new(
                Rect::new(300.0, 0.0, 100.0, 60.0),
                0.0,
            ))),
            Some("pending") => EndState::Unmounted,
            _ => EndState::Missing,
        }
    }

    fn link_between(source: Endpoint, target: Endpoint) -> Cell {
        let cell = Cell::link(source, target).with_id("l");
        match TypeDefaults::builtin().get("link") {
            Some(defaults) => {
                let merged = cell.attrs().with_defaults(defaults);
                cell.with_attrs(merged)
            }
            None => cell,
        }
    }

    fn rendered(cell: &Cell, options: &PaperOptions) -> (VTree, LinkView<NodeId>) {
        let mut tree = VTree::new();
        let root = tree.root();
        let mut view = LinkView::mount(&mut tree, root, cell);
        let left = view.confirm_update(&mut tree, cell, DirtyFlags::RENDER, &boxes, options);
        assert!(left.is_empty());
        (tree, view)
    }

    fn connection_d(tree: &VTree, view: &LinkView<NodeId>) -> String {
        let node = tree.select_first(view.root(), ".connection").unwrap();
        tree.attr(node, "d").unwrap().to_string()
    }

    #[test]
    fn test_straight_link_between_boxes() {
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("b"));
        let (tree, view) = rendered(&cell, &PaperOptions::default());
        assert_eq!(view.source_point(), Some(pt(100.0, 30.0)));
        assert_eq!(view.target_point(), Some(pt(300.0, 30.0)));
        insta::assert_snapshot!(connection_d(&tree, &view), @"M 100 30 L 300 30");
        let wrap = tree.select_first(view.root(), ".connection-wrap").unwrap();
        assert_eq!(tree.attr(wrap, "stroke-width"), Some("15"));
    }

    #[test]
    fn test_manhattan_link_is_straight_between_level_boxes() {
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("b")).manhattan(true);
        let (tree, view) = rendered(&cell, &PaperOptions::default());
        assert!(view.route().is_empty());
        assert_eq!(connection_d(&tree, &view), "M 100 30 L 300 30");
    }

    #[test]
    fn test_markers_shorten_the_path() {
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("b"))
            .with_attr(".marker-target/d", json!(defaults::MARKER_MARKUP));
        let (tree, view) = rendered(&cell, &PaperOptions::default());
        assert_eq!(connection_d(&tree, &view), "M 100 30 L 290 30");
        let marker = tree.select_first(view.root(), ".marker-target").unwrap();
        let tip = tree.transform(marker).to_matrix().apply(pt(0.0, 5.0));
        assert!(tip.distance(pt(300.0, 30.0)) < 1e-9);
    }

    #[test]
    fn test_vertices_and_smooth_connector() {
        let cell = link_between(Endpoint::point(0.0, 0.0), Endpoint::point(200.0, 0.0))
            .with_vertices(vec![pt(100.0, 50.0)]);
        let (mut tree, mut view) = rendered(&cell, &PaperOptions::default());
        assert_eq!(connection_d(&tree, &view), "M 0 0 L 100 50 L 200 0");
        let vertex = tree.select_first(view.root(), ".marker-vertex").unwrap();
        assert_eq!(tree.attr(vertex, "idx"), Some("0"));
        assert_eq!(tree.attr(vertex, "r"), Some("10"));

        let cell = cell.smooth(true);
        view.confirm_update(&mut tree, &cell, DirtyFlags::CONNECTOR, &boxes, &PaperOptions::default());
        assert!(connection_d(&tree, &view).contains('C'));
    }

    #[test]
    fn test_labels() {
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("b"))
            .with_label(Label::text("Hi", 0.5))
            .with_label(Label::text("end", -20.0).with_offset(LabelOffset::Normal(10.0)));
        let (tree, view) = rendered(&cell, &PaperOptions::default());
        let first = view.label_node(0).unwrap();
        assert_eq!(tree.transform(first).to_string(), "translate(200,30)");
        let second = view.label_node(1).unwrap();
        assert_eq!(tree.transform(second).to_string(), "translate(280,40)");
        insta::assert_snapshot!(
            tree.to_svg(first),
            @r##"<g transform="translate(200,30)" class="label"><rect fill="#ffffff" rx="3" ry="3" x="-8.4" y="-18.2" width="16.8" height="14"/><text transform="translate(0,-7)" text-anchor="middle" font-size="14">Hi</text></g>"##
        );
    }

    #[test]
    fn test_label_distance() {
        assert_eq!(label_distance(0.25, 200.0), 50.0);
        assert_eq!(label_distance(40.0, 200.0), 40.0);
        assert_eq!(label_distance(-20.0, 200.0), 180.0);
        assert_eq!(label_distance(500.0, 200.0), 200.0);
        assert_eq!(label_distance(f64::NAN, 200.0), 100.0);
    }

    #[test]
    fn test_tools_placement() {
        let options = PaperOptions::default().double_link_tools(true);
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("b"));
        let (tree, view) = rendered(&cell, &options);
        let tools = view.tool_nodes();
        assert_eq!(tools.len(), 2);
        assert_eq!(tree.transform(tools[0]).to_string(), "translate(140,30)");
        assert_eq!(tree.transform(tools[1]).to_string(), "translate(240,30)");
        assert_eq!(tree.attr(tools[1], "visibility"), Some("visible"));

        let short = link_between(Endpoint::point(0.0, 0.0), Endpoint::point(80.0, 0.0));
        let (tree, view) = rendered(&short, &options);
        let tools = view.tool_nodes();
        assert_eq!(
            tree.transform(tools[0]).to_string(),
            "translate(20,0) scale(0.5,0.5)"
        );
        assert_eq!(tree.attr(tools[1], "visibility"), Some("hidden"));
    }

    #[test]
    fn test_unmounted_end_waits() {
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("pending"));
        let mut tree = VTree::new();
        let root = tree.root();
        let mut view = LinkView::mount(&mut tree, root, &cell);
        let flags = DirtyFlags::RENDER | DirtyFlags::TARGET;
        let left = view.confirm_update(&mut tree, &cell, flags, &boxes, &PaperOptions::default());
        assert_eq!(left, flags);
        assert!(!view.is_rendered());
    }

    #[test]
    fn test_missing_end_is_disconnected() {
        let cell = link_between(Endpoint::cell("a"), Endpoint::cell("gone"));
        let (tree, view) = rendered(&cell, &PaperOptions::default());
        assert_eq!(view.target_point(), Some(Point::ORIGIN));
        assert!(tree.select_first(view.root(), ".connection").is_some());
    }
}
