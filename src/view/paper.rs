//! The paper: one view per cell, kept in sync with a graph.
//!
//! Model events are turned into dirty flags on the affected views. An update
//! runs passes over the dirty views, elements before links, each view
//! handling what it can and handing back the rest. Flags a view could not
//! handle (a link waiting for its end to render) stay queued for the next
//! update.

use std::fmt;

use indexmap::IndexMap;

use crate::errors::ViewError;
use crate::log::{debug, trace};
use crate::model::{Cell, Endpoint, Graph, GraphEvent, LinkQuery, Subscription};
use crate::routing::Anchor;
use crate::types::CellId;

use super::defaults;
use super::element_view::ElementView;
use super::flags::{DirtyFlags, connected_link_flags, element_flags, link_flags};
use super::link_view::{EndState, LinkView};
use super::scheduler::FrameScheduler;
use super::tree::{Drawable, VTree};

// ============================================================================
// Options
// ============================================================================

/// How link waypoints are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Router {
    /// Vertices as given.
    #[default]
    Normal,
    /// Orthogonal segments through the vertices.
    Manhattan,
}

/// How the path through the waypoints is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    Normal,
    Smooth,
}

/// Paper configuration. Per-link `manhattan` and `smooth` flags override the
/// default router and connector.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOptions {
    /// Snap connection points perpendicular to the facing side when the
    /// reference is level with the end.
    pub orthogonal_links: bool,
    pub default_router: Router,
    pub default_connector: Connector,
    pub link_tools_offset: f64,
    pub double_link_tools: bool,
    pub double_link_tools_offset: f64,
    pub short_link_length: f64,
    pub long_link_length: f64,
    /// Path data given to target markers that have none of their own.
    pub marker_markup: Option<String>,
    /// Defer updates to the next frame instead of running them on notify.
    pub async_updates: bool,
}

impl Default for PaperOptions {
    fn default() -> Self {
        PaperOptions {
            orthogonal_links: false,
            default_router: Router::Normal,
            default_connector: Connector::Normal,
            link_tools_offset: defaults::LINK_TOOLS_OFFSET,
            double_link_tools: false,
            double_link_tools_offset: defaults::DOUBLE_LINK_TOOLS_OFFSET,
            short_link_length: defaults::SHORT_LINK_LENGTH,
            long_link_length: defaults::LONG_LINK_LENGTH,
            marker_markup: None,
            async_updates: false,
        }
    }
}

impl PaperOptions {
    pub fn orthogonal_links(mut self, on: bool) -> Self {
        self.orthogonal_links = on;
        self
    }

    pub fn default_router(mut self, router: Router) -> Self {
        self.default_router = router;
        self
    }

    pub fn default_connector(mut self, connector: Connector) -> Self {
        self.default_connector = connector;
        self
    }

    pub fn link_tools_offset(mut self, offset: f64) -> Self {
        self.link_tools_offset = offset;
        self
    }

    pub fn double_link_tools(mut self, on: bool) -> Self {
        self.double_link_tools = on;
        self
    }

    pub fn double_link_tools_offset(mut self, offset: f64) -> Self {
        self.double_link_tools_offset = offset;
        self
    }

    pub fn short_link_length(mut self, length: f64) -> Self {
        self.short_link_length = length;
        self
    }

    pub fn long_link_length(mut self, length: f64) -> Self {
        self.long_link_length = length;
        self
    }

    pub fn marker_markup(mut self, d: impl Into<String>) -> Self {
        self.marker_markup = Some(d.into());
        self
    }

    pub fn async_updates(mut self, on: bool) -> Self {
        self.async_updates = on;
        self
    }
}

// ============================================================================
// Views
// ============================================================================

enum CellView<N> {
    Element(ElementView<N>),
    Link(LinkView<N>),
}

impl<N: Copy + Eq + std::hash::Hash + fmt::Debug> CellView<N> {
    fn root(&self) -> N {
        match self {
            CellView::Element(view) => view.root(),
            CellView::Link(view) => view.root(),
        }
    }

    fn is_link(&self) -> bool {
        matches!(self, CellView::Link(_))
    }
}

struct ViewSlot<N> {
    view: CellView<N>,
    flags: DirtyFlags,
}

/// What one [`Paper::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateStats {
    pub passes: usize,
    /// `confirm_update` calls that handled at least one flag.
    pub updated: usize,
    /// Views still dirty afterwards.
    pub pending: usize,
}

/// Outcome of handing one view its flags.
struct ViewPass {
    taken: DirtyFlags,
    left: DirtyFlags,
    /// The link's path changed.
    moved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Frame {
    Update,
}

pub struct Paper<D: Drawable = VTree> {
    tree: D,
    layer: D::Node,
    options: PaperOptions,
    subscription: Subscription,
    views: IndexMap<CellId, ViewSlot<D::Node>>,
    frames: FrameScheduler<Frame>,
}

impl<D: Drawable> fmt::Debug for Paper<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paper")
            .field("options", &self.options)
            .field("views", &self.views.len())
            .finish()
    }
}

impl<D: Drawable> Paper<D> {
    /// Attach to `graph`, drawing into `tree`. One view is created per cell,
    /// all of them dirty; nothing is drawn before the first update.
    pub fn new(graph: &Graph, mut tree: D, options: PaperOptions) -> Self {
        let layer = tree.create("g");
        tree.set_attr(layer, "class", "viewport");
        let root = tree.root();
        tree.append(root, layer);
        let mut paper = Paper {
            tree,
            layer,
            options,
            subscription: graph.subscribe(),
            views: IndexMap::new(),
            frames: FrameScheduler::new(),
        };
        paper.reset_views(graph);
        paper
    }

    pub fn options(&self) -> &PaperOptions {
        &self.options
    }

    pub fn tree(&self) -> &D {
        &self.tree
    }

    /// The group all cell views are drawn in.
    pub fn layer(&self) -> D::Node {
        self.layer
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn has_view(&self, id: &CellId) -> bool {
        self.views.contains_key(id)
    }

    /// Root node of a cell's view.
    pub fn view_root(&self, id: &CellId) -> Result<D::Node, ViewError> {
        Ok(self.slot(id)?.view.root())
    }

    pub fn element_view(&self, id: &CellId) -> Result<&ElementView<D::Node>, ViewError> {
        match &self.slot(id)?.view {
            CellView::Element(view) => Ok(view),
            CellView::Link(_) => Err(ViewError::UnknownView(id.clone())),
        }
    }

    pub fn link_view(&self, id: &CellId) -> Result<&LinkView<D::Node>, ViewError> {
        match &self.slot(id)?.view {
            CellView::Link(view) => Ok(view),
            CellView::Element(_) => Err(ViewError::UnknownView(id.clone())),
        }
    }

    /// Flags waiting on a view.
    pub fn dirty_flags(&self, id: &CellId) -> Result<DirtyFlags, ViewError> {
        Ok(self.slot(id)?.flags)
    }

    /// Whether any view has work queued.
    pub fn is_dirty(&self) -> bool {
        self.views.values().any(|slot| !slot.flags.is_empty())
    }

    /// Queue sub-renders on a view. Requesting flags already queued changes
    /// nothing.
    pub fn request_update(&mut self, id: &CellId, flags: DirtyFlags) -> Result<(), ViewError> {
        self.views
            .get_mut(id)
            .ok_or_else(|| ViewError::UnknownView(id.clone()))?
            .flags |= flags;
        Ok(())
    }

    fn slot(&self, id: &CellId) -> Result<&ViewSlot<D::Node>, ViewError> {
        self.views
            .get(id)
            .ok_or_else(|| ViewError::UnknownView(id.clone()))
    }

    // ------------------------------------------------------------------------
    // Event intake
    // ------------------------------------------------------------------------

    /// Turn queued model events into view changes and dirty flags.
    fn apply_events(&mut self, graph: &Graph) {
        for event in self.subscription.drain() {
            match event {
                GraphEvent::Added { id } => {
                    if let Some(cell) = graph.get_cell(&id) {
                        self.mount(cell);
                    }
                }
                GraphEvent::Removed { id } => {
                    if let Some(slot) = self.views.shift_remove(&id) {
                        self.unmount(slot.view);
                    }
                }
                GraphEvent::Changed { id, property, .. } => {
                    let Some(slot) = self.views.get_mut(&id) else {
                        continue;
                    };
                    if slot.view.is_link() {
                        slot.flags |= link_flags(&property);
                        continue;
                    }
                    slot.flags |= element_flags(&property);
                    let for_links = connected_link_flags(&property);
                    if !for_links.is_empty() {
                        for link in graph.connected_links(&id, LinkQuery::all()) {
                            if let Some(slot) = self.views.get_mut(&link) {
                                slot.flags |= for_links;
                            }
                        }
                    }
                }
                GraphEvent::Sorted => self.sort_views(graph),
                GraphEvent::Reset => self.reset_views(graph),
                GraphEvent::BatchStart { .. } | GraphEvent::BatchStop { .. } => {}
            }
        }
    }

    fn mount(&mut self, cell: &Cell) {
        if let Some(old) = self.views.shift_remove(cell.id()) {
            self.unmount(old.view);
        }
        let view = if cell.is_link() {
            CellView::Link(LinkView::mount(&mut self.tree, self.layer, cell))
        } else {
            CellView::Element(ElementView::mount(&mut self.tree, self.layer, cell))
        };
        self.views.insert(
            cell.id().clone(),
            ViewSlot {
                view,
                flags: DirtyFlags::RENDER,
            },
        );
    }

    fn unmount(&mut self, view: CellView<D::Node>) {
        match view {
            CellView::Element(view) => view.unmount(&mut self.tree),
            CellView::Link(view) => view.unmount(&mut self.tree),
        }
    }

    fn reset_views(&mut self, graph: &Graph) {
        for (_, slot) in self.views.drain(..).collect::<Vec<_>>() {
            self.unmount(slot.view);
        }
        for cell in graph.cells() {
            self.mount(cell);
        }
    }

    /// Put views, and their nodes, in the graph's z order.
    fn sort_views(&mut self, graph: &Graph) {
        let order: IndexMap<&CellId, usize> =
            graph.cells().enumerate().map(|(i, c)| (c.id(), i)).collect();
        let rank = |id: &CellId| order.get(id).copied().unwrap_or(usize::MAX);
        self.views.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
        for slot in self.views.values() {
            self.tree.append(self.layer, slot.view.root());
        }
    }

    // ------------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------------

    /// Pick up model changes and bring every view up to date.
    pub fn update(&mut self, graph: &Graph) -> UpdateStats {
        self.apply_events(graph);
        self.frames.cancel(&Frame::Update);
        self.run_passes(graph)
    }

    /// Tell the paper the model changed. Runs an update right away unless a
    /// batch is open or updates are asynchronous, in which case it waits for
    /// the batch to close or for the next [`Paper::frame`].
    pub fn notify(&mut self, graph: &Graph, now: f64) -> Option<UpdateStats> {
        self.apply_events(graph);
        if graph.has_active_batch(None) {
            trace!("batch open, deferring update");
            return None;
        }
        if self.options.async_updates {
            if self.is_dirty() {
                self.frames.request(Frame::Update, now);
            }
            return None;
        }
        Some(self.run_passes(graph))
    }

    /// Run a scheduled update if it is due.
    pub fn frame(&mut self, graph: &Graph, now: f64) -> Option<UpdateStats> {
        if self.frames.run_frame(now).is_empty() {
            return None;
        }
        Some(self.update(graph))
    }

    /// When the next scheduled update is due.
    pub fn next_frame(&self) -> Option<f64> {
        self.frames.next_due()
    }

    fn run_passes(&mut self, graph: &Graph) -> UpdateStats {
        let mut stats = UpdateStats::default();
        while stats.passes < defaults::MAX_UPDATE_PASSES {
            let mut dirty: Vec<(CellId, bool)> = self
                .views
                .iter()
                .filter(|(_, slot)| !slot.flags.is_empty())
                .map(|(id, slot)| (id.clone(), slot.view.is_link()))
                .collect();
            if dirty.is_empty() {
                break;
            }
            dirty.sort_by_key(|(_, is_link)| *is_link);
            stats.passes += 1;
            trace!(pass = stats.passes, views = dirty.len(), "update pass");

            let mut progressed = false;
            for (id, _) in dirty {
                let Some(cell) = graph.get_cell(&id) else {
                    debug!(%id, "view without a cell, dropping it");
                    if let Some(slot) = self.views.shift_remove(&id) {
                        self.unmount(slot.view);
                    }
                    continue;
                };
                let Some(pass) = self.update_view(graph, cell) else {
                    continue;
                };
                if pass.taken != pass.left {
                    progressed = true;
                    stats.updated += 1;
                }
                if pass.moved {
                    // links ending on this one anchor at its path
                    for link in graph.connected_links(&id, LinkQuery::all()) {
                        if let Some(slot) = self.views.get_mut(&link) {
                            slot.flags |= DirtyFlags::UPDATE;
                        }
                    }
                }
            }
            if !progressed {
                break;
            }
        }
        stats.pending = self
            .views
            .values()
            .filter(|slot| !slot.flags.is_empty())
            .count();
        if stats.pending > 0 {
            trace!(pending = stats.pending, "views left dirty");
        }
        stats
    }

    /// Hand a view its flags.
    fn update_view(&mut self, graph: &Graph, cell: &Cell) -> Option<ViewPass> {
        let id = cell.id();
        let taken = std::mem::take(&mut self.views.get_mut(id)?.flags);

        let ends = match cell.as_link() {
            Some(link) => Some((
                link.source.clone(),
                self.end_state(graph, &link.source),
                self.end_state(graph, &link.target),
            )),
            None => None,
        };

        let slot = self.views.get_mut(id)?;
        let mut moved = false;
        let left = match (&mut slot.view, ends) {
            (CellView::Element(view), _) => view.confirm_update(&mut self.tree, cell, taken),
            (CellView::Link(view), Some((source, source_state, target_state))) => {
                let ends = |end: &Endpoint| {
                    if *end == source {
                        source_state
                    } else {
                        target_state
                    }
                };
                let before = view.path().clone();
                let left = view.confirm_update(&mut self.tree, cell, taken, &ends, &self.options);
                moved = *view.path() != before;
                left
            }
            (CellView::Link(_), None) => DirtyFlags::empty(),
        };
        // flags requested while the view ran are kept
        slot.flags |= left;
        if !left.is_empty() {
            trace!(%id, ?left, "flags left over");
        }
        Some(ViewPass { taken, left, moved })
    }

    fn end_state(&self, graph: &Graph, end: &Endpoint) -> EndState {
        let (id, port, selector) = match end {
            Endpoint::Point(p) => return EndState::Mounted(Anchor::Point(*p)),
            Endpoint::Cell { id, port, selector } => (id, port, selector),
        };
        let Some(cell) = graph.get_cell(id) else {
            return EndState::Missing;
        };
        let Some(slot) = self.views.get(id) else {
            return EndState::Unmounted;
        };
        match &slot.view {
            CellView::Element(view) if view.is_rendered() => EndState::Mounted(view.boundary(
                &self.tree,
                cell,
                port.as_ref(),
                selector.as_deref(),
            )),
            CellView::Link(view) if view.is_rendered() => {
                let path = view.path();
                match path.point_at_length(path.length() / 2.0) {
                    Some(mid) => EndState::Mounted(Anchor::Point(mid)),
                    None => EndState::Unmounted,
                }
            }
            _ => EndState::Unmounted,
        }
    }
}

impl Paper<VTree> {
    /// Headless paper over an in-memory tree.
    pub fn headless(graph: &Graph, options: PaperOptions) -> Self {
        Paper::new(graph, VTree::new(), options)
    }

    /// The whole drawing as SVG-like markup.
    pub fn to_svg(&self) -> String {
        self.tree.to_svg(self.tree.root())
    }
}
