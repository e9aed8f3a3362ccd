//! Geometry, link routing and graph/view synchronization for node-link
//! diagrams.
//!
//! A [`Graph`] holds the cells (elements and the links between them) and
//! publishes an event for every change. A [`Paper`] listens to those events
//! and keeps one view per cell up to date in a [`Drawable`] tree, redoing
//! only the parts of a view that a change touched.
//!
//! ```
//! use nodelink::{Cell, Endpoint, Graph, Paper, PaperOptions, Size};
//!
//! let mut graph = Graph::new();
//! let size = Size::try_new(100.0, 60.0).unwrap();
//! graph
//!     .add_cells(vec![
//!         Cell::element("basic.Rect").with_id("a").with_size(size),
//!         Cell::element("basic.Rect").with_id("b").at(300.0, 0.0).with_size(size),
//!         Cell::link(Endpoint::cell("a"), Endpoint::cell("b")).with_id("l"),
//!     ])
//!     .unwrap();
//!
//! let mut paper = Paper::headless(&graph, PaperOptions::default());
//! paper.update(&graph);
//! let link = paper.link_view(&"l".into()).unwrap();
//! assert_eq!(link.path().to_string(), "M 100 30 L 300 30");
//! ```

pub mod errors;
pub mod geometry;
mod log;
pub mod model;
pub mod routing;
pub mod types;
pub mod view;

pub use errors::{GeometryError, ModelError, ViewError};
pub use geometry::{Ellipse, Line, Matrix, PathData, Point, Rect, pt};
pub use model::{
    AttrTree, Cell, Endpoint, Graph, GraphEvent, Label, LabelOffset, LabelPosition, LinkQuery,
    Property, RemovalPolicy, Traversal, TypeDefaults,
};
pub use routing::{Anchor, ResolveOptions, RotatedRect, resolve, route_between};
pub use types::{CellId, PortId, Size};
pub use view::{Connector, DirtyFlags, Drawable, Paper, PaperOptions, Router, VTree};
