//! The diagram model: cells, their attributes, the graph holding them and
//! the events it publishes.

pub mod attrs;
pub mod cell;
pub mod events;
pub mod graph;
mod json;

pub use attrs::AttrTree;
pub use cell::{
    Cell, CellKind, ElementGeometry, Endpoint, LINK_TYPE, Label, LabelOffset, LabelPosition,
    LinkData, TypeDefaults,
};
pub use events::{EventBus, GraphEvent, Property, Subscription};
pub use graph::{Graph, LinkQuery, RemovalPolicy, Traversal};
