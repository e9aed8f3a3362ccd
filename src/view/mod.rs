//! Views: keeping a drawable tree in step with the graph
//!
//! This module is organized into submodules:
//! - `defaults`: Default sizes and settings
//! - `flags`: Dirty flags and the property-to-flag tables
//! - `tree`: The `Drawable` surface and the in-memory `VTree`
//! - `orient`: Marker placement along a direction
//! - `element_view` / `link_view`: Per-cell sub-renders
//! - `scheduler`: Frame slots and property transitions
//! - `paper`: The view registry and update loop

pub mod defaults;
pub mod element_view;
pub mod flags;
pub mod link_view;
pub mod orient;
pub mod paper;
pub mod scheduler;
pub mod tree;

pub use element_view::ElementView;
pub use flags::DirtyFlags;
pub use link_view::{EndState, LinkView};
pub use orient::translate_and_auto_orient;
pub use paper::{Connector, Paper, PaperOptions, Router, UpdateStats};
pub use scheduler::{
    FrameScheduler, Timing, TransitionKey, TransitionOptions, TransitionTarget, Transitions,
};
pub use tree::{Drawable, NodeId, Transform, TransformOp, VTree};
