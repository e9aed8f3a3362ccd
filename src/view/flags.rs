//! Dirty flags: which parts of a view need re-rendering.

use bitflags::bitflags;

use crate::model::Property;

bitflags! {
    /// Set of pending sub-renders for one view.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u16 {
        const RENDER = 1 << 0;
        const UPDATE = 1 << 1;
        const TRANSLATE = 1 << 2;
        const RESIZE = 1 << 3;
        const ROTATE = 1 << 4;
        const PORTS = 1 << 5;
        const SOURCE = 1 << 6;
        const TARGET = 1 << 7;
        const CONNECTOR = 1 << 8;
        const LABELS = 1 << 9;
        const TOOLS = 1 << 10;
    }
}

impl DirtyFlags {
    /// Clear `other`, reporting whether any of it was set.
    pub fn take(&mut self, other: DirtyFlags) -> bool {
        let had = self.intersects(other);
        self.remove(other);
        had
    }
}

/// Flags an element view needs after `property` changed.
pub fn element_flags(property: &Property) -> DirtyFlags {
    match property {
        Property::Type => DirtyFlags::RENDER,
        Property::Attrs(_) => DirtyFlags::UPDATE,
        Property::Position => DirtyFlags::TRANSLATE | DirtyFlags::TOOLS,
        Property::Size => DirtyFlags::RESIZE | DirtyFlags::PORTS | DirtyFlags::TOOLS,
        Property::Angle => DirtyFlags::ROTATE | DirtyFlags::TOOLS,
        Property::Ports => DirtyFlags::PORTS,
        _ => DirtyFlags::empty(),
    }
}

/// Flags a link view needs after `property` changed.
pub fn link_flags(property: &Property) -> DirtyFlags {
    match property {
        Property::Type => DirtyFlags::RENDER,
        Property::Attrs(_) | Property::Vertices | Property::Router => DirtyFlags::UPDATE,
        Property::Connector => DirtyFlags::CONNECTOR,
        Property::Labels => DirtyFlags::LABELS,
        Property::Source => DirtyFlags::SOURCE | DirtyFlags::UPDATE,
        Property::Target => DirtyFlags::TARGET | DirtyFlags::UPDATE,
        _ => DirtyFlags::empty(),
    }
}

/// Flags a link needs when one of its end elements changed geometry.
pub fn connected_link_flags(property: &Property) -> DirtyFlags {
    match property {
        Property::Position | Property::Size | Property::Angle | Property::Ports => {
            DirtyFlags::UPDATE
        }
        _ => DirtyFlags::empty(),
    }
}
