//! Graph change notifications.
//!
//! The graph publishes typed events; every subscriber gets its own queue and
//! drains it when convenient. Dropping a [`Subscription`] unsubscribes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::types::CellId;

/// The model property a change touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Type,
    Position,
    Size,
    Angle,
    /// An attribute path, `selector/property`.
    Attrs(String),
    /// The set of declared ports changed.
    Ports,
    Z,
    Parent,
    Embeds,
    Source,
    Target,
    Vertices,
    Labels,
    /// Straight or smooth path construction.
    Connector,
    /// Free or orthogonal routing.
    Router,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    Added {
        id: CellId,
    },
    Removed {
        id: CellId,
    },
    Changed {
        id: CellId,
        property: Property,
        old: Value,
        new: Value,
    },
    /// The z order of the cell collection changed.
    Sorted,
    /// All cells were replaced at once.
    Reset,
    BatchStart {
        name: String,
    },
    BatchStop {
        name: String,
    },
}

type Queue = Rc<RefCell<VecDeque<GraphEvent>>>;

/// Publish side of the channel.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: RefCell<Vec<Weak<RefCell<VecDeque<GraphEvent>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Rc::downgrade(&queue));
        Subscription { queue }
    }

    /// Deliver to every live subscriber, forgetting dropped ones.
    pub fn publish(&self, event: GraphEvent) {
        self.subscribers.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(queue) => {
                queue.borrow_mut().push_back(event.clone());
                true
            }
            None => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

/// Receive side of the channel.
#[derive(Debug)]
pub struct Subscription {
    queue: Queue,
}

impl Subscription {
    pub fn poll(&self) -> Option<GraphEvent> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn drain(&self) -> Vec<GraphEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(GraphEvent::Sorted);
        assert_eq!(a.drain(), vec![GraphEvent::Sorted]);
        assert_eq!(b.poll(), Some(GraphEvent::Sorted));
        assert!(b.is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        {
            let _b = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        bus.publish(GraphEvent::Reset);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(a.drain().len(), 1);
    }
}
