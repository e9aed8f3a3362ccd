//! Frame scheduling and property transitions.
//!
//! Time is whatever monotonic millisecond clock the host uses; nothing here
//! reads a clock itself. The host calls [`FrameScheduler::run_frame`] and
//! [`Transitions::frame`] from its animation loop.

use std::hash::Hash;

use indexmap::IndexMap;
use serde_json::json;

use crate::errors::ModelError;
use crate::geometry::Point;
use crate::log::debug;
use crate::model::Graph;
use crate::types::CellId;

use super::defaults;

// ============================================================================
// Frames
// ============================================================================

/// Pending frame callbacks, one slot per key.
///
/// Requesting a slot that is already pending replaces the earlier request.
#[derive(Debug, Clone)]
pub struct FrameScheduler<K> {
    pending: IndexMap<K, f64>,
}

impl<K> Default for FrameScheduler<K> {
    fn default() -> Self {
        FrameScheduler {
            pending: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> FrameScheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `key` on the next frame after `now`.
    pub fn request(&mut self, key: K, now: f64) {
        self.request_at(key, now + defaults::FRAME_MS);
    }

    /// Run `key` on the first frame at or after `due`.
    pub fn request_at(&mut self, key: K, due: f64) {
        self.pending.shift_remove(&key);
        self.pending.insert(key, due);
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.shift_remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest due time of any pending slot.
    pub fn next_due(&self) -> Option<f64> {
        self.pending.values().copied().reduce(f64::min)
    }

    /// Remove and return every key due by `now`, in request order.
    pub fn run_frame(&mut self, now: f64) -> Vec<K> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.pending.shift_remove(key);
        }
        due
    }
}

// ============================================================================
// Timing functions
// ============================================================================

/// Maps linear progress in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timing {
    #[default]
    Linear,
    Quad,
    Cubic,
    /// Slow start and end, cubic in between.
    InOut,
    Exponential,
}

impl Timing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Timing::Linear => t,
            Timing::Quad => t * t,
            Timing::Cubic => t * t * t,
            Timing::InOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let (t2, t3) = (t * t, t * t * t);
                    4.0 * if t < 0.5 { t3 } else { 3.0 * (t - t2) + t3 - 0.75 }
                }
            }
            Timing::Exponential => {
                if t >= 1.0 {
                    1.0
                } else {
                    2f64.powf(10.0 * (t - 1.0))
                }
            }
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// The cell property a transition drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransitionKey {
    Position,
    Size,
    Angle,
    /// A numeric attribute, by `selector/property` path.
    Attr(String),
}

/// Final value of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionTarget {
    Position(Point),
    Size { width: f64, height: f64 },
    Angle(f64),
    Attr { path: String, value: f64 },
}

impl TransitionTarget {
    pub fn key(&self) -> TransitionKey {
        match self {
            TransitionTarget::Position(_) => TransitionKey::Position,
            TransitionTarget::Size { .. } => TransitionKey::Size,
            TransitionTarget::Angle(_) => TransitionKey::Angle,
            TransitionTarget::Attr { path, .. } => TransitionKey::Attr(path.clone()),
        }
    }

    fn values(&self) -> [f64; 2] {
        match *self {
            TransitionTarget::Position(p) => [p.x, p.y],
            TransitionTarget::Size { width, height } => [width, height],
            TransitionTarget::Angle(a) => [a, 0.0],
            TransitionTarget::Attr { value, .. } => [value, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionOptions {
    /// Milliseconds from the first frame to the final value.
    pub duration: f64,
    /// Milliseconds before the first frame.
    pub delay: f64,
    pub timing: Timing,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        TransitionOptions {
            duration: 100.0,
            delay: 10.0,
            timing: Timing::Linear,
        }
    }
}

#[derive(Debug, Clone)]
struct Running {
    from: [f64; 2],
    target: TransitionTarget,
    start: f64,
    options: TransitionOptions,
}

impl Running {
    fn progress(&self, now: f64) -> f64 {
        if self.options.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.options.duration).clamp(0.0, 1.0)
    }
}

/// Running property transitions; at most one per cell and property.
///
/// Every transition owns one frame slot. It is first due when its delay
/// runs out, then once per frame until it ends.
#[derive(Debug, Clone, Default)]
pub struct Transitions {
    running: IndexMap<(CellId, TransitionKey), Running>,
    frames: FrameScheduler<(CellId, TransitionKey)>,
}

impl Transitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// When [`Transitions::frame`] next has work to do.
    pub fn next_due(&self) -> Option<f64> {
        self.frames.next_due()
    }

    /// Start moving a property of `id` toward `target`, from its current
    /// value. A transition already running on the same property is dropped
    /// without reaching its end value.
    pub fn start(
        &mut self,
        graph: &Graph,
        id: &CellId,
        target: TransitionTarget,
        options: TransitionOptions,
        now: f64,
    ) -> Result<(), ModelError> {
        let from = match &target {
            TransitionTarget::Attr { path, .. } => {
                graph.cell(id)?;
                let current = graph.attr(id, path).and_then(serde_json::Value::as_f64);
                [current.unwrap_or(0.0), 0.0]
            }
            TransitionTarget::Position(_) => {
                let p = graph.element(id)?.position;
                [p.x, p.y]
            }
            TransitionTarget::Size { .. } => {
                let size = graph.element(id)?.size;
                [size.width(), size.height()]
            }
            TransitionTarget::Angle(_) => [graph.element(id)?.angle, 0.0],
        };
        let key = (id.clone(), target.key());
        self.running.shift_remove(&key);
        // replaces the frame request of a superseded transition
        self.frames.request_at(key.clone(), now + options.delay);
        self.running.insert(
            key,
            Running {
                from,
                target,
                start: now + options.delay,
                options,
            },
        );
        Ok(())
    }

    /// Stop the transitions of `id`, all of them or only the one on `key`.
    /// Properties keep whatever value the last frame gave them.
    pub fn stop(&mut self, id: &CellId, key: Option<&TransitionKey>) -> Vec<TransitionKey> {
        let stopped: Vec<(CellId, TransitionKey)> = self
            .running
            .keys()
            .filter(|(cell, k)| cell == id && key.is_none_or(|wanted| wanted == k))
            .cloned()
            .collect();
        for entry in &stopped {
            self.running.shift_remove(entry);
            self.frames.cancel(entry);
        }
        stopped.into_iter().map(|(_, k)| k).collect()
    }

    /// Properties of `id` currently transitioning.
    pub fn active(&self, id: &CellId) -> Vec<&TransitionKey> {
        self.running
            .keys()
            .filter(|(cell, _)| cell == id)
            .map(|(_, k)| k)
            .collect()
    }

    /// Write the interpolated values for time `now` through the graph's
    /// setters, for the transitions whose frame is due. Returns the
    /// transitions that reached their end.
    ///
    /// Transitions whose cell has gone away are dropped.
    pub fn frame(&mut self, graph: &mut Graph, now: f64) -> Vec<(CellId, TransitionKey)> {
        let mut finished = Vec::new();
        let mut dropped = Vec::new();
        for entry in self.frames.run_frame(now) {
            let Some(running) = self.running.get(&entry) else {
                continue;
            };
            let (id, key) = &entry;
            let progress = running.progress(now);
            let eased = running.options.timing.apply(progress);
            let to = running.target.values();
            let value = |i: usize| running.from[i] + (to[i] - running.from[i]) * eased;

            let applied = match &running.target {
                TransitionTarget::Position(_) => graph.set_position(id, value(0), value(1)),
                TransitionTarget::Size { .. } => graph.resize(id, value(0), value(1)),
                TransitionTarget::Angle(_) => graph.rotate(id, value(0), true),
                TransitionTarget::Attr { path, .. } => graph.set_attr(id, path, json!(value(0))),
            };
            match applied {
                Ok(()) if progress >= 1.0 => finished.push(entry),
                Ok(()) => self.frames.request(entry, now),
                Err(err) => {
                    debug!(%id, ?key, %err, "dropping transition");
                    dropped.push(entry);
                }
            }
        }
        for entry in finished.iter().chain(&dropped) {
            self.running.shift_remove(entry);
        }
        finished
    }
}
