//! The cell graph.
//!
//! Cells live in one id-indexed collection kept sorted by z (ties keep
//! insertion order). Every relation is an id, so removal, cloning and
//! (de)serialization only ever remap ids. Traversals use explicit stacks and
//! queues; deep embedding chains cannot exhaust the call stack.
//!
//! Every mutation publishes [`GraphEvent`]s to the subscribers.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::{Value, json};

use super::attrs::AttrTree;
use super::cell::{Cell, ElementGeometry, Endpoint, Label, LabelPosition, LinkData, TypeDefaults};
use super::events::{EventBus, GraphEvent, Property, Subscription};
use crate::errors::ModelError;
use crate::geometry::{Point, Rect, pt};
use crate::log::debug;
use crate::types::{CellId, PortId, Size, normalize_angle};

/// What happens to links attached to a removed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Remove the links too.
    #[default]
    RemoveLinks,
    /// Keep the links, turning the dangling end into a free point at the
    /// removed element's center.
    DisconnectLinks,
}

/// Which links count as connected.
///
/// Neither `inbound` nor `outbound` set means both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkQuery {
    pub inbound: bool,
    pub outbound: bool,
    /// Also consider links attached to embedded descendants.
    pub deep: bool,
}

impl LinkQuery {
    pub fn all() -> Self {
        LinkQuery::default()
    }

    pub fn inbound() -> Self {
        LinkQuery {
            inbound: true,
            ..LinkQuery::default()
        }
    }

    pub fn outbound() -> Self {
        LinkQuery {
            outbound: true,
            ..LinkQuery::default()
        }
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }
}

/// Order in which embedded cells are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Direct children only.
    Direct,
    DepthFirst,
    BreadthFirst,
}

#[derive(Debug)]
pub struct Graph {
    pub(crate) cells: IndexMap<CellId, Cell>,
    defaults: TypeDefaults,
    removal_policy: RemovalPolicy,
    bus: EventBus,
    batches: Vec<String>,
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

impl Graph {
    /// An empty graph with the built-in type defaults.
    pub fn new() -> Self {
        Graph::with_defaults(TypeDefaults::builtin())
    }

    pub fn with_defaults(defaults: TypeDefaults) -> Self {
        Graph {
            cells: IndexMap::new(),
            defaults,
            removal_policy: RemovalPolicy::default(),
            bus: EventBus::new(),
            batches: Vec::new(),
        }
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy
    }

    pub fn set_removal_policy(&mut self, policy: RemovalPolicy) {
        self.removal_policy = policy;
    }

    pub fn defaults(&self) -> &TypeDefaults {
        &self.defaults
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    fn publish(&self, event: GraphEvent) {
        self.bus.publish(event);
    }

    fn publish_change(&self, id: &CellId, property: Property, old: Value, new: Value) {
        if old != new {
            self.publish(GraphEvent::Changed {
                id: id.clone(),
                property,
                old,
                new,
            });
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn get_cell(&self, id: &CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Like [`Graph::get_cell`], as an error.
    pub fn cell(&self, id: &CellId) -> Result<&Cell, ModelError> {
        self.cells
            .get(id)
            .ok_or_else(|| ModelError::UnknownCell(id.clone()))
    }

    /// All cells in z order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().filter(|c| c.is_element())
    }

    pub fn links(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().filter(|c| c.is_link())
    }

    pub fn element(&self, id: &CellId) -> Result<&ElementGeometry, ModelError> {
        self.cell(id)?
            .as_element()
            .ok_or_else(|| ModelError::NotAnElement(id.clone()))
    }

    pub fn link(&self, id: &CellId) -> Result<&LinkData, ModelError> {
        self.cell(id)?
            .as_link()
            .ok_or_else(|| ModelError::NotALink(id.clone()))
    }

    fn cell_mut(&mut self, id: &CellId) -> Result<&mut Cell, ModelError> {
        self.cells
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownCell(id.clone()))
    }

    pub fn max_z(&self) -> i64 {
        self.cells.values().map(Cell::z).max().unwrap_or(0)
    }

    pub fn min_z(&self) -> i64 {
        self.cells.values().map(Cell::z).min().unwrap_or(0)
    }

    // ========================================================================
    // Batches
    // ========================================================================

    pub fn start_batch(&mut self, name: &str) {
        self.batches.push(name.to_string());
        self.publish(GraphEvent::BatchStart {
            name: name.to_string(),
        });
    }

    pub fn stop_batch(&mut self, name: &str) {
        if let Some(pos) = self.batches.iter().rposition(|b| b == name) {
            self.batches.remove(pos);
        }
        self.publish(GraphEvent::BatchStop {
            name: name.to_string(),
        });
    }

    /// Whether any batch, or the named one, is open.
    pub fn has_active_batch(&self, name: Option<&str>) -> bool {
        match name {
            Some(name) => self.batches.iter().any(|b| b == name),
            None => !self.batches.is_empty(),
        }
    }

    // ========================================================================
    // Insertion and removal
    // ========================================================================

    /// Insert a cell. Without a z it is stacked on top of everything.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId, ModelError> {
        let mut ids = self.add_cells(vec![cell])?;
        ids.pop().ok_or(ModelError::MissingCells)
    }

    /// Insert several cells at once. They may refer to each other; nothing is
    /// inserted unless all of them are valid.
    pub fn add_cells(&mut self, cells: Vec<Cell>) -> Result<Vec<CellId>, ModelError> {
        self.validate_new(&cells)?;
        let ids = self.insert_validated(cells);
        for id in &ids {
            self.publish(GraphEvent::Added { id: id.clone() });
        }
        self.sort();
        Ok(ids)
    }

    /// Replace every cell, publishing a single reset.
    pub fn reset_cells(&mut self, cells: Vec<Cell>) -> Result<(), ModelError> {
        let previous = std::mem::take(&mut self.cells);
        if let Err(err) = self.validate_new(&cells) {
            self.cells = previous;
            return Err(err);
        }
        self.insert_validated(cells);
        self.cells.sort_by(|_, a, _, b| a.z().cmp(&b.z()));
        self.publish(GraphEvent::Reset);
        Ok(())
    }

    fn validate_new(&self, cells: &[Cell]) -> Result<(), ModelError> {
        let mut batch: HashMap<&CellId, &Cell> = HashMap::new();
        for cell in cells {
            if self.cells.contains_key(&cell.id) || batch.insert(&cell.id, cell).is_some() {
                return Err(ModelError::DuplicateId(cell.id.clone()));
            }
        }
        for cell in cells {
            for reference in cell.references() {
                if !self.cells.contains_key(reference) && !batch.contains_key(reference) {
                    return Err(ModelError::UnknownCell(reference.clone()));
                }
            }
        }
        let parent_of = |id: &CellId| -> Option<&CellId> {
            batch
                .get(id)
                .and_then(|c| c.parent.as_ref())
                .or_else(|| self.cells.get(id).and_then(|c| c.parent.as_ref()))
        };
        let limit = self.cells.len() + cells.len();
        for cell in cells {
            let mut current = cell.parent.as_ref();
            let mut steps = 0;
            while let Some(parent) = current {
                if parent == &cell.id || steps > limit {
                    return Err(ModelError::RecursiveEmbedding {
                        parent: cell.parent.clone().unwrap_or_else(|| parent.clone()),
                        child: cell.id.clone(),
                    });
                }
                current = parent_of(parent);
                steps += 1;
            }
        }
        Ok(())
    }

    fn insert_validated(&mut self, cells: Vec<Cell>) -> Vec<CellId> {
        let mut max_z = self.max_z();
        let mut ids = Vec::with_capacity(cells.len());
        for mut cell in cells {
            match cell.z {
                Some(z) => max_z = max_z.max(z),
                None => {
                    max_z += 1;
                    cell.z = Some(max_z);
                }
            }
            if let Some(defaults) = self.defaults.get(&cell.cell_type) {
                cell.attrs = cell.attrs.with_defaults(defaults);
            }
            ids.push(cell.id.clone());
            self.cells.insert(cell.id.clone(), cell);
        }
        // parent and embeds must agree
        for id in &ids {
            let (parent, embeds) = match self.cells.get(id) {
                Some(cell) => (cell.parent.clone(), cell.embeds.clone()),
                None => continue,
            };
            if let Some(parent) = parent.and_then(|p| self.cells.get_mut(&p)) {
                if !parent.embeds.contains(id) {
                    parent.embeds.push(id.clone());
                }
            }
            for child in embeds {
                if let Some(child) = self.cells.get_mut(&child) {
                    if child.parent.is_none() {
                        child.parent = Some(id.clone());
                    }
                }
            }
        }
        ids
    }

    fn sort(&mut self) {
        let sorted = self
            .cells
            .values()
            .zip(self.cells.values().skip(1))
            .all(|(a, b)| a.z() <= b.z());
        if !sorted {
            self.cells.sort_by(|_, a, _, b| a.z().cmp(&b.z()));
            self.publish(GraphEvent::Sorted);
        }
    }

    /// Remove a cell under the graph's removal policy. Returns every removed
    /// id: the cell, its embedded descendants and, under
    /// [`RemovalPolicy::RemoveLinks`], the links attached to any of them.
    pub fn remove_cell(&mut self, id: &CellId) -> Result<Vec<CellId>, ModelError> {
        self.remove_cell_with(id, self.removal_policy)
    }

    pub fn remove_cell_with(
        &mut self,
        id: &CellId,
        policy: RemovalPolicy,
    ) -> Result<Vec<CellId>, ModelError> {
        self.cell(id)?;
        self.start_batch("remove");

        let mut doomed: IndexSet<CellId> = IndexSet::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if doomed.contains(&current) {
                continue;
            }
            let Some(cell) = self.cells.get(&current) else {
                continue;
            };
            stack.extend(cell.embeds.iter().rev().cloned());
            if policy == RemovalPolicy::RemoveLinks {
                stack.extend(self.connected_links(&current, LinkQuery::all()));
            }
            doomed.insert(current);
        }

        if policy == RemovalPolicy::DisconnectLinks {
            if let Err(err) = self.disconnect_links_to(&doomed) {
                self.stop_batch("remove");
                return Err(err);
            }
        }

        for gone in &doomed {
            let parent = self.cells.get(gone).and_then(|c| c.parent.clone());
            if let Some(parent) = parent.filter(|p| !doomed.contains(p)) {
                self.detach_embed(&parent, gone);
            }
        }

        for gone in &doomed {
            self.cells.shift_remove(gone);
            self.publish(GraphEvent::Removed { id: gone.clone() });
        }
        debug!(id = %id, removed = doomed.len(), "removed cell");

        self.stop_batch("remove");
        Ok(doomed.into_iter().collect())
    }

    /// Remove several cells; ids already removed by an earlier cascade are
    /// skipped.
    pub fn remove_cells(&mut self, ids: &[CellId]) -> Result<Vec<CellId>, ModelError> {
        let mut removed = Vec::new();
        for id in ids {
            if self.contains(id) {
                removed.extend(self.remove_cell(id)?);
            }
        }
        Ok(removed)
    }

    /// Remove everything. Subscribers get a single reset.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.publish(GraphEvent::Reset);
    }

    fn disconnect_links_to(&mut self, doomed: &IndexSet<CellId>) -> Result<(), ModelError> {
        let link_ids: Vec<CellId> = self
            .links()
            .filter(|c| !doomed.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();
        for link_id in link_ids {
            let Some(link) = self.cells.get(&link_id).and_then(Cell::as_link) else {
                continue;
            };
            let source = self.detached(&link.source, doomed);
            let target = self.detached(&link.target, doomed);
            if let Some(end) = source {
                self.update_link(&link_id, Property::Source, |l| {
                    l.source = end;
                    Ok(())
                })?;
            }
            if let Some(end) = target {
                self.update_link(&link_id, Property::Target, |l| {
                    l.target = end;
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// The free point replacing `end` if it points into `doomed`.
    fn detached(&self, end: &Endpoint, doomed: &IndexSet<CellId>) -> Option<Endpoint> {
        let id = end.cell_id().filter(|id| doomed.contains(*id))?;
        let at = self
            .cells
            .get(id)
            .and_then(Cell::as_element)
            .map(|e| e.bbox().center())
            .unwrap_or(Point::ORIGIN);
        Some(Endpoint::Point(at))
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Links attached to `id`. A linear scan over all links, so the cost
    /// grows with the size of the graph, not the degree of the cell.
    pub fn connected_links(&self, id: &CellId, query: LinkQuery) -> Vec<CellId> {
        let (inbound, outbound) = if !query.inbound && !query.outbound {
            (true, true)
        } else {
            (query.inbound, query.outbound)
        };
        let mut ends: HashSet<CellId> = HashSet::new();
        ends.insert(id.clone());
        if query.deep {
            ends.extend(self.embedded_cells(id, Traversal::DepthFirst));
        }

        let mut found: IndexSet<CellId> = IndexSet::new();
        for cell in self.links() {
            let Some(link) = cell.as_link() else { continue };
            let from = link.source.cell_id().is_some_and(|s| ends.contains(s));
            let to = link.target.cell_id().is_some_and(|t| ends.contains(t));
            if (outbound && from) || (inbound && to) {
                found.insert(cell.id.clone());
            }
        }
        found.into_iter().collect()
    }

    /// Cells at the far end of the links attached to `id`.
    pub fn neighbors(&self, id: &CellId, query: LinkQuery) -> Vec<CellId> {
        let (inbound, outbound) = if !query.inbound && !query.outbound {
            (true, true)
        } else {
            (query.inbound, query.outbound)
        };
        let mut found: IndexSet<CellId> = IndexSet::new();
        for link_id in self.connected_links(id, query) {
            let Some(link) = self.cells.get(&link_id).and_then(Cell::as_link) else {
                continue;
            };
            if outbound && link.source.cell_id() == Some(id) {
                found.extend(link.target.cell_id().cloned());
            }
            if inbound && link.target.cell_id() == Some(id) {
                found.extend(link.source.cell_id().cloned());
            }
        }
        found.into_iter().collect()
    }

    // ========================================================================
    // Embedding
    // ========================================================================

    /// Make `child` part of `parent`. A cell may not embed itself or any of
    /// its ancestors; the graph is left untouched when it tries.
    pub fn embed(&mut self, parent: &CellId, child: &CellId) -> Result<(), ModelError> {
        self.cell(parent)?;
        let child_is_link = self.cell(child)?.is_link();
        if parent == child || self.is_embedded_in(parent, child) {
            debug!(parent = %parent, child = %child, "rejected recursive embedding");
            return Err(ModelError::RecursiveEmbedding {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
        let previous = self.cells.get(child).and_then(|c| c.parent.clone());
        if previous.as_ref() == Some(parent) {
            return Ok(());
        }
        if let Some(previous) = previous {
            self.unembed(&previous, child)?;
        }

        let parent_cell = self.cell_mut(parent)?;
        let old_embeds = to_json(&parent_cell.embeds);
        parent_cell.embeds.retain(|e| e != child);
        // links first, so they render beneath the embedded elements
        if child_is_link {
            parent_cell.embeds.insert(0, child.clone());
        } else {
            parent_cell.embeds.push(child.clone());
        }
        let new_embeds = to_json(&parent_cell.embeds);

        self.cell_mut(child)?.parent = Some(parent.clone());
        self.publish_change(child, Property::Parent, Value::Null, json!(parent));
        self.publish_change(parent, Property::Embeds, old_embeds, new_embeds);
        Ok(())
    }

    pub fn unembed(&mut self, parent: &CellId, child: &CellId) -> Result<(), ModelError> {
        self.cell(parent)?;
        let child_cell = self.cell_mut(child)?;
        if child_cell.parent.as_ref() == Some(parent) {
            child_cell.parent = None;
            self.publish_change(child, Property::Parent, json!(parent), Value::Null);
        }
        self.detach_embed(parent, child);
        Ok(())
    }

    fn detach_embed(&mut self, parent: &CellId, child: &CellId) {
        let Some(parent_cell) = self.cells.get_mut(parent) else {
            return;
        };
        if !parent_cell.embeds.contains(child) {
            return;
        }
        let old = to_json(&parent_cell.embeds);
        parent_cell.embeds.retain(|e| e != child);
        let new = to_json(&parent_cell.embeds);
        self.publish_change(parent, Property::Embeds, old, new);
    }

    /// Whether `ancestor` is somewhere up the parent chain of `id`.
    pub fn is_embedded_in(&self, id: &CellId, ancestor: &CellId) -> bool {
        let mut seen: HashSet<&CellId> = HashSet::new();
        let mut current = self.cells.get(id).and_then(|c| c.parent.as_ref());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if !seen.insert(parent) {
                return false;
            }
            current = self.cells.get(parent).and_then(|c| c.parent.as_ref());
        }
        false
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self, id: &CellId) -> Vec<CellId> {
        let mut out: Vec<CellId> = Vec::new();
        let mut current = self.cells.get(id).and_then(|c| c.parent.as_ref());
        while let Some(parent) = current {
            if out.contains(parent) {
                break;
            }
            out.push(parent.clone());
            current = self.cells.get(parent).and_then(|c| c.parent.as_ref());
        }
        out
    }

    pub fn embedded_cells(&self, id: &CellId, traversal: Traversal) -> Vec<CellId> {
        let Some(cell) = self.cells.get(id) else {
            return Vec::new();
        };
        match traversal {
            Traversal::Direct => cell.embeds.clone(),
            Traversal::BreadthFirst => {
                let mut out = Vec::new();
                let mut seen: HashSet<CellId> = HashSet::new();
                let mut queue: VecDeque<CellId> = cell.embeds.iter().cloned().collect();
                while let Some(next) = queue.pop_front() {
                    if !seen.insert(next.clone()) {
                        continue;
                    }
                    if let Some(c) = self.cells.get(&next) {
                        queue.extend(c.embeds.iter().cloned());
                    }
                    out.push(next);
                }
                out
            }
            Traversal::DepthFirst => {
                let mut out = Vec::new();
                let mut seen: HashSet<CellId> = HashSet::new();
                let mut stack: Vec<CellId> = cell.embeds.iter().rev().cloned().collect();
                while let Some(next) = stack.pop() {
                    if !seen.insert(next.clone()) {
                        continue;
                    }
                    if let Some(c) = self.cells.get(&next) {
                        stack.extend(c.embeds.iter().rev().cloned());
                    }
                    out.push(next);
                }
                out
            }
        }
    }

    // ========================================================================
    // Z order
    // ========================================================================

    pub fn set_z(&mut self, id: &CellId, z: i64) -> Result<(), ModelError> {
        let cell = self.cell_mut(id)?;
        let old = cell.z();
        cell.z = Some(z);
        self.publish_change(id, Property::Z, json!(old), json!(z));
        self.sort();
        Ok(())
    }

    /// Stack the cell (and its embedded descendants) above everything else.
    pub fn to_front(&mut self, id: &CellId) -> Result<(), ModelError> {
        self.cell(id)?;
        let mut z = self.max_z();
        let mut ids = vec![id.clone()];
        ids.extend(self.embedded_cells(id, Traversal::DepthFirst));
        for cell in ids {
            z += 1;
            self.set_z(&cell, z)?;
        }
        Ok(())
    }

    /// Stack the cell (and its embedded descendants) below everything else.
    pub fn to_back(&mut self, id: &CellId) -> Result<(), ModelError> {
        self.cell(id)?;
        let mut ids = vec![id.clone()];
        ids.extend(self.embedded_cells(id, Traversal::DepthFirst));
        let mut z = self.min_z() - ids.len() as i64;
        for cell in ids {
            self.set_z(&cell, z)?;
            z += 1;
        }
        Ok(())
    }

    // ========================================================================
    // Element geometry
    // ========================================================================

    fn update_element<T>(
        &mut self,
        id: &CellId,
        property: Property,
        f: impl FnOnce(&mut ElementGeometry) -> Result<T, ModelError>,
    ) -> Result<T, ModelError> {
        let geometry = self
            .cell_mut(id)?
            .as_element_mut()
            .ok_or_else(|| ModelError::NotAnElement(id.clone()))?;
        let old = element_snapshot(geometry, &property);
        let out = f(geometry)?;
        let new = element_snapshot(geometry, &property);
        self.publish_change(id, property, old, new);
        Ok(out)
    }

    pub fn set_position(&mut self, id: &CellId, x: f64, y: f64) -> Result<(), ModelError> {
        self.update_element(id, Property::Position, |e| {
            e.position = pt(x, y);
            Ok(())
        })
    }

    /// Move an element together with everything embedded in it. Embedded
    /// links have their vertices and free ends moved.
    pub fn translate(&mut self, id: &CellId, dx: f64, dy: f64) -> Result<(), ModelError> {
        self.cell(id)?;
        let mut ids = vec![id.clone()];
        ids.extend(self.embedded_cells(id, Traversal::DepthFirst));
        for cell_id in ids {
            let is_link = self.cell(&cell_id)?.is_link();
            if is_link {
                self.update_link(&cell_id, Property::Vertices, |l| {
                    for v in &mut l.vertices {
                        *v = v.offset(dx, dy);
                    }
                    Ok(())
                })?;
                for property in [Property::Source, Property::Target] {
                    let end = property.clone();
                    self.update_link(&cell_id, property, |l| {
                        let end = if end == Property::Source {
                            &mut l.source
                        } else {
                            &mut l.target
                        };
                        if let Endpoint::Point(p) = end {
                            *p = p.offset(dx, dy);
                        }
                        Ok(())
                    })?;
                }
            } else {
                self.update_element(&cell_id, Property::Position, |e| {
                    e.position = e.position.offset(dx, dy);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    pub fn resize(&mut self, id: &CellId, width: f64, height: f64) -> Result<(), ModelError> {
        let size = Size::try_new(width, height).map_err(ModelError::InvalidSize)?;
        self.update_element(id, Property::Size, |e| {
            e.size = size;
            Ok(())
        })
    }

    /// Rotate by `angle` degrees, or to `angle` when `absolute`.
    pub fn rotate(&mut self, id: &CellId, angle: f64, absolute: bool) -> Result<(), ModelError> {
        self.update_element(id, Property::Angle, |e| {
            e.angle = normalize_angle(if absolute { angle } else { e.angle + angle });
            Ok(())
        })
    }

    // ========================================================================
    // Attributes and ports
    // ========================================================================

    pub fn attr(&self, id: &CellId, path: &str) -> Option<&Value> {
        self.cells.get(id)?.attrs.get(path)
    }

    /// Set an attribute. Links attached to ports that disappear as a result
    /// are removed.
    pub fn set_attr(&mut self, id: &CellId, path: &str, value: Value) -> Result<(), ModelError> {
        self.change_attrs(id, path, |attrs| {
            attrs.set(path, value);
        })
    }

    pub fn remove_attr(&mut self, id: &CellId, path: &str) -> Result<(), ModelError> {
        self.change_attrs(id, path, |attrs| {
            attrs.unset(path);
        })
    }

    fn change_attrs(
        &mut self,
        id: &CellId,
        path: &str,
        f: impl FnOnce(&mut AttrTree),
    ) -> Result<(), ModelError> {
        let cell = self.cell_mut(id)?;
        let ports_before = cell.ports();
        let old = cell.attrs.get(path).cloned().unwrap_or(Value::Null);
        f(&mut cell.attrs);
        let new = cell.attrs.get(path).cloned().unwrap_or(Value::Null);
        let ports_after = cell.ports();
        self.publish_change(id, Property::Attrs(path.to_string()), old, new);

        if ports_before != ports_after {
            self.publish_change(
                id,
                Property::Ports,
                to_json(&ports_before),
                to_json(&ports_after),
            );
            let removed: Vec<PortId> = ports_before
                .into_iter()
                .filter(|p| !ports_after.contains(p))
                .collect();
            if !removed.is_empty() {
                self.remove_port_links(id, &removed)?;
            }
        }
        Ok(())
    }

    fn remove_port_links(&mut self, id: &CellId, ports: &[PortId]) -> Result<(), ModelError> {
        let attached = |end: &Endpoint| {
            end.cell_id() == Some(id) && end.port_id().is_some_and(|p| ports.contains(p))
        };
        let orphaned: Vec<CellId> = self
            .links()
            .filter_map(|c| {
                let link = c.as_link()?;
                (attached(&link.source) || attached(&link.target)).then(|| c.id.clone())
            })
            .collect();
        for link in orphaned {
            if self.contains(&link) {
                debug!(link = %link, cell = %id, "removing link to a removed port");
                self.remove_cell_with(&link, RemovalPolicy::RemoveLinks)?;
            }
        }
        Ok(())
    }

    pub fn ports(&self, id: &CellId) -> Result<Vec<PortId>, ModelError> {
        Ok(self.cell(id)?.ports())
    }

    /// Declare `port` on the sub-element `selector`.
    pub fn add_port(&mut self, id: &CellId, selector: &str, port: &PortId) -> Result<(), ModelError> {
        self.set_attr(id, &format!("{selector}/port"), json!(port))
    }

    /// Drop a port declaration, removing the links attached to it.
    pub fn remove_port(&mut self, id: &CellId, port: &PortId) -> Result<(), ModelError> {
        let selectors: Vec<String> = self
            .cell(id)?
            .attrs
            .ports()
            .into_iter()
            .filter(|(_, p)| p == port)
            .map(|(selector, _)| selector)
            .collect();
        for selector in selectors {
            self.remove_attr(id, &format!("{selector}/port"))?;
        }
        Ok(())
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn update_link<T>(
        &mut self,
        id: &CellId,
        property: Property,
        f: impl FnOnce(&mut LinkData) -> Result<T, ModelError>,
    ) -> Result<T, ModelError> {
        let link = self
            .cell_mut(id)?
            .as_link_mut()
            .ok_or_else(|| ModelError::NotALink(id.clone()))?;
        let old = link_snapshot(link, &property);
        let out = f(link)?;
        let new = link_snapshot(link, &property);
        self.publish_change(id, property, old, new);
        Ok(out)
    }

    fn check_endpoint(&self, end: &Endpoint) -> Result<(), ModelError> {
        match end.cell_id() {
            Some(id) => self.cell(id).map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn set_source(&mut self, id: &CellId, source: Endpoint) -> Result<(), ModelError> {
        self.check_endpoint(&source)?;
        self.update_link(id, Property::Source, |l| {
            l.source = source;
            Ok(())
        })
    }

    pub fn set_target(&mut self, id: &CellId, target: Endpoint) -> Result<(), ModelError> {
        self.check_endpoint(&target)?;
        self.update_link(id, Property::Target, |l| {
            l.target = target;
            Ok(())
        })
    }

    pub fn set_vertices(&mut self, id: &CellId, vertices: Vec<Point>) -> Result<(), ModelError> {
        self.update_link(id, Property::Vertices, |l| {
            l.vertices = vertices;
            Ok(())
        })
    }

    /// Insert a vertex before `index`; `index == len` appends.
    pub fn insert_vertex(&mut self, id: &CellId, index: usize, vertex: Point) -> Result<(), ModelError> {
        let link_id = id.clone();
        self.update_link(id, Property::Vertices, |l| {
            if index > l.vertices.len() {
                return Err(ModelError::VertexOutOfRange {
                    link: link_id,
                    index,
                    len: l.vertices.len(),
                });
            }
            l.vertices.insert(index, vertex);
            Ok(())
        })
    }

    pub fn remove_vertex(&mut self, id: &CellId, index: usize) -> Result<Point, ModelError> {
        let link_id = id.clone();
        self.update_link(id, Property::Vertices, |l| {
            if index >= l.vertices.len() {
                return Err(ModelError::VertexOutOfRange {
                    link: link_id,
                    index,
                    len: l.vertices.len(),
                });
            }
            Ok(l.vertices.remove(index))
        })
    }

    pub fn set_vertex(&mut self, id: &CellId, index: usize, vertex: Point) -> Result<(), ModelError> {
        let link_id = id.clone();
        self.update_link(id, Property::Vertices, |l| {
            let len = l.vertices.len();
            let slot = l.vertices.get_mut(index).ok_or(ModelError::VertexOutOfRange {
                link: link_id,
                index,
                len,
            })?;
            *slot = vertex;
            Ok(())
        })
    }

    pub fn set_smooth(&mut self, id: &CellId, smooth: bool) -> Result<(), ModelError> {
        self.update_link(id, Property::Connector, |l| {
            l.smooth = smooth;
            Ok(())
        })
    }

    pub fn set_manhattan(&mut self, id: &CellId, manhattan: bool) -> Result<(), ModelError> {
        self.update_link(id, Property::Router, |l| {
            l.manhattan = manhattan;
            Ok(())
        })
    }

    pub fn add_label(&mut self, id: &CellId, label: Label) -> Result<(), ModelError> {
        self.update_link(id, Property::Labels, |l| {
            l.labels.push(label);
            Ok(())
        })
    }

    pub fn insert_label(&mut self, id: &CellId, index: usize, label: Label) -> Result<(), ModelError> {
        let link_id = id.clone();
        self.update_link(id, Property::Labels, |l| {
            if index > l.labels.len() {
                return Err(ModelError::LabelOutOfRange {
                    link: link_id,
                    index,
                    len: l.labels.len(),
                });
            }
            l.labels.insert(index, label);
            Ok(())
        })
    }

    pub fn remove_label(&mut self, id: &CellId, index: usize) -> Result<Label, ModelError> {
        let link_id = id.clone();
        self.update_link(id, Property::Labels, |l| {
            if index >= l.labels.len() {
                return Err(ModelError::LabelOutOfRange {
                    link: link_id,
                    index,
                    len: l.labels.len(),
                });
            }
            Ok(l.labels.remove(index))
        })
    }

    pub fn set_label_position(
        &mut self,
        id: &CellId,
        index: usize,
        position: LabelPosition,
    ) -> Result<(), ModelError> {
        let link_id = id.clone();
        self.update_link(id, Property::Labels, |l| {
            let len = l.labels.len();
            let label = l.labels.get_mut(index).ok_or(ModelError::LabelOutOfRange {
                link: link_id,
                index,
                len,
            })?;
            label.position = position;
            Ok(())
        })
    }

    // ========================================================================
    // Cloning and subgraphs
    // ========================================================================

    /// Clone the given cells with fresh ids, keyed by the original id.
    ///
    /// Each cell is cloned once however often it is listed. Parent, embeds and
    /// link ends pointing at other cloned cells are rewired to the clones;
    /// parents and embeds outside the set are dropped, link ends outside the
    /// set keep pointing at the originals.
    pub fn clone_cells(&self, ids: &[CellId]) -> Result<IndexMap<CellId, Cell>, ModelError> {
        let mut clones: IndexMap<CellId, Cell> = IndexMap::new();
        for id in ids {
            if clones.contains_key(id) {
                continue;
            }
            let mut clone = self.cell(id)?.clone();
            clone.id = CellId::generate();
            clones.insert(id.clone(), clone);
        }
        let id_map: HashMap<CellId, CellId> = clones
            .iter()
            .map(|(original, clone)| (original.clone(), clone.id.clone()))
            .collect();

        let remap_end = |end: &mut Endpoint| {
            if let Endpoint::Cell { id, .. } = end {
                if let Some(new_id) = id_map.get(id) {
                    *id = new_id.clone();
                }
            }
        };
        for clone in clones.values_mut() {
            clone.parent = clone.parent.as_ref().and_then(|p| id_map.get(p).cloned());
            clone.embeds = clone
                .embeds
                .iter()
                .filter_map(|e| id_map.get(e).cloned())
                .collect();
            if let Some(link) = clone.as_link_mut() {
                remap_end(&mut link.source);
                remap_end(&mut link.target);
            }
        }
        Ok(clones)
    }

    /// Clone a cell with all of its embedded descendants and the links
    /// running between them. The clone of `id` comes first.
    pub fn clone_deep(&self, id: &CellId) -> Result<Vec<Cell>, ModelError> {
        self.cell(id)?;
        let mut members: IndexSet<CellId> = IndexSet::new();
        members.insert(id.clone());
        members.extend(self.embedded_cells(id, Traversal::DepthFirst));
        let internal: Vec<CellId> = self
            .connected_links(id, LinkQuery::all().deep())
            .into_iter()
            .filter(|l| self.link_within(l, &members))
            .collect();
        members.extend(internal);
        let ids: Vec<CellId> = members.into_iter().collect();
        Ok(self.clone_cells(&ids)?.into_values().collect())
    }

    fn link_within(&self, link: &CellId, members: &IndexSet<CellId>) -> bool {
        self.cells
            .get(link)
            .and_then(Cell::as_link)
            .is_some_and(|l| {
                l.source.cell_id().is_some_and(|s| members.contains(s))
                    && l.target.cell_id().is_some_and(|t| members.contains(t))
            })
    }

    /// The given cells, plus (with `deep`) their embedded descendants, the
    /// cells the selected links connect, and every link between two selected
    /// elements.
    pub fn subgraph(&self, ids: &[CellId], deep: bool) -> Result<Vec<CellId>, ModelError> {
        let mut members: IndexSet<CellId> = IndexSet::new();
        for id in ids {
            let cell = self.cell(id)?;
            members.insert(id.clone());
            if deep {
                members.extend(self.embedded_cells(id, Traversal::DepthFirst));
            }
            if let Some(link) = cell.as_link() {
                members.extend(link.source.cell_id().cloned());
                members.extend(link.target.cell_id().cloned());
            }
        }
        let between: Vec<CellId> = self
            .links()
            .filter(|c| !members.contains(&c.id) && self.link_within(&c.id, &members))
            .map(|c| c.id.clone())
            .collect();
        members.extend(between);
        Ok(members.into_iter().collect())
    }

    /// Clone a subgraph; see [`Graph::subgraph`] and [`Graph::clone_cells`].
    pub fn clone_subgraph(&self, ids: &[CellId], deep: bool) -> Result<Vec<Cell>, ModelError> {
        let members = self.subgraph(ids, deep)?;
        Ok(self.clone_cells(&members)?.into_values().collect())
    }

    // ========================================================================
    // Spatial queries
    // ========================================================================

    /// Union of the (rotated) element boxes; all elements when `ids` is
    /// `None`.
    pub fn bbox(&self, ids: Option<&[CellId]>) -> Option<Rect> {
        let boxes: Vec<Rect> = match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.cells.get(id)?.as_element())
                .map(ElementGeometry::rotated_bbox)
                .collect(),
            None => self
                .elements()
                .filter_map(Cell::as_element)
                .map(ElementGeometry::rotated_bbox)
                .collect(),
        };
        boxes.into_iter().reduce(|a, b| a.union(&b))
    }

    pub fn find_elements_at_point(&self, p: Point) -> Vec<CellId> {
        self.elements()
            .filter(|c| {
                c.as_element()
                    .is_some_and(|e| e.rotated_bbox().contains_point(p))
            })
            .map(|c| c.id.clone())
            .collect()
    }

    /// Elements overlapping `area`, or lying entirely inside it with
    /// `strict`.
    pub fn find_elements_in_area(&self, area: &Rect, strict: bool) -> Vec<CellId> {
        self.elements()
            .filter(|c| {
                c.as_element().is_some_and(|e| {
                    let bbox = e.rotated_bbox();
                    if strict {
                        area.contains_rect(&bbox)
                    } else {
                        area.intersect(&bbox).is_some()
                    }
                })
            })
            .map(|c| c.id.clone())
            .collect()
    }
}

fn element_snapshot(geometry: &ElementGeometry, property: &Property) -> Value {
    match property {
        Property::Position => to_json(&geometry.position),
        Property::Size => to_json(&geometry.size),
        Property::Angle => json!(geometry.angle),
        _ => Value::Null,
    }
}

fn link_snapshot(link: &LinkData, property: &Property) -> Value {
    match property {
        Property::Source => to_json(&link.source),
        Property::Target => to_json(&link.target),
        Property::Vertices => to_json(&link.vertices),
        Property::Labels => to_json(&link.labels),
        Property::Connector => json!(if link.smooth { "smooth" } else { "normal" }),
        Property::Router => json!(if link.manhattan { "manhattan" } else { "normal" }),
        _ => Value::Null,
    }
}
