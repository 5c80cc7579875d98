//! The circuit container: one entity arena, its public-node table, and the
//! whole-circuit operations (create/delete, merge, copy, shift).
//!
//! A `Circuit` is owned by whoever holds it -- the top-level editor, the
//! clipboard, or a [`Chip`](crate::thing::ChipData) -- and nested circuits
//! form a tree through chip ownership. Cross-circuit references are always
//! root-relative chip-handle paths, never stored pointers.

use crate::arena::{Arena, ArenaFull};
use crate::geom::{Point, Rect};
use crate::id::{Handle, ThingType, TypeMask};
use crate::thing::{NodeLink, Thing, ThingKind};
use crate::tic::Scheduler;
use serde::{Deserialize, Serialize};

/// Size of the public-node export table.
pub const MAX_PUBLIC_NODES: usize = 32;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Recoverable failures surfaced by circuit editing operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CircuitError {
    #[error(transparent)]
    ArenaFull(#[from] ArenaFull),
    #[error("node already holds 4 connections")]
    ConnectionLimit,
    #[error("cannot connect a node to itself")]
    SelfConnection,
    #[error("cell is already occupied")]
    Occupied,
    #[error("public-node table is full ({MAX_PUBLIC_NODES} slots)")]
    PublicTableFull,
    #[error("handle does not resolve to a live node")]
    NotANode,
}

fn initial_tic() -> u64 {
    1
}

// ---------------------------------------------------------------------------
// Circuit
// ---------------------------------------------------------------------------

/// Top-level owner of one entity arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    pub name: String,
    pub(crate) things: Arena,
    /// Ordered export table. A slot is free iff its handle does not resolve.
    pub(crate) public_nodes: [Handle; MAX_PUBLIC_NODES],

    // Scheduler and counters are transient: snapshots persist settled
    // topology only, and every entity is re-marked dirty on load.
    #[serde(skip)]
    pub(crate) sched: Scheduler,
    /// The tic currently (or next) being executed. Children are synced from
    /// the root each tic; starts at 1 so fresh entities (`last_tic == 0`)
    /// are never mistaken for already-evaluated ones.
    #[serde(skip, default = "initial_tic")]
    pub(crate) tic: u64,
    /// Flood-fill traversal epoch counter. Only the root circuit's counter
    /// is consulted; stamps are zeroed whenever entities change owners
    /// (copy/merge/load) so they cannot collide across circuit lifetimes.
    #[serde(skip)]
    pub(crate) epoch_counter: u64,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            things: Arena::new(),
            public_nodes: [Handle::NULL; MAX_PUBLIC_NODES],
            sched: Scheduler::default(),
            tic: initial_tic(),
            epoch_counter: 0,
        }
    }

    /// A circuit whose arena refuses to grow past `limit` slots.
    pub fn with_arena_limit(name: impl Into<String>, limit: u32) -> Self {
        Self {
            things: Arena::with_capacity_limit(limit),
            ..Self::new(name)
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn resolve(&self, handle: Handle) -> Option<&Thing> {
        self.things.resolve(handle)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut Thing> {
        self.things.resolve_mut(handle)
    }

    /// Live entities matching `mask`, in index order.
    pub fn iter(&self, mask: TypeMask) -> impl Iterator<Item = (Handle, &Thing)> {
        self.things.iter(mask)
    }

    pub fn live_count(&self) -> usize {
        self.things.live_count()
    }

    pub fn generation(&self) -> u32 {
        self.things.generation()
    }

    /// The tic number the next `run_tic` will execute.
    pub fn current_tic(&self) -> u64 {
        self.tic
    }

    pub fn public_nodes(&self) -> &[Handle; MAX_PUBLIC_NODES] {
        &self.public_nodes
    }

    /// Resolved state of the public node at `slot`, if one is exported.
    pub fn public_state(&self, slot: usize) -> Option<bool> {
        let handle = *self.public_nodes.get(slot)?;
        self.resolve(handle).map(|t| t.active)
    }

    /// Borrow the child circuit of a chip entity.
    pub fn chip_circuit(&self, chip: Handle) -> Option<&Circuit> {
        Some(self.resolve(chip)?.as_chip()?.circuit.as_ref())
    }

    pub fn chip_circuit_mut(&mut self, chip: Handle) -> Option<&mut Circuit> {
        Some(self.resolve_mut(chip)?.as_chip_mut()?.circuit.as_mut())
    }

    /// Walk a root-relative chip-handle path down to the circuit it names.
    pub(crate) fn circuit_at_path_mut(&mut self, path: &[Handle]) -> Option<&mut Circuit> {
        let mut circ = self;
        for &chip in path {
            circ = circ.things.resolve_mut(chip)?.as_chip_mut()?.circuit.as_mut();
        }
        Some(circ)
    }

    /// Next flood-fill epoch. Called on the root circuit only.
    pub(crate) fn next_epoch(&mut self) -> u64 {
        self.epoch_counter += 1;
        self.epoch_counter
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Arena factory: allocate, stamp the next generation, mark dirty.
    /// New entities must be evaluated before being trusted.
    pub fn create(&mut self, kind: ThingKind, pos: Point) -> Result<Handle, CircuitError> {
        let is_node = matches!(kind, ThingKind::Node(_));
        let handle = self.things.create(kind, pos)?;
        self.mark_dirty(handle);
        if is_node {
            // A gate immediately west now has a target to drive.
            if let Some(gate) = self.find_at(pos.west(), TypeMask::GATE) {
                self.mark_dirty(gate);
            }
        }
        Ok(handle)
    }

    /// Run the entity's teardown hook, then free the slot. Stale handles
    /// fail soft.
    pub fn delete(&mut self, handle: Handle) {
        let Some(ty) = self.resolve(handle).map(|t| t.thing_type()) else {
            return;
        };
        match ty {
            ThingType::Node => self.teardown_node(handle),
            ThingType::Inverter | ThingType::Delay => self.teardown_gate(handle),
            ThingType::Chip => self.teardown_chip(handle),
        }
        self.things.remove(handle);
    }

    fn teardown_node(&mut self, handle: Handle) {
        let Some(thing) = self.resolve(handle) else {
            return;
        };
        let pos = thing.pos;
        let Some(data) = thing.as_node().copied() else {
            return;
        };

        // Sever and re-dirty the former neighbors; their batch changed.
        for conn in data.connections {
            if conn.is_null() {
                continue;
            }
            if let Some(other) = self.resolve_mut(conn).and_then(|t| t.as_node_mut()) {
                for slot in &mut other.connections {
                    if *slot == handle {
                        *slot = Handle::NULL;
                    }
                }
            }
            self.mark_dirty(conn);
        }

        // Withdraw from the export table.
        if matches!(data.link, NodeLink::Public { .. }) {
            for entry in &mut self.public_nodes {
                if *entry == handle {
                    *entry = Handle::NULL;
                }
            }
        }

        // Whatever this node was sourcing re-reads a floating input.
        self.mark_dirty_at(pos.east());
    }

    fn teardown_gate(&mut self, handle: Handle) {
        let Some(thing) = self.resolve(handle) else {
            return;
        };
        let east = thing.pos.east();
        self.mark_dirty_at(east);
    }

    fn teardown_chip(&mut self, handle: Handle) {
        let Some(chip) = self.resolve(handle).and_then(|t| t.as_chip()) else {
            return;
        };
        // Remove every bridge node the chip introduced on the parent side.
        // The child circuit is dropped with the slot.
        let bridges = chip.bridges;
        for bridge in bridges {
            self.delete(bridge);
        }
    }

    // -----------------------------------------------------------------------
    // Public-node export
    // -----------------------------------------------------------------------

    /// Export or withdraw a node from the public table. Bridge nodes
    /// (chip-linked) cannot be exported.
    pub fn toggle_public(&mut self, node: Handle) -> Result<(), CircuitError> {
        let link = self
            .resolve(node)
            .and_then(|t| t.as_node())
            .map(|n| n.link)
            .ok_or(CircuitError::NotANode)?;

        match link {
            NodeLink::Chip { .. } => return Ok(()),
            NodeLink::Public { .. } => {
                for entry in &mut self.public_nodes {
                    if *entry == node {
                        *entry = Handle::NULL;
                    }
                }
                if let Some(data) = self.resolve_mut(node).and_then(|t| t.as_node_mut()) {
                    data.link = NodeLink::None;
                }
            }
            NodeLink::None => {
                let free = (0..MAX_PUBLIC_NODES)
                    .find(|&i| self.resolve(self.public_nodes[i]).is_none())
                    .ok_or(CircuitError::PublicTableFull)?;
                self.public_nodes[free] = node;
                if let Some(data) = self.resolve_mut(node).and_then(|t| t.as_node_mut()) {
                    data.link = NodeLink::Public {
                        bridge: Handle::NULL,
                    };
                }
            }
        }

        self.mark_dirty(node);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Whole-circuit operations
    // -----------------------------------------------------------------------

    /// Translate every entity. Child circuits use local coordinates and are
    /// unaffected; bridge positions follow their chip on the next update.
    pub fn shift(&mut self, amount: Point) {
        for (_, thing) in self.things.iter_mut() {
            thing.pos = thing.pos + amount;
        }
    }

    /// Overwrite this circuit with a deep copy of `other`. Chips clone their
    /// child circuits recursively; scheduler state is not copied and every
    /// copied entity is marked dirty.
    pub fn copy_from(&mut self, other: &Circuit) {
        *self = other.clone();
        self.normalize_transient();
    }

    /// Like [`copy_from`](Circuit::copy_from), culled to entities whose
    /// position lies inside `region`.
    pub fn copy_rect(&mut self, other: &Circuit, region: Rect) {
        self.copy_from(other);
        for handle in self.things.handles(TypeMask::ALL) {
            let keep = self
                .resolve(handle)
                .is_some_and(|t| region.contains(t.pos));
            if !keep {
                self.delete(handle);
            }
        }
    }

    /// Reset scheduler/traversal state and mark every entity dirty,
    /// recursively through chip children. Used after deep copies and loads.
    pub(crate) fn normalize_transient(&mut self) {
        self.sched = Scheduler::default();
        self.tic = initial_tic();
        self.epoch_counter = 0;
        for (_, thing) in self.things.iter_mut() {
            thing.dirty = false;
            thing.last_tic = 0;
            thing.epoch = 0;
        }
        for handle in self.things.handles(TypeMask::ALL) {
            self.mark_dirty(handle);
        }
        for chip in self.things.handles(TypeMask::CHIP) {
            if let Some(child) = self.chip_circuit_mut(chip) {
                child.normalize_transient();
            }
        }
    }

    /// Append `other`'s entities after this circuit's slot range, remapping
    /// every copied handle by the index offset, then fuse entities that
    /// landed exactly on an older entity of the same type.
    ///
    /// Fusing rewrites *all* references to a discarded duplicate onto the
    /// kept entity, so connection symmetry survives the merge. Merging a
    /// circuit with an exact duplicate of itself leaves the entity count
    /// unchanged.
    pub fn merge(&mut self, other: &Circuit) {
        let offset = self.things.append_from(&other.things);
        let shift = |h: Handle| {
            if h.is_null() {
                h
            } else {
                Handle {
                    index: h.index + offset,
                    generation: h.generation,
                }
            }
        };

        let appended: Vec<Handle> = self
            .things
            .handles(TypeMask::ALL)
            .into_iter()
            .filter(|h| h.index >= offset)
            .collect();

        // Remap intra-circuit handles on the appended range and clear
        // traversal state carried over from the source circuit.
        for &handle in &appended {
            let Some(thing) = self.things.resolve_mut(handle) else {
                continue;
            };
            thing.dirty = false;
            thing.last_tic = 0;
            thing.epoch = 0;
            match &mut thing.kind {
                ThingKind::Node(node) => {
                    for conn in &mut node.connections {
                        *conn = shift(*conn);
                    }
                    node.link = match node.link {
                        // The source's parent is not part of this merge; a
                        // hosting chip's update re-links exported nodes.
                        NodeLink::Public { .. } => NodeLink::Public {
                            bridge: Handle::NULL,
                        },
                        NodeLink::Chip { chip, target } => NodeLink::Chip {
                            chip: shift(chip),
                            target,
                        },
                        NodeLink::None => NodeLink::None,
                    };
                }
                ThingKind::Chip(chip) => {
                    for bridge in &mut chip.bridges {
                        *bridge = shift(*bridge);
                    }
                    // The child's exported nodes point back into this (the
                    // parent) arena and must follow the shift.
                    for (_, child_thing) in chip.circuit.things.iter_mut() {
                        if let Some(node) = child_thing.as_node_mut() {
                            if let NodeLink::Public { bridge } = node.link {
                                node.link = NodeLink::Public {
                                    bridge: shift(bridge),
                                };
                            }
                        }
                    }
                }
                ThingKind::Inverter | ThingKind::Delay => {}
            }
        }

        // Appended chip children carry traversal stamps and scheduler state
        // from their previous root; reset them and mark their contents
        // dirty like any other arrival.
        for &handle in &appended {
            if let Some(child) = self.chip_circuit_mut(handle) {
                child.normalize_transient();
            }
        }

        // Concatenate export tables into free slots. Overflow entries are
        // dropped; `validation::validate` reports the resulting unlinked
        // public nodes.
        for entry in other.public_nodes {
            if other.resolve(entry).is_none() {
                continue;
            }
            let shifted = shift(entry);
            if let Some(free) = (0..MAX_PUBLIC_NODES)
                .find(|&i| self.resolve(self.public_nodes[i]).is_none())
            {
                self.public_nodes[free] = shifted;
            }
        }

        // Fuse appended entities that coincide with an older entity of the
        // same type. Ascending index order keeps fusion chains impossible:
        // an earlier appended duplicate is already gone when a later one
        // searches for its keeper.
        let mut fused: Vec<(Handle, Handle)> = Vec::new();
        for &handle in &appended {
            let Some(thing) = self.resolve(handle) else {
                continue;
            };
            let ty = thing.thing_type();
            let bbox = thing.bbox();
            let keeper = self
                .things
                .iter(TypeMask(ty as u8))
                .find(|(kh, kt)| kh.index < handle.index && kt.bbox() == bbox)
                .map(|(kh, _)| kh);
            let Some(keeper) = keeper else {
                continue;
            };

            if ty == ThingType::Node {
                self.fuse_node_connections(keeper, handle);
            }
            fused.push((handle, keeper));
            self.things.remove(handle);
        }

        // Rewrite every reference to a discarded duplicate.
        if !fused.is_empty() {
            let map = |h: Handle| {
                fused
                    .iter()
                    .find(|(dup, _)| *dup == h)
                    .map(|(_, keep)| *keep)
                    .unwrap_or(h)
            };
            for (handle, thing) in self.things.iter_mut() {
                match &mut thing.kind {
                    ThingKind::Node(node) => {
                        let mut seen: [Handle; 4] = [Handle::NULL; 4];
                        for (i, conn) in node.connections.iter_mut().enumerate() {
                            let mapped = map(*conn);
                            // Drop self-references and duplicate edges the
                            // rewrite may have produced.
                            if mapped == handle || seen[..i].contains(&mapped) {
                                *conn = Handle::NULL;
                            } else {
                                *conn = mapped;
                                seen[i] = mapped;
                            }
                        }
                    }
                    ThingKind::Chip(chip) => {
                        for bridge in &mut chip.bridges {
                            *bridge = map(*bridge);
                        }
                    }
                    ThingKind::Inverter | ThingKind::Delay => {}
                }
            }
            let mut seen: Vec<Handle> = Vec::new();
            for entry in &mut self.public_nodes {
                let mapped = map(*entry);
                if !mapped.is_null() && seen.contains(&mapped) {
                    *entry = Handle::NULL;
                } else {
                    *entry = mapped;
                    seen.push(mapped);
                }
            }
        }

        // Everything that arrived (or absorbed an arrival) re-evaluates.
        for &handle in &appended {
            self.mark_dirty(handle);
        }
        for &(_, keeper) in &fused {
            self.mark_dirty(keeper);
        }
    }

    /// Node merge hook: union the duplicate's connection list into the
    /// keeper's free slots.
    fn fuse_node_connections(&mut self, keeper: Handle, duplicate: Handle) {
        let Some(dup_data) = self.resolve(duplicate).and_then(|t| t.as_node()).copied() else {
            return;
        };
        let Some(keep_data) = self.resolve(keeper).and_then(|t| t.as_node()).copied() else {
            return;
        };

        let mut merged = keep_data.connections;
        for conn in dup_data.connections {
            if conn.is_null() || conn == keeper || merged.contains(&conn) {
                continue;
            }
            if self.resolve(conn).is_none() {
                continue;
            }
            // First slot not holding a live connection.
            if let Some(free) = (0..4).find(|&i| self.resolve(merged[i]).is_none()) {
                merged[free] = conn;
            }
        }
        if let Some(node) = self.resolve_mut(keeper).and_then(|t| t.as_node_mut()) {
            node.connections = merged;
        }
    }
}
