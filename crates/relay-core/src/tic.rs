//! Dirty-entity scheduling and the tic driver.
//!
//! Each circuit owns two stacks in a ping-pong arrangement: the current
//! stack drains during the tic, deferred work accumulates on the other, and
//! they swap when the tic ends. Re-dirtying an entity that already ran this
//! tic defers it, which is what lets cyclic topologies (an odd inverter
//! ring) advance one step per tic instead of spinning forever inside one.
//!
//! Drain order is arrival order: entities enter at the tail and leave from
//! the head, so combinational updates ripple eastward within a single tic
//! when placement follows signal flow. Delays are the exception both ways:
//! they always defer to the next tic and enter at its head, sampling their
//! input before that tic's combinational churn can touch it. That is the
//! whole of their one-tick-lag contract.

use std::collections::VecDeque;

use crate::id::{Handle, ThingType, TypeMask};
use crate::power;
use crate::{chip, circuit::Circuit};

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub(crate) struct Scheduler {
    stacks: [VecDeque<Handle>; 2],
    current: usize,
}

impl Scheduler {
    pub(crate) fn push_current(&mut self, handle: Handle) {
        self.stacks[self.current].push_back(handle);
    }

    pub(crate) fn push_next(&mut self, handle: Handle) {
        self.stacks[1 - self.current].push_back(handle);
    }

    /// Head of the deferred stack: runs before anything else next tic.
    pub(crate) fn push_next_front(&mut self, handle: Handle) {
        self.stacks[1 - self.current].push_front(handle);
    }

    pub(crate) fn pop_current(&mut self) -> Option<Handle> {
        self.stacks[self.current].pop_front()
    }

    pub(crate) fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.stacks[0].is_empty() && self.stacks[1].is_empty()
    }
}

// ---------------------------------------------------------------------------
// Circuit-level scheduling
// ---------------------------------------------------------------------------

impl Circuit {
    /// Queue an entity for re-evaluation. Already-dirty entities and stale
    /// handles are ignored. Entities that already ran this tic go on the
    /// next stack; delays always do, at its head.
    pub fn mark_dirty(&mut self, handle: Handle) {
        let tic = self.tic;
        let placement = {
            let Some(thing) = self.things.resolve_mut(handle) else {
                return;
            };
            if thing.dirty {
                return;
            }
            thing.dirty = true;
            match thing.thing_type() {
                ThingType::Delay => Placement::NextFront,
                _ if thing.last_tic == tic => Placement::Next,
                _ => Placement::Current,
            }
        };
        match placement {
            Placement::Current => self.sched.push_current(handle),
            Placement::Next => self.sched.push_next(handle),
            Placement::NextFront => self.sched.push_next_front(handle),
        }
    }

    /// Dirty whatever entity occupies `pos`, if any.
    pub fn mark_dirty_at(&mut self, pos: crate::geom::Point) {
        if let Some(handle) = self.find_at(pos, TypeMask::ALL) {
            self.mark_dirty(handle);
        }
    }

    /// True when no work is pending here or in any nested chip circuit.
    pub fn is_quiescent(&self) -> bool {
        self.sched.is_idle()
            && self
                .iter(TypeMask::CHIP)
                .filter_map(|(_, t)| t.as_chip())
                .all(|chip| chip.circuit.is_quiescent())
    }

    /// Execute one tic of the whole circuit tree. Must be called on the
    /// root circuit: chip bridges are reconciled and child tic counters
    /// synced first, then every circuit drains its current stack in
    /// pre-order (parents before children), then the stacks swap and the
    /// tic count advances everywhere.
    pub fn run_tic(&mut self) {
        let tic = self.tic;
        chip::sync_and_update(self, tic);
        let mut path = Vec::new();
        drain(self, &mut path, tic);
        finish(self);
    }

    /// Drive the circuit until it settles or `max_tics` elapse. Returns the
    /// number of tics executed, or `None` if the circuit is still churning
    /// (cyclic topologies never settle).
    pub fn settle(&mut self, max_tics: usize) -> Option<usize> {
        for ran in 0..=max_tics {
            if self.is_quiescent() {
                return Some(ran);
            }
            if ran == max_tics {
                break;
            }
            self.run_tic();
        }
        None
    }

    /// Evaluate a single entity from the root's current stack, for stepwise
    /// inspection. Returns `false` when the stack is exhausted, in which
    /// case the stacks swap and the tic advances. Chip reconciliation does
    /// not run here; nested circuits are driven by `run_tic` only.
    pub fn subtic(&mut self) -> bool {
        let tic = self.tic;
        loop {
            let Some(handle) = self.sched.pop_current() else {
                finish(self);
                return false;
            };
            let ty = {
                let Some(thing) = self.things.resolve_mut(handle) else {
                    continue;
                };
                thing.dirty = false;
                thing.last_tic = tic;
                thing.thing_type()
            };
            clean_one(self, &mut Vec::new(), handle, ty);
            return true;
        }
    }
}

enum Placement {
    Current,
    Next,
    NextFront,
}

// ---------------------------------------------------------------------------
// Drain
// ---------------------------------------------------------------------------

/// Drain the circuit at `path`, then its chip children in index order.
/// Work a clean pushes onto an already-drained ancestor stays for the next
/// tic.
fn drain(root: &mut Circuit, path: &mut Vec<Handle>, tic: u64) {
    loop {
        let (handle, ty) = {
            let Some(circ) = root.circuit_at_path_mut(path) else {
                return;
            };
            let Some(handle) = circ.sched.pop_current() else {
                break;
            };
            let Some(thing) = circ.things.resolve_mut(handle) else {
                continue;
            };
            thing.dirty = false;
            thing.last_tic = tic;
            (handle, thing.thing_type())
        };
        clean_one(root, path, handle, ty);
    }

    let chips = root
        .circuit_at_path_mut(path)
        .map(|c| c.things.handles(TypeMask::CHIP))
        .unwrap_or_default();
    for chip in chips {
        path.push(chip);
        drain(root, path, tic);
        path.pop();
    }
}

fn clean_one(root: &mut Circuit, path: &mut Vec<Handle>, handle: Handle, ty: ThingType) {
    match ty {
        ThingType::Node => power::clean_node(root, path, handle),
        ThingType::Inverter | ThingType::Delay => {
            if let Some(circ) = root.circuit_at_path_mut(path) {
                power::clean_gate(circ, handle, ty);
            }
        }
        // Chips carry no state of their own; bridge reconciliation happens
        // at the start of the tic.
        ThingType::Chip => {}
    }
}

/// Swap stacks and advance the tic counter, recursively.
fn finish(circ: &mut Circuit) {
    circ.sched.swap();
    circ.tic += 1;
    for chip in circ.things.handles(TypeMask::CHIP) {
        if let Some(child) = circ.chip_circuit_mut(chip) {
            finish(child);
        }
    }
}
