//! The entity arena: a growable slot table addressed by generation-checked
//! handles.
//!
//! Slots are reused first-free-first, the table grows on exhaustion unless a
//! hard capacity was configured, and generations come from a monotonic
//! per-arena counter that is never reused. Iteration walks slots in index
//! order, which is creation order modulo slot reuse.

use crate::geom::Point;
use crate::id::{Handle, TypeMask};
use crate::thing::{Thing, ThingKind};
use serde::{Deserialize, Serialize};

/// Returned by [`Arena::create`] when a configured hard capacity is reached.
/// Without a limit the arena grows instead.
#[derive(Debug, Clone, thiserror::Error)]
#[error("entity arena is at its configured capacity ({0} slots)")]
pub struct ArenaFull(pub u32);

/// Growable slot table of [`Thing`] records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    slots: Vec<Option<Thing>>,
    /// Monotonic generation counter. Pre-incremented on create, never reused.
    generation: u32,
    /// Optional hard cap on slot count.
    capacity_limit: Option<u32>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generation: 0,
            capacity_limit: None,
        }
    }

    pub fn with_capacity_limit(limit: u32) -> Self {
        Self {
            capacity_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Current generation counter value.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Raise the generation counter (merge takes the max of both sides).
    /// The counter never decreases.
    pub fn raise_generation(&mut self, to: u32) {
        self.generation = self.generation.max(to);
    }

    /// Number of slots ever allocated (live or free). New entities appended
    /// by a merge land at indices >= this value.
    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Allocate a slot for a new entity, stamping the next generation.
    ///
    /// The caller is responsible for marking the new entity dirty; every
    /// creation path goes through [`Circuit::create`](crate::circuit::Circuit::create),
    /// which does.
    pub fn create(&mut self, kind: ThingKind, pos: Point) -> Result<Handle, ArenaFull> {
        let index = match self.slots.iter().position(|s| s.is_none()) {
            Some(free) => free,
            None => {
                if let Some(limit) = self.capacity_limit {
                    if self.slots.len() as u32 >= limit {
                        return Err(ArenaFull(limit));
                    }
                }
                self.slots.push(None);
                self.slots.len() - 1
            }
        };

        self.generation += 1;
        let handle = Handle {
            index: index as u32,
            generation: self.generation,
        };
        self.slots[index] = Some(Thing::new(self.generation, pos, kind));
        Ok(handle)
    }

    /// Append an already-built record into a fresh slot at the end of the
    /// table, keeping its stamped generation. Used by merge, which remaps
    /// handles by a uniform index offset and therefore must not reuse free
    /// slots in the middle of the table.
    pub fn append_raw(&mut self, thing: Thing) -> Handle {
        let handle = Handle {
            index: self.slots.len() as u32,
            generation: thing.generation,
        };
        self.slots.push(Some(thing));
        handle
    }

    /// Clone `other`'s slot table (free slots included, so slot positions
    /// are preserved) onto the end of this one, and return the index offset
    /// the caller must apply to every handle copied from `other`. The
    /// generation counter rises to the maximum of both so appended stamps
    /// stay unique.
    pub fn append_from(&mut self, other: &Arena) -> u32 {
        let offset = self.slots.len() as u32;
        self.slots.extend(other.slots.iter().cloned());
        self.generation = self.generation.max(other.generation);
        offset
    }

    /// Resolve a handle to its live entity, or `None` for null handles,
    /// freed slots, and generation mismatches after slot reuse.
    pub fn resolve(&self, handle: Handle) -> Option<&Thing> {
        if handle.is_null() {
            return None;
        }
        let thing = self.slots.get(handle.index as usize)?.as_ref()?;
        (thing.generation == handle.generation).then_some(thing)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut Thing> {
        if handle.is_null() {
            return None;
        }
        let thing = self.slots.get_mut(handle.index as usize)?.as_mut()?;
        (thing.generation == handle.generation).then_some(thing)
    }

    /// Resolve two distinct handles mutably at once.
    pub fn resolve_pair_mut(
        &mut self,
        a: Handle,
        b: Handle,
    ) -> Option<(&mut Thing, &mut Thing)> {
        if a.index == b.index {
            return None;
        }
        // Validate both before splitting.
        self.resolve(a)?;
        self.resolve(b)?;
        let (lo, hi, swapped) = if a.index < b.index {
            (a.index as usize, b.index as usize, false)
        } else {
            (b.index as usize, a.index as usize, true)
        };
        let (left, right) = self.slots.split_at_mut(hi);
        let lo_thing = left[lo].as_mut()?;
        let hi_thing = right[0].as_mut()?;
        if swapped {
            Some((hi_thing, lo_thing))
        } else {
            Some((lo_thing, hi_thing))
        }
    }

    /// Free the slot, returning the record so the caller can run its
    /// teardown hook. Stale handles return `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<Thing> {
        self.resolve(handle)?;
        self.slots[handle.index as usize].take()
    }

    /// Iterate live entities matching the mask, in index order.
    pub fn iter(&self, mask: TypeMask) -> impl Iterator<Item = (Handle, &Thing)> {
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            let thing = slot.as_ref()?;
            mask.contains(thing.thing_type()).then_some((
                Handle {
                    index: i as u32,
                    generation: thing.generation,
                },
                thing,
            ))
        })
    }

    /// Collect the handles of live entities matching the mask. For loops
    /// that mutate the arena while walking it.
    pub fn handles(&self, mask: TypeMask) -> Vec<Handle> {
        self.iter(mask).map(|(h, _)| h).collect()
    }

    /// Mutable walk over every live entity.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut Thing)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let thing = slot.as_mut()?;
            Some((
                Handle {
                    index: i as u32,
                    generation: thing.generation,
                },
                thing,
            ))
        })
    }

    /// Drop every entity and reset the table. The generation counter is
    /// reset too: this is only used when a container is overwritten
    /// wholesale (copy/load), which re-stamps every record.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.generation = 0;
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point;
    use crate::id::ThingType;
    use crate::thing::NodeData;

    fn node_kind() -> ThingKind {
        ThingKind::Node(NodeData::default())
    }

    #[test]
    fn create_stamps_increasing_generations() {
        let mut arena = Arena::new();
        let a = arena.create(node_kind(), point(0, 0)).unwrap();
        let b = arena.create(ThingKind::Inverter, point(1, 0)).unwrap();
        assert_eq!(a.generation, 1);
        assert_eq!(b.generation, 2);
        assert!(arena.resolve(a).is_some());
        assert!(arena.resolve(b).is_some());
    }

    #[test]
    fn resolve_after_delete_is_none() {
        let mut arena = Arena::new();
        let a = arena.create(node_kind(), point(0, 0)).unwrap();
        assert!(arena.remove(a).is_some());
        assert!(arena.resolve(a).is_none());
        // Double delete fails soft.
        assert!(arena.remove(a).is_none());
    }

    #[test]
    fn reused_slot_rejects_old_handle() {
        let mut arena = Arena::new();
        let a = arena.create(node_kind(), point(0, 0)).unwrap();
        arena.remove(a);
        let b = arena.create(ThingKind::Delay, point(5, 5)).unwrap();
        // Same slot, different generation.
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(arena.resolve(a).is_none());
        assert_eq!(arena.resolve(b).unwrap().thing_type(), ThingType::Delay);
    }

    #[test]
    fn null_handle_never_resolves() {
        let arena = Arena::new();
        assert!(arena.resolve(Handle::NULL).is_none());
    }

    #[test]
    fn capacity_limit_is_recoverable() {
        let mut arena = Arena::with_capacity_limit(2);
        arena.create(node_kind(), point(0, 0)).unwrap();
        let b = arena.create(node_kind(), point(1, 0)).unwrap();
        assert!(arena.create(node_kind(), point(2, 0)).is_err());
        // Freeing a slot makes room again.
        arena.remove(b);
        assert!(arena.create(node_kind(), point(2, 0)).is_ok());
    }

    #[test]
    fn iteration_filters_by_mask_and_skips_freed() {
        let mut arena = Arena::new();
        let n = arena.create(node_kind(), point(0, 0)).unwrap();
        let i = arena.create(ThingKind::Inverter, point(1, 0)).unwrap();
        arena.create(ThingKind::Delay, point(2, 0)).unwrap();
        arena.remove(i);

        let all: Vec<_> = arena.handles(TypeMask::ALL);
        assert_eq!(all.len(), 2);
        let nodes: Vec<_> = arena.handles(TypeMask::NODE);
        assert_eq!(nodes, vec![n]);
        let gates: Vec<_> = arena.handles(TypeMask::GATE);
        assert_eq!(gates.len(), 1);
    }

    #[test]
    fn iteration_is_index_order() {
        let mut arena = Arena::new();
        let a = arena.create(node_kind(), point(0, 0)).unwrap();
        let b = arena.create(node_kind(), point(1, 0)).unwrap();
        let c = arena.create(node_kind(), point(2, 0)).unwrap();
        arena.remove(b);
        let d = arena.create(node_kind(), point(3, 0)).unwrap();
        // d reused b's slot, so it comes between a and c.
        assert_eq!(arena.handles(TypeMask::NODE), vec![a, d, c]);
    }

    #[test]
    fn resolve_pair_rejects_same_slot() {
        let mut arena = Arena::new();
        let a = arena.create(node_kind(), point(0, 0)).unwrap();
        let b = arena.create(node_kind(), point(1, 0)).unwrap();
        assert!(arena.resolve_pair_mut(a, a).is_none());
        let (ta, tb) = arena.resolve_pair_mut(a, b).unwrap();
        assert_eq!(ta.pos, point(0, 0));
        assert_eq!(tb.pos, point(1, 0));
        // Order is preserved when called with b first.
        let (tb, ta) = arena.resolve_pair_mut(b, a).unwrap();
        assert_eq!(tb.pos, point(1, 0));
        assert_eq!(ta.pos, point(0, 0));
    }
}
