//! Spatial queries, node wiring, and the placement rules that keep the
//! grid consistent when an entity lands on an existing wire.

use crate::circuit::{Circuit, CircuitError};
use crate::geom::{Point, Rect};
use crate::id::{Handle, ThingType, TypeMask};
use crate::thing::{ChipData, NodeData, ThingKind};

/// True when `p` lies strictly between axis-colinear endpoints `a` and `b`.
fn edge_crosses(a: Point, b: Point, p: Point) -> bool {
    if a.y == b.y && p.y == a.y {
        let (lo, hi) = (a.x.min(b.x), a.x.max(b.x));
        return lo < p.x && p.x < hi;
    }
    if a.x == b.x && p.x == a.x {
        let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
        return lo < p.y && p.y < hi;
    }
    false
}

impl Circuit {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// First live entity matching `mask` whose bounding box covers `pos`,
    /// in index order.
    pub fn find_at(&self, pos: Point, mask: TypeMask) -> Option<Handle> {
        self.iter(mask)
            .find(|(_, t)| t.bbox().contains(pos))
            .map(|(h, _)| h)
    }

    /// Every live entity matching `mask` whose bounding box intersects
    /// `region`.
    pub fn find_in_rect(&self, region: Rect, mask: TypeMask) -> Vec<Handle> {
        self.iter(mask)
            .filter(|(_, t)| t.bbox().intersects(&region))
            .map(|(h, _)| h)
            .collect()
    }

    /// First wire whose segment passes through `pos`: endpoints must be
    /// axis-colinear with `pos` strictly between them. Diagonal wires never
    /// cross anything.
    pub fn find_connection_crossing(&self, pos: Point) -> Option<(Handle, Handle)> {
        for (handle, thing) in self.iter(TypeMask::NODE) {
            let node = thing.as_node()?;
            for conn in node.connections {
                let Some(other) = self.resolve(conn) else {
                    continue;
                };
                if edge_crosses(thing.pos, other.pos, pos) {
                    return Some((handle, conn));
                }
            }
        }
        None
    }

    /// True when the wire exists on both sides.
    pub fn connected(&self, a: Handle, b: Handle) -> bool {
        let a_has = self
            .resolve(a)
            .and_then(|t| t.as_node())
            .is_some_and(|n| n.is_connected_to(b));
        let b_has = self
            .resolve(b)
            .and_then(|t| t.as_node())
            .is_some_and(|n| n.is_connected_to(a));
        a_has && b_has
    }

    // -----------------------------------------------------------------------
    // Wiring
    // -----------------------------------------------------------------------

    /// Wire two nodes together, symmetrically. Idempotent; slots holding
    /// dead handles count as free. Neither side is touched unless both have
    /// room.
    pub fn connect(&mut self, a: Handle, b: Handle) -> Result<(), CircuitError> {
        if a == b {
            return Err(CircuitError::SelfConnection);
        }
        let a_data = self
            .resolve(a)
            .and_then(|t| t.as_node())
            .copied()
            .ok_or(CircuitError::NotANode)?;
        let b_data = self
            .resolve(b)
            .and_then(|t| t.as_node())
            .copied()
            .ok_or(CircuitError::NotANode)?;

        let a_slot = if a_data.is_connected_to(b) {
            None
        } else {
            Some(
                (0..4)
                    .find(|&i| self.resolve(a_data.connections[i]).is_none())
                    .ok_or(CircuitError::ConnectionLimit)?,
            )
        };
        let b_slot = if b_data.is_connected_to(a) {
            None
        } else {
            Some(
                (0..4)
                    .find(|&i| self.resolve(b_data.connections[i]).is_none())
                    .ok_or(CircuitError::ConnectionLimit)?,
            )
        };

        if let Some(slot) = a_slot {
            if let Some(node) = self.resolve_mut(a).and_then(|t| t.as_node_mut()) {
                node.connections[slot] = b;
            }
        }
        if let Some(slot) = b_slot {
            if let Some(node) = self.resolve_mut(b).and_then(|t| t.as_node_mut()) {
                node.connections[slot] = a;
            }
        }

        self.mark_dirty(a);
        self.mark_dirty(b);
        Ok(())
    }

    /// Remove the wire between two nodes, both sides. Idempotent; stale
    /// handles fail soft.
    pub fn disconnect(&mut self, a: Handle, b: Handle) {
        let mut removed = false;
        if let Some(node) = self.resolve_mut(a).and_then(|t| t.as_node_mut()) {
            for slot in &mut node.connections {
                if *slot == b {
                    *slot = Handle::NULL;
                    removed = true;
                }
            }
        }
        if let Some(node) = self.resolve_mut(b).and_then(|t| t.as_node_mut()) {
            for slot in &mut node.connections {
                if *slot == a {
                    *slot = Handle::NULL;
                    removed = true;
                }
            }
        }
        if removed {
            self.mark_dirty(a);
            self.mark_dirty(b);
        }
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place a node at `pos`. Placing onto an existing node returns it;
    /// placing onto a wire splits the wire through the new node.
    pub fn place_node(&mut self, pos: Point) -> Result<Handle, CircuitError> {
        if let Some(existing) = self.find_at(pos, TypeMask::NODE) {
            return Ok(existing);
        }
        if self.find_at(pos, TypeMask::ALL).is_some() {
            return Err(CircuitError::Occupied);
        }
        let crossing = self.find_connection_crossing(pos);
        let node = self.create(ThingKind::Node(NodeData::default()), pos)?;
        if let Some((a, b)) = crossing {
            self.disconnect(a, b);
            self.connect(a, node)?;
            self.connect(b, node)?;
        }
        Ok(node)
    }

    pub fn place_inverter(&mut self, pos: Point) -> Result<Handle, CircuitError> {
        self.place_gate(pos, ThingKind::Inverter)
    }

    pub fn place_delay(&mut self, pos: Point) -> Result<Handle, CircuitError> {
        self.place_gate(pos, ThingKind::Delay)
    }

    /// Place a gate at `pos`. A crossed horizontal wire is rebuilt to run
    /// through the gate: nodes flanking it to the west and east pick up the
    /// severed endpoints, so the gate sits inline. A crossed vertical wire
    /// is simply removed (gates conduct west-to-east only).
    fn place_gate(&mut self, pos: Point, kind: ThingKind) -> Result<Handle, CircuitError> {
        if self.find_at(pos, TypeMask::ALL).is_some() {
            return Err(CircuitError::Occupied);
        }
        if let Some((a, b)) = self.find_connection_crossing(pos) {
            self.disconnect(a, b);
            let pa = self.resolve(a).map(|t| t.pos);
            let pb = self.resolve(b).map(|t| t.pos);
            if let (Some(pa), Some(pb)) = (pa, pb) {
                if pa.y == pb.y {
                    let (west_end, east_end) = if pa.x < pb.x { (a, b) } else { (b, a) };
                    if let Some(flank) = self.flank_node(pos.west())? {
                        if flank != west_end {
                            self.connect(flank, west_end)?;
                        }
                    }
                    if let Some(flank) = self.flank_node(pos.east())? {
                        if flank != east_end {
                            self.connect(flank, east_end)?;
                        }
                    }
                }
            }
        }
        self.create(kind, pos)
    }

    /// Place a chip at `pos`. Its 3x2 footprint must be clear; the child
    /// circuit starts empty and grows its own exports.
    pub fn place_chip(&mut self, pos: Point) -> Result<Handle, CircuitError> {
        let footprint = Rect::from_corners(pos, pos + Point { x: 2, y: 1 });
        if !self.find_in_rect(footprint, TypeMask::ALL).is_empty() {
            return Err(CircuitError::Occupied);
        }
        self.create(
            ThingKind::Chip(ChipData::new(Circuit::new("CHIP"))),
            pos,
        )
    }

    /// Node at `pos` for a gate to conduct through: reuse one, create one,
    /// or give up if the cell holds something else.
    fn flank_node(&mut self, pos: Point) -> Result<Option<Handle>, CircuitError> {
        if let Some(node) = self.find_at(pos, TypeMask::NODE) {
            return Ok(Some(node));
        }
        if self.find_at(pos, TypeMask::ALL).is_some() {
            return Ok(None);
        }
        self.create(ThingKind::Node(NodeData::default()), pos)
            .map(Some)
    }
}

// ====== Tests ======

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, rect};

    fn circuit() -> Circuit {
        Circuit::new("test")
    }

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let mut c = circuit();
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(4, 0)).unwrap();
        c.connect(a, b).unwrap();
        c.connect(a, b).unwrap();
        assert!(c.connected(a, b));
        assert!(c.connected(b, a));
        let slots = c.resolve(a).unwrap().as_node().unwrap().connection_count();
        assert_eq!(slots, 1);
    }

    #[test]
    fn connect_rejects_self_and_respects_capacity() {
        let mut c = circuit();
        let hub = c.place_node(point(0, 0)).unwrap();
        assert!(matches!(
            c.connect(hub, hub),
            Err(CircuitError::SelfConnection)
        ));
        for i in 0..4 {
            let spoke = c.place_node(point(2 + i, 2)).unwrap();
            c.connect(hub, spoke).unwrap();
        }
        let extra = c.place_node(point(0, 5)).unwrap();
        assert!(matches!(
            c.connect(hub, extra),
            Err(CircuitError::ConnectionLimit)
        ));
        // The failed connect must not leave a one-sided edge.
        assert!(!c.resolve(extra).unwrap().as_node().unwrap().is_connected_to(hub));
    }

    #[test]
    fn disconnect_removes_both_sides() {
        let mut c = circuit();
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(3, 0)).unwrap();
        c.connect(a, b).unwrap();
        c.disconnect(a, b);
        assert!(!c.connected(a, b));
        c.disconnect(a, b); // idempotent
        assert!(!c.connected(a, b));
    }

    #[test]
    fn dead_connection_slot_is_reusable() {
        let mut c = circuit();
        let hub = c.place_node(point(0, 0)).unwrap();
        let spokes: Vec<_> = (0..4)
            .map(|i| {
                let s = c.place_node(point(2 + i, 2)).unwrap();
                c.connect(hub, s).unwrap();
                s
            })
            .collect();
        c.delete(spokes[1]);
        let fresh = c.place_node(point(0, 5)).unwrap();
        c.connect(hub, fresh).unwrap();
        assert!(c.connected(hub, fresh));
    }

    #[test]
    fn node_on_wire_splits_it() {
        let mut c = circuit();
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(6, 0)).unwrap();
        c.connect(a, b).unwrap();
        let mid = c.place_node(point(3, 0)).unwrap();
        assert!(!c.connected(a, b));
        assert!(c.connected(a, mid));
        assert!(c.connected(mid, b));
    }

    #[test]
    fn node_beside_wire_does_not_split_it() {
        let mut c = circuit();
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(6, 0)).unwrap();
        c.connect(a, b).unwrap();
        c.place_node(point(3, 1)).unwrap();
        assert!(c.connected(a, b));
    }

    #[test]
    fn gate_on_horizontal_wire_runs_inline() {
        let mut c = circuit();
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(6, 0)).unwrap();
        c.connect(a, b).unwrap();
        c.place_inverter(point(3, 0)).unwrap();
        assert!(!c.connected(a, b));
        let west = c.find_at(point(2, 0), TypeMask::NODE).unwrap();
        let east = c.find_at(point(4, 0), TypeMask::NODE).unwrap();
        assert!(c.connected(a, west));
        assert!(c.connected(east, b));
    }

    #[test]
    fn gate_on_vertical_wire_severs_it() {
        let mut c = circuit();
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(0, 6)).unwrap();
        c.connect(a, b).unwrap();
        c.place_delay(point(0, 3)).unwrap();
        assert!(!c.connected(a, b));
        // No flanking nodes for a vertical cut.
        assert!(c.find_at(point(-1, 3), TypeMask::NODE).is_none());
        assert!(c.find_at(point(1, 3), TypeMask::NODE).is_none());
    }

    #[test]
    fn placement_refuses_occupied_cells() {
        let mut c = circuit();
        c.place_inverter(point(0, 0)).unwrap();
        assert!(matches!(
            c.place_node(point(0, 0)),
            Err(CircuitError::Occupied)
        ));
        assert!(matches!(
            c.place_inverter(point(0, 0)),
            Err(CircuitError::Occupied)
        ));
        // Re-placing a node on a node hands back the original.
        let n = c.place_node(point(5, 5)).unwrap();
        assert_eq!(c.place_node(point(5, 5)).unwrap(), n);
    }

    #[test]
    fn chip_footprint_blocks_placement() {
        let mut c = circuit();
        c.place_chip(point(0, 0)).unwrap();
        assert!(matches!(
            c.place_node(point(2, 1)),
            Err(CircuitError::Occupied)
        ));
        assert!(matches!(
            c.place_chip(point(1, 0)),
            Err(CircuitError::Occupied)
        ));
        c.place_node(point(3, 0)).unwrap();
    }

    #[test]
    fn find_in_rect_uses_bounding_boxes() {
        let mut c = circuit();
        c.place_chip(point(0, 0)).unwrap();
        let hits = c.find_in_rect(rect(point(2, 0), point(5, 0)), TypeMask::ALL);
        assert_eq!(hits.len(), 1);
        let misses = c.find_in_rect(rect(point(4, 0), point(5, 0)), TypeMask::ALL);
        assert!(misses.is_empty());
    }
}
