//! Entity records: the common header plus per-type payloads.
//!
//! The four entity kinds form a closed sum. Per-kind behavior (teardown,
//! merge, copy, clean) is dispatched with a `match` where it is invoked --
//! the engine never needs open polymorphism.

use crate::circuit::{Circuit, MAX_PUBLIC_NODES};
use crate::geom::{Point, Rect, point, rect};
use crate::id::{Handle, ThingType};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Node payload
// ---------------------------------------------------------------------------

/// How a node is linked across a circuit boundary, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeLink {
    /// Plain wire junction.
    #[default]
    None,
    /// Exported from this circuit. `bridge` is the parent-side bridge node,
    /// null until a hosting chip's update links it.
    Public { bridge: Handle },
    /// Parent-side bridge for a chip's public node. `chip` lives in this
    /// circuit, `target` is the public node inside the chip's child.
    Chip { chip: Handle, target: Handle },
}

/// Wire-junction payload: up to four neighbors plus the boundary link.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub connections: [Handle; 4],
    pub link: NodeLink,
}

impl NodeData {
    /// Count of non-null connection slots. Callers that need *live*
    /// connections must still resolve each handle.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().filter(|h| !h.is_null()).count()
    }

    pub fn is_connected_to(&self, other: Handle) -> bool {
        self.connections.contains(&other)
    }
}

// ---------------------------------------------------------------------------
// Chip payload
// ---------------------------------------------------------------------------

/// Nested-circuit payload: the exclusively owned child plus the parent-side
/// bridge table, indexed by the child's public-node slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipData {
    pub circuit: Box<Circuit>,
    pub bridges: [Handle; MAX_PUBLIC_NODES],
}

impl ChipData {
    pub fn new(child: Circuit) -> Self {
        Self {
            circuit: Box::new(child),
            bridges: [Handle::NULL; MAX_PUBLIC_NODES],
        }
    }
}

// ---------------------------------------------------------------------------
// Thing
// ---------------------------------------------------------------------------

/// Per-type payload. Inverter and Delay carry no payload beyond the shared
/// header; their whole state is the `active`/`powered` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ThingKind {
    Node(NodeData),
    Inverter,
    Delay,
    Chip(ChipData),
}

/// A type-tagged entity record in a circuit's arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    /// Stamped from the circuit's monotonic counter at creation.
    pub generation: u32,
    pub pos: Point,
    pub size: Point,
    /// Electrical state: a node's wire level, a gate's output level.
    pub active: bool,
    /// Whether this entity drives the node to its east. Only gates ever
    /// power anything; the flag exists on the header so the power resolver
    /// can probe any west neighbor uniformly.
    pub powered: bool,

    // Scheduler and traversal state. Transient: snapshots persist settled
    // topology only, and a loaded circuit starts fully dirty.
    #[serde(skip)]
    pub dirty: bool,
    #[serde(skip)]
    pub last_tic: u64,
    #[serde(skip)]
    pub epoch: u64,

    pub kind: ThingKind,
}

impl Thing {
    pub fn new(generation: u32, pos: Point, kind: ThingKind) -> Self {
        let size = match kind {
            // A fresh chip is a 3x2 block; its height grows with occupied
            // bridge slots (see chip::update_chip).
            ThingKind::Chip(_) => point(3, 2),
            _ => point(1, 1),
        };
        Self {
            generation,
            pos,
            size,
            active: false,
            powered: false,
            dirty: false,
            last_tic: 0,
            epoch: 0,
            kind,
        }
    }

    pub fn thing_type(&self) -> ThingType {
        match self.kind {
            ThingKind::Node(_) => ThingType::Node,
            ThingKind::Inverter => ThingType::Inverter,
            ThingKind::Delay => ThingType::Delay,
            ThingKind::Chip(_) => ThingType::Chip,
        }
    }

    /// Inclusive bounding box on the cell grid.
    pub fn bbox(&self) -> Rect {
        rect(self.pos, self.pos + self.size + point(-1, -1))
    }

    pub fn as_node(&self) -> Option<&NodeData> {
        match &self.kind {
            ThingKind::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut NodeData> {
        match &mut self.kind {
            ThingKind::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_chip(&self) -> Option<&ChipData> {
        match &self.kind {
            ThingKind::Chip(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_chip_mut(&mut self) -> Option<&mut ChipData> {
        match &mut self.kind {
            ThingKind::Chip(c) => Some(c),
            _ => None,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_bbox() {
        let t = Thing::new(1, point(4, -2), ThingKind::Inverter);
        assert_eq!(t.bbox(), rect(point(4, -2), point(4, -2)));
        assert!(t.bbox().contains(point(4, -2)));
        assert!(!t.bbox().contains(point(5, -2)));
    }

    #[test]
    fn chip_bbox_spans_footprint() {
        let t = Thing::new(1, point(0, 0), ThingKind::Chip(ChipData::new(Circuit::new("CHIP"))));
        assert_eq!(t.bbox(), rect(point(0, 0), point(2, 1)));
    }

    #[test]
    fn node_connection_count_skips_null() {
        let mut data = NodeData::default();
        assert_eq!(data.connection_count(), 0);
        data.connections[2] = Handle {
            index: 5,
            generation: 9,
        };
        assert_eq!(data.connection_count(), 1);
        assert!(data.is_connected_to(Handle {
            index: 5,
            generation: 9
        }));
    }

    #[test]
    fn kind_maps_to_type_tag() {
        assert_eq!(
            Thing::new(1, point(0, 0), ThingKind::Node(NodeData::default())).thing_type(),
            ThingType::Node
        );
        assert_eq!(
            Thing::new(1, point(0, 0), ThingKind::Delay).thing_type(),
            ThingType::Delay
        );
    }
}
