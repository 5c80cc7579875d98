//! Read-only projections for rendering and inspection. Callers get plain
//! value types and never hold references into the arena.

use crate::circuit::Circuit;
use crate::geom::Point;
use crate::id::{Handle, ThingType, TypeMask};
use crate::thing::NodeLink;

/// How a node participates in the chip hierarchy, for display tinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    Plain,
    /// Exported from this circuit.
    Public,
    /// Stands in for a nested circuit's export.
    Bridge,
}

#[derive(Debug, Clone, Copy)]
pub struct ThingSnapshot {
    pub handle: Handle,
    pub thing_type: ThingType,
    pub pos: Point,
    pub size: Point,
    pub active: bool,
    pub powered: bool,
    pub link: LinkClass,
}

/// One wire, reported once per pair.
#[derive(Debug, Clone, Copy)]
pub struct WireSnapshot {
    pub a: Handle,
    pub b: Handle,
    pub from: Point,
    pub to: Point,
    pub active: bool,
}

impl Circuit {
    pub fn snapshot_things(&self, mask: TypeMask) -> Vec<ThingSnapshot> {
        self.iter(mask)
            .map(|(handle, thing)| {
                let link = match thing.as_node().map(|n| n.link) {
                    Some(NodeLink::Public { .. }) => LinkClass::Public,
                    Some(NodeLink::Chip { .. }) => LinkClass::Bridge,
                    _ => LinkClass::Plain,
                };
                ThingSnapshot {
                    handle,
                    thing_type: thing.thing_type(),
                    pos: thing.pos,
                    size: thing.size,
                    active: thing.active,
                    powered: thing.powered,
                    link,
                }
            })
            .collect()
    }

    /// Every wire, deduplicated by reporting each pair from its lower-index
    /// endpoint. Slots holding dead handles are skipped.
    pub fn snapshot_wires(&self) -> Vec<WireSnapshot> {
        let mut wires = Vec::new();
        for (handle, thing) in self.iter(TypeMask::NODE) {
            let Some(node) = thing.as_node() else {
                continue;
            };
            for conn in node.connections {
                if conn.index <= handle.index {
                    continue;
                }
                let Some(other) = self.resolve(conn) else {
                    continue;
                };
                wires.push(WireSnapshot {
                    a: handle,
                    b: conn,
                    from: thing.pos,
                    to: other.pos,
                    active: thing.active,
                });
            }
        }
        wires
    }
}

// ====== Tests ======
