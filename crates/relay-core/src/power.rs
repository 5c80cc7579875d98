//! Power propagation.
//!
//! A dirty node re-derives its batch state in two passes over the connected
//! component it belongs to: first a search for any powered source adjacent
//! to the west of a member, then a write of the result to every member.
//! Both passes stamp visited nodes with a traversal epoch drawn from the
//! root circuit, so cyclic wiring terminates and a batch spanning chip
//! boundaries is visited exactly once.
//!
//! All traversal is root-relative: `path` names the chain of chip handles
//! from the root to the circuit currently being walked. Chip links push
//! onto the path, public links pop, and a public link reached with an empty
//! path (a detached child being inspected on its own) simply ends there.

use crate::circuit::Circuit;
use crate::geom::Point;
use crate::id::{Handle, ThingType, TypeMask};
use crate::thing::NodeLink;

/// Node clean hook: flood the node's batch and apply the result.
pub(crate) fn clean_node(root: &mut Circuit, path: &[Handle], node: Handle) {
    let epoch = root.next_epoch();
    let mut walk = path.to_vec();
    let powered = contains_power(root, &mut walk, node, epoch);

    let epoch = root.next_epoch();
    let mut walk = path.to_vec();
    set_state(root, &mut walk, node, powered, epoch);
}

/// Search pass: does any node in this batch sit east of a powered entity?
fn contains_power(root: &mut Circuit, path: &mut Vec<Handle>, node: Handle, epoch: u64) -> bool {
    let data = {
        let Some(circ) = root.circuit_at_path_mut(path) else {
            return false;
        };
        let Some(thing) = circ.things.resolve_mut(node) else {
            return false;
        };
        if thing.epoch == epoch {
            return false;
        }
        thing.epoch = epoch;
        let pos = thing.pos;
        let Some(data) = thing.as_node().copied() else {
            return false;
        };
        if west_is_powered(circ, pos) {
            return true;
        }
        data
    };

    for conn in data.connections {
        if conn.is_null() {
            continue;
        }
        if contains_power(root, path, conn, epoch) {
            return true;
        }
    }

    match data.link {
        NodeLink::None => false,
        NodeLink::Chip { chip, target } => {
            path.push(chip);
            let found = contains_power(root, path, target, epoch);
            path.pop();
            found
        }
        NodeLink::Public { bridge } => {
            let Some(chip) = path.pop() else {
                return false;
            };
            let found = contains_power(root, path, bridge, epoch);
            path.push(chip);
            found
        }
    }
}

/// Write pass: apply `value` to every node in the batch, re-dirtying the
/// eastern neighbor of each node whose state actually flipped.
fn set_state(root: &mut Circuit, path: &mut Vec<Handle>, node: Handle, value: bool, epoch: u64) {
    let (flipped, pos, data) = {
        let Some(circ) = root.circuit_at_path_mut(path) else {
            return;
        };
        let Some(thing) = circ.things.resolve_mut(node) else {
            return;
        };
        if thing.epoch == epoch {
            return;
        }
        thing.epoch = epoch;
        if !matches!(thing.thing_type(), ThingType::Node) {
            return;
        }
        let flipped = thing.active != value;
        thing.active = value;
        let pos = thing.pos;
        let Some(data) = thing.as_node().copied() else {
            return;
        };
        (flipped, pos, data)
    };

    if flipped {
        if let Some(circ) = root.circuit_at_path_mut(path) {
            circ.mark_dirty_at(pos.east());
        }
    }

    for conn in data.connections {
        if conn.is_null() {
            continue;
        }
        set_state(root, path, conn, value, epoch);
    }

    match data.link {
        NodeLink::None => {}
        NodeLink::Chip { chip, target } => {
            path.push(chip);
            set_state(root, path, target, value, epoch);
            path.pop();
        }
        NodeLink::Public { bridge } => {
            if let Some(chip) = path.pop() {
                set_state(root, path, bridge, value, epoch);
                path.push(chip);
            }
        }
    }
}

fn west_is_powered(circ: &Circuit, pos: Point) -> bool {
    circ.find_at(pos.west(), TypeMask::ALL)
        .and_then(|h| circ.resolve(h))
        .is_some_and(|t| t.powered)
}

/// Gate clean hook. An inverter emits the negation of its western input and
/// treats a floating input as unpowered (so a lone inverter is a source); a
/// delay emits its western input as-is and treats floating as off. A
/// changed output re-dirties whatever sits east.
pub(crate) fn clean_gate(circ: &mut Circuit, gate: Handle, ty: ThingType) {
    let Some(thing) = circ.resolve(gate) else {
        return;
    };
    let pos = thing.pos;
    let prev = thing.active;

    let west = circ
        .find_at(pos.west(), TypeMask::ALL)
        .and_then(|h| circ.resolve(h))
        .map(|t| t.active);
    let active = match ty {
        ThingType::Inverter => !west.unwrap_or(false),
        ThingType::Delay => west.unwrap_or(false),
        _ => return,
    };

    if let Some(thing) = circ.resolve_mut(gate) {
        thing.active = active;
        thing.powered = active;
    }
    if active != prev {
        circ.mark_dirty_at(pos.east());
    }
}
