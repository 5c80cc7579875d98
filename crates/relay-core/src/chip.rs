//! Chip bridge maintenance.
//!
//! A chip embeds a child circuit. Exported nodes of the child are surfaced
//! in the parent as bridge nodes along the chip's western edge, one row per
//! export slot. Reconciliation runs once per tic before any evaluation:
//! slots the child exported gain a bridge, slots it withdrew lose theirs,
//! and a slot whose export changed is re-linked. Bridges are re-dirtied
//! only when their mapping actually changed.

use crate::circuit::{Circuit, MAX_PUBLIC_NODES};
use crate::geom::point;
use crate::id::{Handle, TypeMask};
use crate::thing::{NodeData, NodeLink, ThingKind};

/// Sync every circuit in the tree to the root's tic and reconcile chip
/// bridges, parents before children.
pub(crate) fn sync_and_update(circ: &mut Circuit, tic: u64) {
    circ.tic = tic;
    for chip in circ.things.handles(TypeMask::CHIP) {
        update_chip(circ, chip, tic);
        if let Some(child) = circ.chip_circuit_mut(chip) {
            sync_and_update(child, tic);
        }
    }
}

/// Reconcile one chip's bridge table against its child's export table.
///
/// The child circuit is moved out of the chip entity for the duration so
/// parent and child can both be edited, and reinstalled afterwards.
pub(crate) fn update_chip(circ: &mut Circuit, chip: Handle, tic: u64) {
    let (chip_pos, mut bridges, mut child) = {
        let Some(thing) = circ.resolve_mut(chip) else {
            return;
        };
        let pos = thing.pos;
        let Some(data) = thing.as_chip_mut() else {
            return;
        };
        let child = std::mem::replace(&mut data.circuit, Box::new(Circuit::new("")));
        (pos, data.bridges, child)
    };
    child.tic = tic;

    for slot in 0..MAX_PUBLIC_NODES {
        let exported = child.public_nodes[slot];
        let export_live = child
            .resolve(exported)
            .is_some_and(|t| t.as_node().is_some());
        let bridge = bridges[slot];
        let bridge_live = circ.resolve(bridge).is_some();

        match (export_live, bridge_live) {
            (false, false) => {}
            (false, true) => {
                // Export withdrawn: the bridge goes with it.
                circ.delete(bridge);
                bridges[slot] = Handle::NULL;
            }
            (true, false) => {
                let pos = chip_pos + point(-1, 1 + slot as i32);
                let bridge = match circ.find_at(pos, TypeMask::NODE) {
                    Some(existing) => existing,
                    None => {
                        if circ.find_at(pos, TypeMask::ALL).is_some() {
                            // Cell blocked by something else; retry next tic.
                            continue;
                        }
                        match circ.create(ThingKind::Node(NodeData::default()), pos) {
                            Ok(created) => created,
                            Err(_) => continue,
                        }
                    }
                };
                link_pair(circ, &mut child, chip, bridge, exported);
                bridges[slot] = bridge;
                circ.mark_dirty(bridge);
                child.mark_dirty(exported);
            }
            (true, true) => {
                // Slot re-exported to a different node, or links clobbered
                // by a merge: restore the pairing.
                let wanted = NodeLink::Chip {
                    chip,
                    target: exported,
                };
                let bridge_ok = circ
                    .resolve(bridge)
                    .and_then(|t| t.as_node())
                    .is_some_and(|n| n.link == wanted);
                let export_ok = child
                    .resolve(exported)
                    .and_then(|t| t.as_node())
                    .is_some_and(|n| n.link == NodeLink::Public { bridge });
                if !bridge_ok || !export_ok {
                    link_pair(circ, &mut child, chip, bridge, exported);
                    circ.mark_dirty(bridge);
                    child.mark_dirty(exported);
                }
            }
        }
    }

    // Footprint grows with the lowest bridged slot.
    let height = bridges
        .iter()
        .enumerate()
        .filter(|(_, b)| circ.resolve(**b).is_some())
        .map(|(i, _)| i as i32 + 3)
        .max()
        .unwrap_or(2);

    if let Some(thing) = circ.resolve_mut(chip) {
        thing.size.y = height;
        if let Some(data) = thing.as_chip_mut() {
            data.bridges = bridges;
            data.circuit = child;
        }
    }
}

fn link_pair(circ: &mut Circuit, child: &mut Circuit, chip: Handle, bridge: Handle, exported: Handle) {
    if let Some(node) = circ.resolve_mut(bridge).and_then(|t| t.as_node_mut()) {
        node.link = NodeLink::Chip {
            chip,
            target: exported,
        };
    }
    if let Some(node) = child.resolve_mut(exported).and_then(|t| t.as_node_mut()) {
        node.link = NodeLink::Public { bridge };
    }
}
