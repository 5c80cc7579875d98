//! Structural consistency checks, for debugging editors and tests. A clean
//! circuit reports no issues; everything reported here is tolerated by the
//! engine (stale handles fail soft) but indicates an editing bug.

use crate::circuit::{Circuit, MAX_PUBLIC_NODES};
use crate::id::{Handle, TypeMask};
use crate::thing::{NodeLink, ThingKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// `a` lists `b` as a connection but not vice versa.
    AsymmetricConnection { a: Handle, b: Handle },
    /// A connection slot holds a non-null handle that no longer resolves.
    DanglingConnection { node: Handle, slot: usize },
    /// A node lists itself as a connection.
    SelfConnection { node: Handle },
    /// An export-table slot holds a handle that is not a live node.
    PublicEntryDead { slot: usize },
    /// An export-table entry whose node is not marked public.
    PublicEntryUnlinked { node: Handle },
    /// A node marked public that the export table does not list.
    PublicLinkMissingFromTable { node: Handle },
    /// Two live entities whose bounding boxes overlap.
    OverlappingEntities { a: Handle, b: Handle },
    /// A chip bridge-table slot holds a handle that no longer resolves.
    DanglingBridge { chip: Handle, slot: usize },
    /// An issue inside a chip's child circuit.
    InChild { chip: Handle, issue: Box<ValidationIssue> },
}

/// Walk the circuit tree and report every inconsistency found.
pub fn validate(circ: &Circuit) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (handle, thing) in circ.iter(TypeMask::NODE) {
        let Some(node) = thing.as_node() else {
            continue;
        };
        for (slot, conn) in node.connections.iter().enumerate() {
            if conn.is_null() {
                continue;
            }
            if *conn == handle {
                issues.push(ValidationIssue::SelfConnection { node: handle });
                continue;
            }
            let Some(other) = circ.resolve(*conn) else {
                issues.push(ValidationIssue::DanglingConnection { node: handle, slot });
                continue;
            };
            let reciprocal = other
                .as_node()
                .is_some_and(|n| n.is_connected_to(handle));
            if !reciprocal {
                issues.push(ValidationIssue::AsymmetricConnection {
                    a: handle,
                    b: *conn,
                });
            }
        }
    }

    for slot in 0..MAX_PUBLIC_NODES {
        let entry = circ.public_nodes()[slot];
        if entry.is_null() {
            continue;
        }
        match circ.resolve(entry).and_then(|t| t.as_node()) {
            None => issues.push(ValidationIssue::PublicEntryDead { slot }),
            Some(node) => {
                if !matches!(node.link, NodeLink::Public { .. }) {
                    issues.push(ValidationIssue::PublicEntryUnlinked { node: entry });
                }
            }
        }
    }
    for (handle, thing) in circ.iter(TypeMask::NODE) {
        let is_public = thing
            .as_node()
            .is_some_and(|n| matches!(n.link, NodeLink::Public { .. }));
        if is_public && !circ.public_nodes().contains(&handle) {
            issues.push(ValidationIssue::PublicLinkMissingFromTable { node: handle });
        }
    }

    let live: Vec<_> = circ.iter(TypeMask::ALL).collect();
    for (i, (ha, ta)) in live.iter().enumerate() {
        for (hb, tb) in &live[i + 1..] {
            if ta.bbox().intersects(&tb.bbox()) {
                issues.push(ValidationIssue::OverlappingEntities { a: *ha, b: *hb });
            }
        }
    }

    for (handle, thing) in circ.iter(TypeMask::CHIP) {
        let ThingKind::Chip(chip) = &thing.kind else {
            continue;
        };
        for (slot, bridge) in chip.bridges.iter().enumerate() {
            if !bridge.is_null() && circ.resolve(*bridge).is_none() {
                issues.push(ValidationIssue::DanglingBridge { chip: handle, slot });
            }
        }
        for issue in validate(&chip.circuit) {
            issues.push(ValidationIssue::InChild {
                chip: handle,
                issue: Box::new(issue),
            });
        }
    }

    issues
}

// ====== Tests ======

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point;

    #[test]
    fn well_formed_circuit_is_clean() {
        let mut c = Circuit::new("v");
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(4, 0)).unwrap();
        c.connect(a, b).unwrap();
        c.place_inverter(point(-2, 0)).unwrap();
        c.toggle_public(a).unwrap();
        c.settle(16).unwrap();
        assert!(validate(&c).is_empty());
    }

    #[test]
    fn deletion_leaves_no_debris() {
        let mut c = Circuit::new("v");
        let a = c.place_node(point(0, 0)).unwrap();
        let b = c.place_node(point(4, 0)).unwrap();
        c.connect(a, b).unwrap();
        c.toggle_public(b).unwrap();
        c.delete(b);
        assert!(validate(&c).is_empty());
    }
}
