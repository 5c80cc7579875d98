//! Property tests over random edit sequences: wiring stays symmetric and
//! freed handles never come back to life, no matter the order of edits.

use proptest::prelude::*;
use relay_core::geom::point;
use relay_core::{validate, Circuit, Handle, TypeMask, ValidationIssue};

#[derive(Debug, Clone)]
enum Edit {
    Connect(usize, usize),
    Disconnect(usize, usize),
    Delete(usize),
    Recreate(usize),
}

const SITES: usize = 8;

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0..SITES, 0..SITES).prop_map(|(a, b)| Edit::Connect(a, b)),
        (0..SITES, 0..SITES).prop_map(|(a, b)| Edit::Disconnect(a, b)),
        (0..SITES).prop_map(Edit::Delete),
        (0..SITES).prop_map(Edit::Recreate),
    ]
}

/// Apply a random edit script to a fixed grid of node sites. Returns the
/// circuit, the live handle per site, and every handle ever freed.
fn apply(edits: &[Edit]) -> (Circuit, Vec<Option<Handle>>, Vec<Handle>) {
    let mut circ = Circuit::new("prop");
    let mut sites: Vec<Option<Handle>> = (0..SITES)
        .map(|i| Some(circ.place_node(site_pos(i)).unwrap()))
        .collect();
    let mut freed = Vec::new();

    for edit in edits {
        match *edit {
            Edit::Connect(a, b) => {
                if let (Some(ha), Some(hb)) = (sites[a], sites[b]) {
                    // Self-wires and full nodes are rejected; both are fine.
                    let _ = circ.connect(ha, hb);
                }
            }
            Edit::Disconnect(a, b) => {
                if let (Some(ha), Some(hb)) = (sites[a], sites[b]) {
                    circ.disconnect(ha, hb);
                }
            }
            Edit::Delete(a) => {
                if let Some(ha) = sites[a].take() {
                    circ.delete(ha);
                    freed.push(ha);
                }
            }
            Edit::Recreate(a) => {
                if sites[a].is_none() {
                    sites[a] = Some(circ.place_node(site_pos(a)).unwrap());
                }
            }
        }
    }
    (circ, sites, freed)
}

fn site_pos(i: usize) -> relay_core::Point {
    // Spread sites so no three are colinear and no placement splits a wire.
    point((i as i32) * 3, (i as i32) * (i as i32) % 11)
}

proptest! {
    #[test]
    fn wiring_stays_symmetric(edits in prop::collection::vec(edit_strategy(), 0..64)) {
        let (circ, _, _) = apply(&edits);
        for issue in validate(&circ) {
            match issue {
                ValidationIssue::AsymmetricConnection { .. }
                | ValidationIssue::DanglingConnection { .. }
                | ValidationIssue::SelfConnection { .. } => {
                    prop_assert!(false, "wiring invariant broken: {issue:?}");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn freed_handles_stay_dead(edits in prop::collection::vec(edit_strategy(), 0..64)) {
        let (circ, live, freed) = apply(&edits);
        for stale in freed {
            prop_assert!(circ.resolve(stale).is_none(), "stale handle resolved");
        }
        for handle in live.into_iter().flatten() {
            prop_assert!(circ.resolve(handle).is_some(), "live handle lost");
        }
    }

    #[test]
    fn random_edits_always_settle(edits in prop::collection::vec(edit_strategy(), 0..48)) {
        let (mut circ, _, _) = apply(&edits);
        // Pure wiring has no sources and no cycles of gates, so the dirty
        // set must drain.
        prop_assert!(circ.settle(128).is_some());
        prop_assert!(circ.iter(TypeMask::NODE).all(|(_, t)| !t.active));
    }
}
