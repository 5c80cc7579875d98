//! Builders shared by unit tests, integration tests, and benches.

use crate::circuit::Circuit;
use crate::geom::{point, Point};
use crate::id::Handle;

pub fn p(x: i32, y: i32) -> Point {
    point(x, y)
}

/// A horizontal run of `len` nodes starting at `start`, spaced `step`
/// apart and wired consecutively.
pub fn node_chain(circ: &mut Circuit, start: Point, len: usize, step: i32) -> Vec<Handle> {
    let mut nodes = Vec::with_capacity(len);
    for i in 0..len {
        let pos = start.offset(step * i as i32, 0);
        let node = circ.place_node(pos).expect("node placement failed");
        nodes.push(node);
    }
    for pair in nodes.windows(2) {
        circ.connect(pair[0], pair[1]).expect("chain connect failed");
    }
    nodes
}

/// An inverter with a floating input: a constant-high source feeding the
/// cell to its east.
pub fn source_west_of(circ: &mut Circuit, target: Point) -> Handle {
    circ.place_inverter(target.west()).expect("source placement failed")
}

/// Drive the circuit until quiescent, panicking if it churns past
/// `max_tics`.
pub fn settled(circ: &mut Circuit, max_tics: usize) -> usize {
    circ.settle(max_tics)
        .unwrap_or_else(|| panic!("circuit still busy after {max_tics} tics"))
}

/// State of the node at a position, for assertions.
pub fn node_state(circ: &Circuit, pos: Point) -> Option<bool> {
    let handle = circ.find_at(pos, crate::id::TypeMask::NODE)?;
    circ.resolve(handle).map(|t| t.active)
}
