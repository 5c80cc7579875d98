//! Yank-and-put editing support. The clipboard is just a circuit of its
//! own: yank deep-copies a region into it normalized to the origin, put
//! merges a shifted copy into the target, so pasting over existing
//! entities fuses instead of duplicating.

use crate::circuit::Circuit;
use crate::geom::{Point, Rect};

#[derive(Debug, Clone)]
pub struct Clipboard {
    circuit: Circuit,
}

impl Clipboard {
    pub fn new() -> Self {
        Self {
            circuit: Circuit::new("CLIPBOARD"),
        }
    }

    /// Copy every entity positioned inside `region` out of `src`, shifted
    /// so the region's corner lands on the origin. Replaces any previous
    /// contents.
    pub fn yank(&mut self, src: &Circuit, region: Rect) {
        self.circuit.copy_rect(src, region);
        self.circuit.shift(-region.min);
    }

    /// Merge the held entities into `target` with their origin at `at`.
    /// The clipboard keeps its contents and can be put repeatedly.
    pub fn put(&self, target: &mut Circuit, at: Point) {
        if self.is_empty() {
            return;
        }
        let mut staged = self.circuit.clone();
        staged.shift(at);
        target.merge(&staged);
    }

    pub fn is_empty(&self) -> bool {
        self.circuit.live_count() == 0
    }

    pub fn contents(&self) -> &Circuit {
        &self.circuit
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

// ====== Tests ======
