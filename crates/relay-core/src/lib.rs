//! Digital-logic circuit simulation engine.
//!
//! Circuits live on an integer grid. Nodes carry signal and wire together
//! into batches that share one state; inverters and delays read the cell to
//! their west and drive the cell to their east; chips nest whole circuits
//! and surface their exported nodes as bridge nodes in the parent. The
//! engine is event-driven: editing marks entities dirty, and
//! [`Circuit::run_tic`] re-evaluates exactly the dirty set, deferring
//! re-dirtied work to the next tic so cyclic topologies oscillate instead
//! of hanging.
//!
//! ```
//! use relay_core::{geom::point, Circuit};
//!
//! let mut circ = Circuit::new("demo");
//! circ.place_inverter(point(0, 0)).unwrap(); // floating input: a source
//! let out = circ.place_node(point(1, 0)).unwrap();
//! circ.settle(16).unwrap();
//! assert!(circ.resolve(out).unwrap().active);
//! ```

pub mod arena;
pub mod circuit;
pub mod clipboard;
pub mod geom;
pub mod id;
pub mod query;
pub mod serialize;
pub mod thing;
pub mod validation;

mod chip;
mod power;
mod tic;
mod topology;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use arena::ArenaFull;
pub use circuit::{Circuit, CircuitError, MAX_PUBLIC_NODES};
pub use clipboard::Clipboard;
pub use geom::{Direction, Point, Rect};
pub use id::{Handle, ThingType, TypeMask};
pub use query::{LinkClass, ThingSnapshot, WireSnapshot};
pub use serialize::{load_circuit, load_file, save_circuit, save_file, LoadError, SaveError};
pub use thing::{NodeData, NodeLink, Thing, ThingKind};
pub use validation::{validate, ValidationIssue};
