//! Generation-checked handles and entity type tags.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Identifies a [`Thing`](crate::thing::Thing) in a circuit's arena across
/// deletions and slot reuse. Cheap to copy and compare.
///
/// A handle is null iff its generation is 0. It resolves to a live entity
/// iff the arena slot at `index` is occupied and stores the same generation;
/// anything else resolves to `None`. That check is the engine's entire
/// defense against stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub index: u32,
    pub generation: u32,
}

impl Handle {
    pub const NULL: Handle = Handle {
        index: 0,
        generation: 0,
    };

    pub fn is_null(self) -> bool {
        self.generation == 0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::NULL
    }
}

// ---------------------------------------------------------------------------
// Type tags
// ---------------------------------------------------------------------------

/// Entity type tag. Values are disjoint power-of-two flags so they compose
/// into a [`TypeMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ThingType {
    Node = 1 << 0,
    Inverter = 1 << 1,
    Chip = 1 << 2,
    Delay = 1 << 3,
}

/// A filter over entity types for lookups and iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMask(pub u8);

impl TypeMask {
    pub const ALL: TypeMask = TypeMask(0xFF);
    pub const NODE: TypeMask = TypeMask(ThingType::Node as u8);
    pub const INVERTER: TypeMask = TypeMask(ThingType::Inverter as u8);
    pub const CHIP: TypeMask = TypeMask(ThingType::Chip as u8);
    pub const DELAY: TypeMask = TypeMask(ThingType::Delay as u8);
    /// Both gate kinds (west-reading, east-driving).
    pub const GATE: TypeMask = TypeMask(ThingType::Inverter as u8 | ThingType::Delay as u8);

    pub fn contains(self, ty: ThingType) -> bool {
        self.0 & ty as u8 != 0
    }
}

impl std::ops::BitOr for TypeMask {
    type Output = TypeMask;
    fn bitor(self, rhs: TypeMask) -> TypeMask {
        TypeMask(self.0 | rhs.0)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_null() {
        assert!(Handle::NULL.is_null());
        assert!(Handle::default().is_null());
        let live = Handle {
            index: 0,
            generation: 1,
        };
        assert!(!live.is_null());
    }

    #[test]
    fn type_tags_are_disjoint_flags() {
        let tags = [
            ThingType::Node,
            ThingType::Inverter,
            ThingType::Chip,
            ThingType::Delay,
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_eq!(*a as u8 & *b as u8, 0);
            }
        }
    }

    #[test]
    fn mask_filters_types() {
        let mask = TypeMask::NODE | TypeMask::DELAY;
        assert!(mask.contains(ThingType::Node));
        assert!(mask.contains(ThingType::Delay));
        assert!(!mask.contains(ThingType::Inverter));
        assert!(TypeMask::ALL.contains(ThingType::Chip));
    }
}
