//! Grid geometry: cell positions, bounding rectangles, cardinal directions.
//!
//! The board is an unbounded 2D grid of unit cells. Every entity occupies a
//! rectangle of cells described by its origin position and size.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A position (or extent) on the 2D cell grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell immediately to the west (gates read from here).
    pub fn west(self) -> Self {
        Self::new(self.x - 1, self.y)
    }

    /// The cell immediately to the east (gates drive into here).
    pub fn east(self) -> Self {
        Self::new(self.x + 1, self.y)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Shorthand constructor, used pervasively in tests and placement code.
pub const fn point(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// An inclusive, normalized rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Build a rect from two arbitrary corners, normalizing min/max.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Shorthand constructor following [`point`].
pub fn rect(a: Point, b: Point) -> Rect {
    Rect::from_corners(a, b)
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Cardinal direction between two cells. `None` for diagonal or identical
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    None,
    East,
    North,
    West,
    South,
}

impl Direction {
    /// Direction from `from` toward `to` along the shared axis.
    pub fn between(from: Point, to: Point) -> Direction {
        if from.y == to.y {
            if from.x < to.x {
                return Direction::East;
            }
            if from.x > to.x {
                return Direction::West;
            }
        } else if from.x == to.x {
            if from.y < to.y {
                return Direction::South;
            }
            if from.y > to.y {
                return Direction::North;
            }
        }
        Direction::None
    }
}

// ===========================================================================
// Tests
// ===========================================================================
