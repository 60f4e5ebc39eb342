//! Integer coordinate types for the isometric view
//!
//! Map space is measured in engine units: one tile edge is [`TILE_SIZE`]
//! units and heights use the same scale. Screen space is measured in
//! unzoomed pixels; zoomed views shift screen coordinates right by their
//! zoom level at the very last moment.

use serde::{Deserialize, Serialize};

/// Length of one tile edge in engine units
pub const TILE_SIZE: i32 = 32;

/// A point in unzoomed screen space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenCoords {
    /// Horizontal position, growing right
    pub x: i32,
    /// Vertical position, growing down
    pub y: i32,
}

impl ScreenCoords {
    /// Create a new screen point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset this point by another
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// A point in 3-D map space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapCoords {
    /// Map x (engine units)
    pub x: i32,
    /// Map y (engine units)
    pub y: i32,
    /// Height (engine units)
    pub z: i32,
}

impl MapCoords {
    /// Create a new map point
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned screen rectangle with exclusive right/bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenRect {
    /// Inclusive left edge
    pub left: i32,
    /// Inclusive top edge
    pub top: i32,
    /// Exclusive right edge
    pub right: i32,
    /// Exclusive bottom edge
    pub bottom: i32,
}

impl ScreenRect {
    /// Create a rectangle from origin and size
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    /// Create a rectangle from its edges
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Create a rectangle from inclusive corners, as UI code passes them
    pub const fn from_inclusive(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right: right + 1,
            bottom: bottom + 1,
        }
    }

    /// Width in pixels (zero for inverted rectangles)
    pub const fn width(&self) -> i32 {
        let w = self.right - self.left;
        if w > 0 { w } else { 0 }
    }

    /// Height in pixels (zero for inverted rectangles)
    pub const fn height(&self) -> i32 {
        let h = self.bottom - self.top;
        if h > 0 { h } else { 0 }
    }

    /// True when the rectangle covers no pixel
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Intersection of two rectangles, `None` when disjoint
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let r = Self {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    /// True when the two rectangles share at least one pixel
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }

    /// True when the point lies inside
    pub const fn contains(&self, point: ScreenCoords) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

/// Camera rotation in 90° steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// Default view
    #[default]
    R0,
    /// Rotated once clockwise
    R1,
    /// Rotated twice
    R2,
    /// Rotated three times
    R3,
}

impl Rotation {
    /// All four rotations in order
    pub const ALL: [Self; 4] = [Self::R0, Self::R1, Self::R2, Self::R3];

    /// Build from any integer; only the low two bits matter
    pub const fn from_index(index: u8) -> Self {
        match index & 3 {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            _ => Self::R3,
        }
    }

    /// Rotation as 0..=3
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// The map direction that undoes this camera rotation
    pub const fn inverse_direction(self) -> Direction {
        Direction::from_index(4 - self.index())
    }

    /// The map direction matching this rotation
    pub const fn direction(self) -> Direction {
        Direction::from_index(self.index())
    }
}

/// Map-space direction used to rotate offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Identity
    West,
    /// (x, y) → (y, -x)
    North,
    /// (x, y) → (-x, -y)
    East,
    /// (x, y) → (-y, x)
    South,
}

impl Direction {
    /// Build from any integer; only the low two bits matter
    pub const fn from_index(index: u8) -> Self {
        match index & 3 {
            0 => Self::West,
            1 => Self::North,
            2 => Self::East,
            _ => Self::South,
        }
    }

    /// Rotate a map-space (x, y) pair
    pub const fn rotate(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Self::West => (x, y),
            Self::North => (y, -x),
            Self::East => (-x, -y),
            Self::South => (-y, x),
        }
    }
}

/// Project a map-space point to unzoomed screen space for a camera rotation
///
/// Rotation 0 is the standard dimetric projection `(y - x, (x + y) / 2 - z)`;
/// the other rotations permute and negate the map axes first. The halving
/// rounds toward negative infinity.
pub const fn project(coords: MapCoords, rotation: Rotation) -> ScreenCoords {
    let MapCoords { x, y, z } = coords;
    match rotation {
        Rotation::R0 => ScreenCoords::new(y - x, ((y + x) >> 1) - z),
        Rotation::R1 => ScreenCoords::new(-y - x, ((y - x) >> 1) - z),
        Rotation::R2 => ScreenCoords::new(x - y, ((-y - x) >> 1) - z),
        Rotation::R3 => ScreenCoords::new(y + x, ((x - y) >> 1) - z),
    }
}

/// Integer division rounding toward positive infinity, for any sign of `a`
pub const fn ceil_div(a: i32, step: i32) -> i32 {
    -((-a).div_euclid(step))
}

/// Round down to a multiple of a power-of-two step
pub const fn floor_to(value: i32, step: i32) -> i32 {
    value & !(step - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let a = ScreenRect::new(0, 0, 10, 10);
        let b = ScreenRect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(ScreenRect::new(5, 5, 5, 5)));

        let c = ScreenRect::new(10, 0, 4, 4);
        assert!(a.intersect(&c).is_none());
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_inclusive_rect() {
        let r = ScreenRect::from_inclusive(2, 3, 4, 3);
        assert_eq!(r.width(), 3);
        assert_eq!(r.height(), 1);
        assert!(r.contains(ScreenCoords::new(4, 3)));
        assert!(!r.contains(ScreenCoords::new(5, 3)));
    }

    #[test]
    fn test_projection_rotation_zero() {
        let p = project(MapCoords::new(32, 64, 16), Rotation::R0);
        assert_eq!(p, ScreenCoords::new(32, 32));
    }

    #[test]
    fn test_projection_halving_floors() {
        // (y + x) = -1 → -1 >> 1 == -1
        let p = project(MapCoords::new(-1, 0, 0), Rotation::R0);
        assert_eq!(p, ScreenCoords::new(1, -1));
    }

    #[test]
    fn test_projection_rotations_agree_on_origin() {
        for rotation in Rotation::ALL {
            assert_eq!(project(MapCoords::new(0, 0, 8), rotation), ScreenCoords::new(0, -8));
        }
    }

    #[test]
    fn test_direction_round_trip() {
        for rotation in Rotation::ALL {
            let (x, y) = rotation.direction().rotate(5, -3);
            let back = rotation.inverse_direction().rotate(x, y);
            assert_eq!(back, (5, -3));
        }
    }

    #[test]
    fn test_ceil_div_negative() {
        assert_eq!(ceil_div(5, 2), 3);
        assert_eq!(ceil_div(4, 2), 2);
        assert_eq!(ceil_div(-3, 2), -1);
        assert_eq!(ceil_div(-4, 4), -1);
        assert_eq!(ceil_div(0, 8), 0);
    }

    #[test]
    fn test_floor_to() {
        assert_eq!(floor_to(7, 4), 4);
        assert_eq!(floor_to(-1, 2), -2);
    }
}
