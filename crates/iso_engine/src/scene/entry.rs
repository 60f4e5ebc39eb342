//! Paint entries and the handles that refer to them
//!
//! Entries live in the session's per-frame arena and link to each other by
//! arena index. Handles carry the frame generation they were issued in, so
//! a handle kept across `begin_frame` is rejected instead of silently
//! pointing at a different entry.

use super::InteractionKind;
use crate::foundation::math::{ScreenCoords, ScreenRect};
use crate::render::ImageId;

/// Arena index link; `None` ends a list
pub(crate) type Link = Option<u16>;

/// A map position in engine units, without height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TilePosition {
    /// Map x
    pub x: i32,
    /// Map y
    pub y: i32,
}

impl TilePosition {
    /// Create a new tile position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Opaque reference to the map element an entry was painted for
///
/// The session never interprets it; hit testing hands it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u32);

/// Handle to a paint entry in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub(crate) index: u16,
    pub(crate) generation: u32,
}

impl EntryRef {
    /// Arena index of the entry
    pub fn index(self) -> usize {
        usize::from(self.index)
    }
}

/// Handle to an attachment in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachRef {
    pub(crate) index: u16,
    pub(crate) generation: u32,
}

/// Rotated engine-space box used to order overlapping entries
///
/// The `_end` edges are inclusive, matching how scene code sizes boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundBox {
    /// Near x
    pub x: i32,
    /// Near y
    pub y: i32,
    /// Bottom
    pub z: i32,
    /// Far x
    pub x_end: i32,
    /// Far y
    pub y_end: i32,
    /// Top
    pub z_end: i32,
}

/// One sprite placed in the frame
#[derive(Debug, Clone, Default)]
pub struct PaintEntry {
    /// Sprite and recolouring
    pub image: ImageId,
    /// Colour image drawn through `image` as a mask, if masked
    pub masked_colour: Option<ImageId>,
    /// Colour used by images that remap the tertiary range
    pub tertiary_colour: u8,
    /// Screen position of the sprite origin
    pub position: ScreenCoords,
    /// Screen area the sprite covers
    pub screen_rect: ScreenRect,
    /// Ordering box
    pub bounds: BoundBox,
    /// Quadrant bucket, 0 for chained entries' own slot
    pub quadrant: u16,
    /// What the entry was painted for
    pub interaction: InteractionKind,
    /// Tile the scene walk was visiting
    pub map_position: TilePosition,
    /// Element the scene walk was visiting
    pub element: Option<ElementRef>,
    pub(crate) next: Link,
    pub(crate) chained: Link,
    pub(crate) first_attachment: Link,
    pub(crate) last_attachment: Link,
}

impl PaintEntry {
    /// True when drawn as a mask over a colour image
    pub fn is_masked(&self) -> bool {
        self.masked_colour.is_some()
    }
}

/// A sprite drawn right after its parent, offset from the parent's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttachedEntry {
    /// Sprite and recolouring
    pub image: ImageId,
    /// Colour image drawn through `image` as a mask, if masked
    pub masked_colour: Option<ImageId>,
    /// Offset from the parent's screen position
    pub offset: ScreenCoords,
    pub(crate) next: Link,
}

/// A text callout drawn after every sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringEntry {
    /// String table id
    pub string_id: u16,
    /// Format arguments
    pub args: [i32; 4],
    /// Screen position of the first glyph
    pub position: ScreenCoords,
    /// Per-glyph vertical offsets for wavy text
    pub y_offsets: &'static [i8],
}
