//! # Scene Painting
//!
//! Turns a walk over the map into a correctly ordered list of sprite draws.
//!
//! ## Architecture
//!
//! ```text
//! Scene walk (tiles, rides, scenery)
//!      ↓  insert / attach / add_string
//! PaintSession (per-frame arena, 512 quadrant buckets)
//!      ↓  drain_in_order
//! PaintVisitor (SceneRenderer → compositor)
//! ```
//!
//! Entries are bucketed by a diagonal "quadrant" derived from their rotated
//! map position. Draining walks the touched quadrants back to front, which
//! gives painter's-algorithm order for the isometric view without sorting.

pub mod arrange;
pub mod entry;
pub mod hit_test;
pub mod renderer;
pub mod session;

pub use entry::{AttachRef, AttachedEntry, BoundBox, ElementRef, EntryRef, PaintEntry, StringEntry, TilePosition};
pub use hit_test::{hit_test, Hit};
pub use renderer::{colourify, SceneRenderer};
pub use session::{FrameStats, PaintSession, PaintVisitor, SessionState, QUADRANT_COUNT};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::RenderError;

bitflags! {
    /// Viewport display options that change how entries are drawn
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ViewFlags: u32 {
        /// Draw rides as see-through ghosts
        const SEE_THROUGH_RIDES = 1 << 0;
        /// Draw scenery and walls as see-through ghosts
        const SEE_THROUGH_SCENERY = 1 << 1;
        /// Draw footpaths, path items and banners as see-through ghosts
        const SEE_THROUGH_PATHS = 1 << 2;
        /// Ghost walls so underground interiors are visible
        const UNDERGROUND_INSIDE = 1 << 3;
        /// Outline every entry's bounding box (zoom 0 only)
        const BOUND_BOXES = 1 << 4;
    }
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// What kind of map object an entry was painted for
///
/// Used for hit testing, see-through view flags and the bounding-box
/// overlay colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InteractionKind {
    /// Not interactive
    #[default]
    None,
    /// Land surface
    Terrain,
    /// Moving sprite such as a guest or vehicle
    Sprite,
    /// Ride track or structure
    Ride,
    /// Water surface
    Water,
    /// Small scenery
    Scenery,
    /// Footpath surface
    Footpath,
    /// Bench, lamp or bin on a path
    FootpathItem,
    /// Park entrance
    Park,
    /// Wall or fence
    Wall,
    /// Multi-tile scenery
    LargeScenery,
    /// Floating label
    Label,
    /// Banner
    Banner,
}

impl InteractionKind {
    /// Palette index used to outline this kind's bounding boxes
    pub const fn debug_colour(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Terrain => 102,
            Self::Sprite => 114,
            Self::Ride => 229,
            Self::Water => 126,
            Self::Scenery => 138,
            Self::Footpath => 150,
            Self::FootpathItem => 162,
            Self::Park => 174,
            Self::Wall => 186,
            Self::LargeScenery => 198,
            Self::Label => 210,
            Self::Banner => 222,
        }
    }
}

/// Paint session failures
///
/// All variants are plain values so the per-sprite paths never allocate.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintError {
    /// The sprite lies entirely outside the visible area
    #[error("Sprite is outside the visible area")]
    Culled,

    /// The frame arena is full; stop painting for this frame
    #[error("Paint arena is full")]
    Overflow,

    /// The parent entry does not exist in the current frame
    #[error("No parent entry to attach to")]
    NoParent,

    /// The call is not valid in the session's current state
    #[error("Paint session is {found:?}, expected {expected:?}")]
    WrongState {
        /// State the call needs
        expected: SessionState,
        /// State the session was in
        found: SessionState,
    },

    /// The image names a sprite the sheet does not have
    #[error("Sprite {0} is not in the sheet")]
    MissingSprite(u32),
}

/// Result alias for paint session operations
pub type Result<T> = std::result::Result<T, PaintError>;

/// Errors raised while drawing a drained frame
#[derive(Error, Debug)]
pub enum SceneError {
    /// Session misuse
    #[error("Paint error: {0}")]
    Paint(#[from] PaintError),

    /// Compositor failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}
