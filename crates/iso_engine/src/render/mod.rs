//! # Software Rendering
//!
//! Everything that writes palette indices into a framebuffer.
//!
//! ## Architecture
//!
//! - **FrameBuffer / FrameBufferView**: owned pixels and the positioned, zoomed
//!   window all drawing goes through
//! - **Compositor**: sprite blits with clipping, zoom, RLE and recolouring
//! - **Palette**: remap and mix tables, cached per colour combination
//! - **RectFill**: rectangle, outline and line primitives for UI and overlays
//! - **ImageId**: the packed sprite-plus-recolour value scene code passes around

pub mod compositor;
pub mod framebuffer;
pub mod image_id;
pub mod palette;
pub mod rect_fill;

pub use compositor::{
    composite, composite_masked, default_mode, draw_sprite, draw_sprite_masked, draw_sprite_solid, sprite_pixel_at,
    CompositeMode,
};
pub use framebuffer::{FrameBuffer, FrameBufferView, MAX_ZOOM};
pub use image_id::{colour, ImageId};
pub use palette::{ColourRemaps, MixTable, PaletteRemap};
pub use rect_fill::{FillStyle, PackedStyle};

use crate::assets::SheetError;
use thiserror::Error;

/// Rendering errors
///
/// These only surface for corrupt sheet data or misuse; a fully clipped draw
/// is not an error.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Malformed pixel data, bad view geometry or an unusable element
    #[error("Render format error: {0}")]
    Format(String),

    /// Failure reading the sprite sheet
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),
}

/// Result alias for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
