//! Asset loading: G1 sprite sheets and their pixel codecs

pub mod palette;
pub mod rle;
pub mod sprite_sheet;

pub use palette::Palette;
pub use sprite_sheet::{CountSource, SpriteDescriptor, SpriteFlags, SpriteSheet, SpriteSheetBuilder};

use thiserror::Error;

/// Sprite sheet errors
#[derive(Error, Debug)]
pub enum SheetError {
    /// Sheet file missing or unreadable
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt header, size mismatch or malformed pixel data
    #[error("Format error: {0}")]
    Format(String),

    /// Sprite id outside the sheet
    #[error("Sprite {id} out of range (sheet has {count} elements)")]
    Index {
        /// Requested id
        id: u32,
        /// Number of elements in the sheet
        count: u32,
    },
}

/// Result alias for asset operations
pub type Result<T> = std::result::Result<T, SheetError>;
