//! # Iso Engine
//!
//! A software renderer for 2.5D isometric scenes built from paletted sprites.
//!
//! ## Features
//!
//! - **Sprite Sheets**: G1 sheet loading, saving and in-memory authoring
//! - **Pixel Compositing**: RLE and raw sprites, palette remaps, glass tints,
//!   masks and zoomed views into 8-bit indexed framebuffers
//! - **Paint Sessions**: per-frame sprite arena with quadrant bucketing for
//!   painter's-algorithm ordering, attachments, labels and hit testing
//! - **Rectangle Fills**: solid, cross-hatched, patterned and filtered fills
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iso_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::new().with_sheet_path("data/g1.dat");
//!     let mut engine = Engine::new(config)?;
//!     let mut framebuffer = FrameBuffer::new(640, 480);
//!
//!     let stats = engine.render_frame(framebuffer.view(), Rotation::R0, |session, sheet| {
//!         session.set_sprite_position(0, 0);
//!         let _ = session.insert(sheet, ImageId::new(0), MapCoords::default(), MapCoords::new(32, 32, 8));
//!     })?;
//!     log::info!("Drew {} sprites", stats.inserted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{Palette, SpriteSheet, SpriteSheetBuilder},
        core::config::{BucketOrder, EngineConfig, PaintConfig, SheetConfig},
        foundation::math::{project, MapCoords, Rotation, ScreenCoords, ScreenRect},
        render::{draw_sprite, rect_fill, ColourRemaps, FillStyle, FrameBuffer, FrameBufferView, ImageId},
        scene::{hit_test, InteractionKind, PaintSession, PaintVisitor, SceneRenderer, ViewFlags},
        Engine, EngineError,
    };
}
