//! Top-level engine glue
//!
//! Owns the sheet, the paint session and the remap cache, and runs one
//! paint-then-draw cycle per frame.

use std::sync::Arc;

use crate::{
    assets::{SheetError, SpriteSheet},
    core::config::{ConfigError, EngineConfig},
    foundation::math::{Rotation, ScreenCoords},
    render::{ColourRemaps, FrameBufferView, RenderError},
    scene::{hit_test, FrameStats, Hit, InteractionKind, PaintError, PaintSession, SceneError, SceneRenderer},
};
use thiserror::Error;

/// Main engine struct
///
/// The sheet is shared behind an [`Arc`] so other threads can read it while
/// the engine paints.
#[derive(Debug)]
pub struct Engine {
    /// Engine configuration
    config: EngineConfig,

    /// Loaded sprite sheet
    sheet: Arc<SpriteSheet>,

    /// Per-frame paint arena
    session: PaintSession,

    /// Remap and glass tables built from the sheet
    remaps: ColourRemaps,
}

impl Engine {
    /// Create an engine, loading the sheet named by the configuration
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");
        let sheet = SpriteSheet::from_config(&config.sheet)?;
        Ok(Self::with_sheet(config, Arc::new(sheet)))
    }

    /// Create an engine around a sheet that is already loaded
    pub fn with_sheet(config: EngineConfig, sheet: Arc<SpriteSheet>) -> Self {
        let session = PaintSession::new(&config.paint);
        log::debug!(
            "Engine ready: {} sprites, paint capacity {}",
            sheet.len(),
            session.capacity()
        );
        Self {
            config,
            sheet,
            session,
            remaps: ColourRemaps::default(),
        }
    }

    /// Use the given remap table source instead of an empty one
    #[must_use]
    pub fn with_remaps(mut self, remaps: ColourRemaps) -> Self {
        self.remaps = remaps;
        self
    }

    /// Paint one frame into `view`
    ///
    /// `walk` places the frame's sprites; requests it makes that are culled
    /// or dropped are only counted. The session is left holding the frame so
    /// [`Engine::hit_test`] can pick from it.
    pub fn render_frame<F>(&mut self, view: FrameBufferView<'_>, rotation: Rotation, walk: F) -> Result<FrameStats, EngineError>
    where
        F: FnOnce(&mut PaintSession, &SpriteSheet),
    {
        self.session.begin_frame(view.visible_rect(), view.zoom(), rotation)?;
        walk(&mut self.session, self.sheet.as_ref());

        let mut renderer = SceneRenderer::new(view, &self.sheet, &mut self.remaps, rotation)
            .with_view_flags(self.config.paint.view_flags);
        let mut stats = self.session.drain_in_order(&mut renderer)?;
        stats.skipped = renderer.skipped();
        log::trace!("Frame drawn: {:?}", stats);
        Ok(stats)
    }

    /// Pick the top-most sprite of the last frame under `point`
    pub fn hit_test(
        &self,
        point: ScreenCoords,
        filter: impl Fn(InteractionKind) -> bool,
    ) -> Result<Option<Hit>, EngineError> {
        Ok(hit_test(&self.session, &self.sheet, point, filter)?)
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the shared sheet
    pub fn sheet(&self) -> &Arc<SpriteSheet> {
        &self.sheet
    }

    /// Get the paint session
    pub fn session(&self) -> &PaintSession {
        &self.session
    }

    /// Get mutable access to the paint session
    pub fn session_mut(&mut self) -> &mut PaintSession {
        &mut self.session
    }

    /// Get mutable access to the remap cache
    pub fn remaps_mut(&mut self) -> &mut ColourRemaps {
        &mut self.remaps
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sheet failed to load
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Session misuse
    #[error("Paint error: {0}")]
    Paint(#[from] PaintError),

    /// Drawing a drained frame failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Compositor failure outside a frame
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}
