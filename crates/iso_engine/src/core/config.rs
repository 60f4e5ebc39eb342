//! # Engine Configuration
//!
//! Settings for the sprite sheet, the paint session and logging. Every
//! section is serde-serializable, so the whole [`EngineConfig`] can be
//! persisted as TOML or RON through the [`Config`] trait.
//!
//! ## Example
//!
//! ```rust
//! use iso_engine::core::config::{EngineConfig, BucketOrder};
//!
//! let config = EngineConfig::new()
//!     .with_sheet_path("data/g1.dat")
//!     .with_paint_capacity(6000)
//!     .with_bucket_order(BucketOrder::Fifo);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::scene::ViewFlags;

/// Largest paint capacity the arena accepts; entry handles are 16-bit
pub const MAX_PAINT_CAPACITY: usize = u16::MAX as usize;

/// Entry count used by the legacy renderer
pub const DEFAULT_PAINT_CAPACITY: usize = 4000;

/// # Sprite Sheet Configuration
///
/// Where the G1 sheet lives and whether its header count is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Path to the sheet file
    pub path: String,
    /// Element count to use instead of the header's count
    ///
    /// Some shipped archives carry a wrong count in their header.
    pub element_count_override: Option<u32>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            path: "data/g1.dat".to_string(),
            element_count_override: None,
        }
    }
}

/// Order of entries that share a quadrant bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BucketOrder {
    /// New entries become the bucket head and drain first
    #[default]
    Lifo,
    /// New entries are appended and drain last
    Fifo,
}

/// # Paint Session Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintConfig {
    /// Maximum entries, attachments and strings per frame
    pub capacity: usize,
    /// Same-quadrant ordering
    pub bucket_order: BucketOrder,
    /// Run the bounding-box arrange pass before draining
    pub sort_bounding_boxes: bool,
    /// View flags applied by the scene renderer
    pub view_flags: ViewFlags,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PAINT_CAPACITY,
            bucket_order: BucketOrder::Lifo,
            sort_bounding_boxes: false,
            view_flags: ViewFlags::empty(),
        }
    }
}

impl PaintConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("Paint capacity must be at least 1".to_string()));
        }
        if self.capacity > MAX_PAINT_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "Paint capacity {} exceeds the maximum of {}",
                self.capacity, MAX_PAINT_CAPACITY
            )));
        }
        Ok(())
    }
}

/// # Engine Configuration
///
/// Top-level settings consumed by [`crate::Engine::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Sprite sheet settings
    pub sheet: SheetConfig,
    /// Paint session settings
    pub paint: PaintConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            sheet: SheetConfig::default(),
            paint: PaintConfig::default(),
        }
    }

    /// Set the sheet path
    #[must_use]
    pub fn with_sheet_path(mut self, path: impl Into<String>) -> Self {
        self.sheet.path = path.into();
        self
    }

    /// Override the header element count
    #[must_use]
    pub fn with_element_count_override(mut self, count: u32) -> Self {
        self.sheet.element_count_override = Some(count);
        self
    }

    /// Set the paint arena capacity
    #[must_use]
    pub fn with_paint_capacity(mut self, capacity: usize) -> Self {
        self.paint.capacity = capacity;
        self
    }

    /// Set the same-quadrant bucket order
    #[must_use]
    pub fn with_bucket_order(mut self, order: BucketOrder) -> Self {
        self.paint.bucket_order = order;
        self
    }

    /// Enable or disable the bounding-box arrange pass
    #[must_use]
    pub fn with_bounding_box_sort(mut self, enabled: bool) -> Self {
        self.paint.sort_bounding_boxes = enabled;
        self
    }

    /// Set view flags
    #[must_use]
    pub fn with_view_flags(mut self, flags: ViewFlags) -> Self {
        self.paint.view_flags = flags;
        self
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheet.path.is_empty() {
            return Err(ConfigError::Invalid("Sheet path cannot be empty".to_string()));
        }
        self.paint.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.paint.capacity, DEFAULT_PAINT_CAPACITY);
        assert_eq!(config.paint.bucket_order, BucketOrder::Lifo);
        assert!(!config.paint.sort_bounding_boxes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity_validation() {
        assert!(EngineConfig::new().with_paint_capacity(0).validate().is_err());
        assert!(EngineConfig::new().with_paint_capacity(MAX_PAINT_CAPACITY + 1).validate().is_err());
        assert!(EngineConfig::new().with_paint_capacity(MAX_PAINT_CAPACITY).validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::new()
            .with_sheet_path("assets/g1.dat")
            .with_element_count_override(29294)
            .with_bucket_order(BucketOrder::Fifo)
            .with_view_flags(ViewFlags::SEE_THROUGH_RIDES | ViewFlags::BOUND_BOXES);

        let text = config.to_string_as(ConfigFormat::Toml).unwrap();
        let parsed = EngineConfig::from_str_as(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = EngineConfig::new().with_paint_capacity(512).with_bounding_box_sort(true);
        let text = config.to_string_as(ConfigFormat::Ron).unwrap();
        let parsed = EngineConfig::from_str_as(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = EngineConfig::from_str_as("log_level = \"debug\"\n", ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.log_level, "debug");
        assert_eq!(parsed.paint, PaintConfig::default());
    }
}
