//! Core engine settings

pub mod config;

pub use config::{BucketOrder, EngineConfig, PaintConfig, SheetConfig};
