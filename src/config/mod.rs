//! Configuration module for media-keysd.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each
//! controlled device, `AppPaths` for the XDG config directory, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, BacklightConfig, KeysConfig};
