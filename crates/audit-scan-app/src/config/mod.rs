//! Configuration file parsing for audit-scan
//!
//! Supports:
//! - `.audit-scan/config.toml` - Global settings

pub mod settings;
pub mod types;

pub use settings::{config_path, init_config_dir, load_settings, save_settings};
pub use types::*;
