//! Settings parser for .audit-scan/config.toml

use super::types::Settings;
use audit_scan_core::prelude::*;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = ".audit-scan";

/// Path of the settings file under `project_path`
pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_DIR).join(CONFIG_FILENAME)
}

/// Load settings from .audit-scan/config.toml
///
/// A missing or unreadable file falls back to defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = config_path(project_path);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Write `settings` to .audit-scan/config.toml, creating the directory
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    let config_path = config_path(project_path);
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::config(format!("Failed to create {}: {}", dir.display(), e)))?;
    }

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    std::fs::write(&config_path, content)?;

    debug!("Saved settings to {:?}", config_path);
    Ok(())
}

/// Create a commented default config file if none exists
pub fn init_config_dir(project_path: &Path) -> Result<PathBuf> {
    let config_dir = project_path.join(CONFIG_DIR);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| Error::config(format!("Failed to create .audit-scan dir: {}", e)))?;
    }

    let config_path = config_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# audit-scan configuration

[resolution]
# Checklist deep links look like <scheme>://<host>/<checklist-id>
deep_link_scheme = "auditapp"
deep_link_host = "checklist"
# Payloads longer than this are reported as unresolved
max_payload_len = 2048
trim_payload = true

[lookup]
# A lookup slower than this is treated as "not found"
timeout_ms = 5000

[scanner]
# Empty accepts every symbology, e.g. ["QR", "EAN13", "CODE128"]
allowed_symbologies = []
request_permission_on_mount = true
"#;
        std::fs::write(&config_path, default_content)?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(config_path)
}
