//! Options shared by the `resolve` and `session` commands

use std::path::PathBuf;

use audit_scan_app::services::RegistryLookup;
use audit_scan_app::ResolutionContext;
use audit_scan_core::prelude::*;
use audit_scan_core::InteractionMode;

/// How a scan session (or a one-shot resolution) is set up
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub mode: InteractionMode,
    /// Registry of code -> checklist associations; none means an empty lookup
    pub registry: Option<PathBuf>,
    /// Whether a navigation host is available
    pub host_available: bool,
    pub property: Option<String>,
    pub room: Option<String>,
}

impl ScanOptions {
    pub fn new(mode: InteractionMode) -> Self {
        Self {
            mode,
            host_available: true,
            ..Self::default()
        }
    }

    pub fn load_lookup(&self) -> Result<RegistryLookup> {
        match &self.registry {
            Some(path) => RegistryLookup::load(path),
            None => {
                debug!("No registry given, every lookup is a miss");
                Ok(RegistryLookup::default())
            }
        }
    }

    /// Context without continuations
    pub fn context(&self) -> ResolutionContext {
        let mut context = ResolutionContext::new(self.mode);
        if let Some(property) = &self.property {
            context = context.with_property(property.as_str());
        }
        if let Some(room) = &self.room {
            context = context.with_room(room.as_str());
        }
        context
    }
}
