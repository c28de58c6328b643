//! Persisted-list lookup service
//!
//! The lookup answers one question: is a checklist already associated with
//! this code? "Not found" is a normal answer ([`LookupResult::NotFound`]);
//! errors are reserved for transport failures, which the rule engine treats
//! as a non-match.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use audit_scan_core::prelude::*;
use audit_scan_core::ChecklistId;

/// A checklist already associated with a physical code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistRecord {
    pub id: ChecklistId,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl ChecklistRecord {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: ChecklistId::new(id),
            code: code.into(),
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Answer from the lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(ChecklistRecord),
    NotFound,
}

impl LookupResult {
    pub fn into_record(self) -> Option<ChecklistRecord> {
        match self {
            LookupResult::Found(record) => Some(record),
            LookupResult::NotFound => None,
        }
    }
}

/// Checklist lookup by code
#[trait_variant::make(ChecklistLookup: Send)]
pub trait LocalChecklistLookup {
    /// Find the checklist associated with `code`
    async fn lookup_by_code(&self, code: &str) -> Result<LookupResult>;
}

/// Run a lookup with a timeout, folding every failure into "no match".
///
/// Transport errors and timeouts are logged and reported as `None`; the
/// caller continues with the next rule.
pub async fn lookup_matching<L>(
    lookup: &L,
    code: &str,
    timeout: Duration,
) -> Option<ChecklistRecord>
where
    L: ChecklistLookup,
{
    let pending = ChecklistLookup::lookup_by_code(lookup, code);
    let result = match tokio::time::timeout(timeout, pending).await {
        Ok(result) => result,
        Err(_) => Err(Error::LookupTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    match result {
        Ok(found) => found.into_record(),
        Err(e) => {
            warn!("Checklist lookup for {:?} failed, treating as not found: {}", code, e);
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// In-memory lookup
// ─────────────────────────────────────────────────────────────────

/// Lookup backed by a code -> checklist map
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    records: HashMap<String, ChecklistRecord>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ChecklistRecord) {
        self.records.insert(record.code.clone(), record);
    }

    pub fn with_record(mut self, record: ChecklistRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<ChecklistRecord> for InMemoryLookup {
    fn from_iter<I: IntoIterator<Item = ChecklistRecord>>(iter: I) -> Self {
        let mut lookup = Self::new();
        for record in iter {
            lookup.insert(record);
        }
        lookup
    }
}

impl ChecklistLookup for InMemoryLookup {
    async fn lookup_by_code(&self, code: &str) -> Result<LookupResult> {
        Ok(self
            .records
            .get(code)
            .cloned()
            .map_or(LookupResult::NotFound, LookupResult::Found))
    }
}

// ─────────────────────────────────────────────────────────────────
// File-backed registry
// ─────────────────────────────────────────────────────────────────

/// On-disk registry of code associations (TOML or JSON)
///
/// ```toml
/// [[checklists]]
/// code = "4006381333931"
/// id = "chk-17"
/// name = "Kitchen inventory"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub checklists: Vec<ChecklistRecord>,
}

/// Lookup loaded from a registry file
#[derive(Debug, Clone, Default)]
pub struct RegistryLookup {
    inner: InMemoryLookup,
}

impl RegistryLookup {
    /// Load a registry; `.json` files are parsed as JSON, everything else as TOML
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read registry {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let file: RegistryFile = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content).map_err(|e| {
                Error::config_invalid(format!("Invalid registry {}: {}", path.display(), e))
            })?
        };

        info!(
            "Loaded {} checklist associations from {}",
            file.checklists.len(),
            path.display()
        );
        Ok(Self {
            inner: file.checklists.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ChecklistLookup for RegistryLookup {
    async fn lookup_by_code(&self, code: &str) -> Result<LookupResult> {
        ChecklistLookup::lookup_by_code(&self.inner, code).await
    }
}
