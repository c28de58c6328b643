//! audit-scan library
//!
//! Command implementations behind the `ascan` binary:
//! - `resolve`: run the rule engine once on a payload
//! - `headless`: a scan session fed NDJSON device lines, emitting NDJSON events

pub mod headless;
pub mod options;
pub mod resolve;

// Re-export main entry points
pub use headless::runner::{run_headless, run_session};
pub use options::ScanOptions;
pub use resolve::run_resolve;
