//! Prelude for common imports used throughout all audit-scan crates

pub use crate::error::{Error, ErrorClass, Result, ResultExt};
pub use tracing::{debug, error, info, instrument, trace, warn};
