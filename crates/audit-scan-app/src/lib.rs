//! audit-scan-app - Scan session orchestration for audit-scan
//!
//! This crate implements the resolution rule engine, the TEA (The Elm
//! Architecture) state machine of a scan session, the `ScanController` that
//! executes its actions, configuration loading, and the collaborator traits
//! (checklist lookup, navigation host) with reference implementations.

pub mod config;
pub mod context;
pub mod controller;
pub mod handler;
pub mod message;
pub mod resolver;
pub mod services;
pub mod session_event;
pub mod state;

// Re-export primary types
pub use context::{Continuation, ResolutionContext};
pub use controller::ScanController;
pub use handler::{UpdateAction, UpdateResult};
pub use message::{ExecutionResult, Message};
pub use resolver::{LocalResolution, Resolver};
pub use session_event::SessionEvent;
pub use state::{ScanSession, Termination};
