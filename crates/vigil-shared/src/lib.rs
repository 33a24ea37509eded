//! Shared types for the Vigil audit engine.
//!
//! The daemon, the control CLI and any dashboard consuming audit results all
//! speak in these types. Everything here is plain serializable data.

pub mod api;
pub mod audit;
pub mod diagnostic;
pub mod error;
pub mod module;
pub mod progress;

pub use audit::{AuditResult, HealthSummary, RecoverySummary};
pub use diagnostic::{DiagnosticItem, ModuleStatus, Severity};
pub use error::VigilError;
pub use module::{Category, ModuleDescriptor, Priority};
pub use progress::{progress_percent, AuditEvent, AuditProgress};

/// Crate version shared by daemon and CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default daemon listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7870";
