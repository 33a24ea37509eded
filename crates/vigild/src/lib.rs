//! Vigil audit engine.
//!
//! Probes every module of the application catalog, attempts automated repair
//! of unhealthy ones and reports the aggregated health of the last run.

pub mod chance;
pub mod config;
pub mod health;
pub mod orchestrator;
pub mod registry;
pub mod repair;
pub mod reporter;
pub mod routes;
pub mod server;
pub mod state;

pub use config::Config;
pub use orchestrator::AuditOrchestrator;
pub use reporter::HealthReporter;
pub use state::AuditService;
