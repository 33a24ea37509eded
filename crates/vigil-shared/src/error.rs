//! Error types for Vigil.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Repair error: {0}")]
    Repair(String),

    #[error("Audit already running: {0}")]
    AuditInProgress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VigilError {
    pub fn code(&self) -> i32 {
        match self {
            VigilError::Registry(_) => -32010,
            VigilError::Config(_) => -32011,
            VigilError::Probe(_) => -32012,
            VigilError::Repair(_) => -32013,
            VigilError::AuditInProgress(_) => -32014,
            VigilError::Io(_) => -32006,
            VigilError::Json(_) => -32700,
            VigilError::Internal(_) => -32603,
        }
    }

    /// Registry failures abort a run; everything else is captured per module.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VigilError::Registry(_) | VigilError::Config(_))
    }
}
