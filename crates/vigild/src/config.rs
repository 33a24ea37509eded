//! Configuration management for vigild.
//!
//! Loads settings from /etc/vigil/config.toml or uses defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vigil_shared::ModuleDescriptor;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/vigil/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/vigil/config.toml";

/// Environment variable overriding the config location
pub const CONFIG_ENV: &str = "VIGIL_CONFIG";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the HTTP API binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Run an audit every N seconds (disabled when absent)
    #[serde(default)]
    pub audit_interval_secs: Option<u64>,

    /// Run one audit right after startup
    #[serde(default)]
    pub audit_on_start: bool,
}

fn default_listen_addr() -> String {
    vigil_shared::DEFAULT_LISTEN_ADDR.to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            audit_interval_secs: None,
            audit_on_start: false,
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Base URL module routes are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-probe timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,

    /// Chance that an otherwise healthy module is flagged partially working
    #[serde(default = "default_noise_probability")]
    pub noise_probability: f64,

    /// Seed for the noise and repair generator (random when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_probe_timeout() -> u64 {
    3_000
}

fn default_noise_probability() -> f64 {
    0.10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_probe_timeout(),
            noise_probability: default_noise_probability(),
            seed: None,
        }
    }
}

/// Repair configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    #[serde(default = "default_repair_enabled")]
    pub enabled: bool,

    /// Success chance when repairing a partially working module
    #[serde(default = "default_partial_success")]
    pub partial_success_probability: f64,

    /// Success chance when repairing a broken module
    #[serde(default = "default_broken_success")]
    pub broken_success_probability: f64,

    /// Simulated remediation time in milliseconds
    #[serde(default)]
    pub simulated_delay_ms: u64,
}

fn default_repair_enabled() -> bool {
    true
}

fn default_partial_success() -> f64 {
    0.90
}

fn default_broken_success() -> f64 {
    0.70
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            enabled: default_repair_enabled(),
            partial_success_probability: default_partial_success(),
            broken_success_probability: default_broken_success(),
            simulated_delay_ms: 0,
        }
    }
}

/// Audit run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Modules probed at once; 1 keeps the run strictly sequential
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// HTTP health endpoint backing a component check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointCheckConfig {
    /// `component_ref` this check answers for
    pub component: String,

    /// Absolute URL, or a path joined onto `probe.base_url`
    pub url: String,

    /// Responses slower than this are reported as degraded
    #[serde(default)]
    pub degraded_latency_ms: Option<u64>,
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// External catalog file, re-read on every run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub repair: RepairConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    /// Inline module catalog; the built-in catalog is used when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<EndpointCheckConfig>,
}

impl Config {
    /// Load config from the standard locations, or return defaults
    pub fn load() -> Self {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            candidates.push(PathBuf::from(path));
        }
        candidates.push(PathBuf::from(CONFIG_PATH));
        candidates.push(PathBuf::from(DEFAULT_CONFIG_PATH));

        for path in &candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring config {}: {:#}", path.display(), e),
            }
        }

        warn!("Config not found, using defaults");
        Config::default()
    }

    /// Load config from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("probe.noise_probability", self.probe.noise_probability),
            ("repair.partial_success_probability", self.repair.partial_success_probability),
            ("repair.broken_success_probability", self.repair.broken_success_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                anyhow::bail!("{} must be within 0.0..=1.0, got {}", name, p);
            }
        }
        if self.audit.concurrency == 0 {
            anyhow::bail!("audit.concurrency must be at least 1");
        }
        if self.probe.timeout_ms == 0 {
            anyhow::bail!("probe.timeout_ms must be positive");
        }
        Ok(())
    }

    /// Save default config to path (for init)
    pub fn save_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}
