//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use loadpulse_core::error::{Result, LoadpulseError};

pub use schema::{
    ListenSection, LoadpulseConfig, OrchestratorSection, RuntimeSection, WorkloadSection,
};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "LOADPULSE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "loadpulse.yaml";

/// Load from `$LOADPULSE_CONFIG` (or `loadpulse.yaml`). A missing file means defaults.
pub fn load() -> Result<LoadpulseConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match fs::read_to_string(&path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            Ok(LoadpulseConfig::default())
        }
        Err(e) => Err(LoadpulseError::Internal(format!("read config failed: {e}"))),
    }
}

pub fn load_from_file(path: &str) -> Result<LoadpulseConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| LoadpulseError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<LoadpulseConfig> {
    let cfg: LoadpulseConfig = serde_yaml::from_str(s)
        .map_err(|e| LoadpulseError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
