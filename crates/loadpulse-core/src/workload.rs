//! Workload request model.
//!
//! A trigger body is parsed once into a validated [`WorkloadRequest`]; the
//! server never touches metrics for a request that fails here.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{LoadpulseError, Result};

/// Default mixed-mode CPU share.
pub const DEFAULT_RATIO: f64 = 0.5;

/// Which task primitive(s) a worker loop dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadMode {
    Cpu,
    Io,
    Mixed,
}

impl WorkloadMode {
    pub const ALL: [WorkloadMode; 3] = [WorkloadMode::Cpu, WorkloadMode::Io, WorkloadMode::Mixed];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadMode::Cpu => "cpu",
            WorkloadMode::Io => "io",
            WorkloadMode::Mixed => "mixed",
        }
    }

    /// Metric label value (`{mode}_node`).
    pub fn label(self) -> &'static str {
        match self {
            WorkloadMode::Cpu => "cpu_node",
            WorkloadMode::Io => "io_node",
            WorkloadMode::Mixed => "mixed_node",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            WorkloadMode::Cpu => "CPU",
            WorkloadMode::Io => "IO",
            WorkloadMode::Mixed => "CPU+IO",
        }
    }
}

impl fmt::Display for WorkloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadMode {
    type Err = LoadpulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(WorkloadMode::Cpu),
            "io" => Ok(WorkloadMode::Io),
            "mixed" => Ok(WorkloadMode::Mixed),
            other => Err(LoadpulseError::BadRequest(format!("unknown workload mode: {other}"))),
        }
    }
}

/// Raw trigger body. Every field is optional; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct TriggerBody {
    #[serde(default)]
    workers: Option<u64>,
    #[serde(default)]
    ops: Option<u64>,
    #[serde(default)]
    ratio: Option<f64>,
}

/// A validated workload trigger. Created per request and consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadRequest {
    pub mode: WorkloadMode,
    /// Requested worker count (>= 1).
    pub workers: u64,
    /// Total requested operations (>= 1).
    pub ops: u64,
    /// CPU share for mixed mode, in `[0, 1]`. Ignored by other modes.
    pub ratio: f64,
}

impl WorkloadRequest {
    pub fn new(mode: WorkloadMode, workers: u64, ops: u64, ratio: f64) -> Result<Self> {
        let req = Self { mode, workers, ops, ratio };
        req.validate()?;
        Ok(req)
    }

    /// Parse a JSON trigger body. An empty (or whitespace-only) body yields defaults.
    pub fn from_json(mode: WorkloadMode, body: &[u8]) -> Result<Self> {
        let parsed: TriggerBody = if body.iter().all(u8::is_ascii_whitespace) {
            TriggerBody::default()
        } else {
            serde_json::from_slice(body)
                .map_err(|e| LoadpulseError::BadRequest(format!("invalid json body: {e}")))?
        };

        let ratio = match mode {
            WorkloadMode::Mixed => parsed.ratio.unwrap_or(DEFAULT_RATIO),
            _ => DEFAULT_RATIO,
        };
        Self::new(mode, parsed.workers.unwrap_or(1), parsed.ops.unwrap_or(1), ratio)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(LoadpulseError::BadRequest("workers must be >= 1".into()));
        }
        if self.ops == 0 {
            return Err(LoadpulseError::BadRequest("ops must be >= 1".into()));
        }
        if !self.ratio.is_finite() || !(0.0..=1.0).contains(&self.ratio) {
            return Err(LoadpulseError::BadRequest("ratio must be between 0 and 1".into()));
        }
        Ok(())
    }

    /// `floor(ops / workers)`; may be zero when workers exceed ops.
    pub fn ops_per_worker(&self) -> u64 {
        self.ops / self.workers
    }

    /// Plain-text confirmation returned once the run completes.
    pub fn confirmation(&self) -> String {
        let base = format!(
            "Triggered {} workload: workers={}, ops={}",
            self.mode.display_name(),
            self.workers,
            self.ops
        );
        match self.mode {
            WorkloadMode::Mixed => format!("{base}, ratio={}", self.ratio),
            _ => base,
        }
    }
}
