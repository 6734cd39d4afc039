use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use loadpulse_core::error::{Result, LoadpulseError};

use crate::workload::{CpuTaskKind, TaskProfile, WorkerSettings};

const MAX_TASK_MS: f64 = 10_000.0;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadpulseConfig {
    pub version: u32,

    #[serde(default = "ListenSection::api")]
    pub api: ListenSection,

    #[serde(default = "ListenSection::metrics")]
    pub metrics: ListenSection,

    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub workload: WorkloadSection,

    #[serde(default)]
    pub orchestrator: OrchestratorSection,
}

impl Default for LoadpulseConfig {
    fn default() -> Self {
        Self {
            version: 1,
            api: ListenSection::api(),
            metrics: ListenSection::metrics(),
            runtime: RuntimeSection::default(),
            workload: WorkloadSection::default(),
            orchestrator: OrchestratorSection::default(),
        }
    }
}

impl LoadpulseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(LoadpulseError::UnsupportedVersion);
        }
        self.api.addr("api")?;
        self.metrics.addr("metrics")?;
        self.runtime.validate()?;
        self.workload.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenSection {
    pub listen: String,
}

impl ListenSection {
    fn api() -> Self {
        Self { listen: "0.0.0.0:9091".into() }
    }

    fn metrics() -> Self {
        Self { listen: "0.0.0.0:9092".into() }
    }

    /// Parsed listen address; `section` names the key in errors.
    pub fn addr(&self, section: &str) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            LoadpulseError::BadRequest(format!("{section}.listen must be a valid SocketAddr: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// 1 keeps everything on a single cooperative thread.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self { worker_threads: default_worker_threads() }
    }
}

impl RuntimeSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.worker_threads) {
            return Err(LoadpulseError::BadRequest(
                "runtime.worker_threads must be between 1 and 256".into(),
            ));
        }
        Ok(())
    }
}

fn default_worker_threads() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadSection {
    #[serde(default)]
    pub cpu_task: CpuTaskKind,

    #[serde(default = "default_cpu_min_ms")]
    pub cpu_min_ms: f64,

    #[serde(default = "default_cpu_max_ms")]
    pub cpu_max_ms: f64,

    #[serde(default = "default_io_delay_ms")]
    pub io_delay_ms: f64,

    #[serde(default = "default_yield_every")]
    pub yield_every: u64,
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            cpu_task: CpuTaskKind::default(),
            cpu_min_ms: default_cpu_min_ms(),
            cpu_max_ms: default_cpu_max_ms(),
            io_delay_ms: default_io_delay_ms(),
            yield_every: default_yield_every(),
        }
    }
}

impl WorkloadSection {
    pub fn validate(&self) -> Result<()> {
        let cpu_range_ok = self.cpu_min_ms > 0.0
            && self.cpu_min_ms <= self.cpu_max_ms
            && self.cpu_max_ms <= MAX_TASK_MS;
        if !cpu_range_ok {
            return Err(LoadpulseError::BadRequest(
                "workload.cpu_min_ms/cpu_max_ms must satisfy 0 < min <= max <= 10000".into(),
            ));
        }
        if !(0.0..=MAX_TASK_MS).contains(&self.io_delay_ms) {
            return Err(LoadpulseError::BadRequest(
                "workload.io_delay_ms must be between 0 and 10000".into(),
            ));
        }
        if self.yield_every == 0 {
            return Err(LoadpulseError::BadRequest("workload.yield_every must be >= 1".into()));
        }
        Ok(())
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            profile: TaskProfile {
                cpu_task: self.cpu_task,
                cpu_min: ms(self.cpu_min_ms),
                cpu_max: ms(self.cpu_max_ms),
                io_delay: ms(self.io_delay_ms),
                ..TaskProfile::default()
            },
            yield_every: self.yield_every,
        }
    }
}

fn ms(v: f64) -> Duration {
    Duration::from_nanos((v * 1_000_000.0).round() as u64)
}

fn default_cpu_min_ms() -> f64 {
    2.5
}
fn default_cpu_max_ms() -> f64 {
    5.0
}
fn default_io_delay_ms() -> f64 {
    2.5
}
fn default_yield_every() -> u64 {
    crate::workload::worker::DEFAULT_YIELD_EVERY
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSection {
    /// Run one loop per requested worker instead of a single loop.
    #[serde(default)]
    pub fan_out: bool,
}
