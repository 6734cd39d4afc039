//! Default process metrics appended to every exposition.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Captures process start so uptime can be reported on each scrape.
pub struct ProcessCollector {
    started: Instant,
    start_unix_secs: f64,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    pub fn new() -> Self {
        let start_unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            started: Instant::now(),
            start_unix_secs,
        }
    }

    /// `(name, help, value)` gauge lines, read fresh on every call.
    pub fn collect(&self) -> Vec<(&'static str, &'static str, f64)> {
        let mut out = vec![
            (
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds",
                self.start_unix_secs,
            ),
            (
                "process_uptime_seconds",
                "Seconds since the process started",
                self.started.elapsed().as_secs_f64(),
            ),
        ];
        if let Some(rss) = resident_memory_bytes() {
            out.push((
                "process_resident_memory_bytes",
                "Resident memory size in bytes",
                rss as f64,
            ));
        }
        if let Some(heap) = super::alloc::tracked_heap_bytes() {
            out.push(("process_heap_bytes", "Live heap size in bytes", heap as f64));
        }
        out
    }
}

/// Resident set size from `VmRSS` in `/proc/self/status`.
#[cfg(target_os = "linux")]
pub fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

#[cfg(not(target_os = "linux"))]
pub fn resident_memory_bytes() -> Option<u64> {
    None
}

/// `VmRSS:    1234 kB` -> bytes. The kernel always reports this field in kB.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find_map(|l| l.strip_prefix("VmRSS:"))?;
    let mut fields = line.split_whitespace();
    let kb: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(kb * 1024),
        Some(_) => None,
    }
}
