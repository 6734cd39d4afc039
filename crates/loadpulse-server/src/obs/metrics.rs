//! In-process metric registry for workload runs.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors and series are rendered in
//! sorted order so the exposition output is deterministic. Every accumulator
//! is atomic, so concurrent worker loops can record without locking.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Prometheus text exposition content type.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Latency bucket bounds in seconds.
pub const LATENCY_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0];

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

/// Snapshot of a map's entries, sorted by label set.
fn sorted_series<V, T>(map: &DashMap<LabelKey, V>, read: impl Fn(&V) -> T) -> Vec<(LabelKey, T)> {
    let mut rows: Vec<_> = map.iter().map(|r| (r.key().clone(), read(r.value()))).collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

/// Render a float the way Prometheus expects (`+Inf`, `NaN`, plain decimals).
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        format!("{}", v)
    }
}

/// `count` bounds starting at `start`, each `factor` times the previous one.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        out.push(next);
        next *= factor;
    }
    out
}

/// Heap bucket bounds in KB: 20 buckets from 10 KB, growth 1.5.
pub fn heap_buckets() -> Vec<f64> {
    exponential_buckets(10.0, 1.5, 20)
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value; zero for a label set never observed.
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "counter");
        for (key, val) in sorted_series(&self.map, |c| c.load(Ordering::Relaxed)) {
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(&key), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "gauge");
        for (key, val) in sorted_series(&self.map, |g| g.load(Ordering::Relaxed)) {
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(&key), val);
        }
    }
}

/// One labelled histogram series. `sum` holds the bits of an `f64`.
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0f64.to_bits()),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn add_sum(&self, v: f64) {
        let mut cur = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + v).to_bits();
            match self
                .sum
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }

    fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum: f64::from_bits(self.sum.load(Ordering::Relaxed)),
            buckets: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
        }
    }
}

/// Point-in-time read of one histogram series. Bucket counts are cumulative.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    pub buckets: Vec<u64>,
}

pub struct HistogramVec {
    bounds: Vec<f64>,
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// `bounds` must be ascending; `+Inf` is implicit.
    pub fn new(bounds: Vec<f64>) -> Self {
        Self {
            bounds,
            map: DashMap::new(),
        }
    }

    /// Observe a value and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], v: f64) {
        let n = self.bounds.len();
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicHistogram::new(n));

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.add_sum(v);

        // Cumulative: every bucket whose bound is >= v.
        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self, labels: &[(&str, &str)]) -> Option<HistogramSnapshot> {
        self.map.get(&label_key(labels)).map(|h| h.snapshot())
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "histogram");
        for (key, snap) in sorted_series(&self.map, AtomicHistogram::snapshot) {
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (le, count) in self.bounds.iter().zip(&snap.buckets) {
                let le = format_float(*le);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, snap.count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, format_float(snap.sum));
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, snap.count);
        }
    }
}

/// Process-wide workload instruments, shared by every worker loop.
pub struct WorkloadMetrics {
    pub ops: CounterVec,
    pub latency: HistogramVec, // seconds
    pub heap: HistogramVec,    // KB
    pub runs_in_flight: GaugeVec,
    pub rejected_requests: CounterVec,
    draining: AtomicBool,
}

impl Default for WorkloadMetrics {
    fn default() -> Self {
        Self {
            ops: CounterVec::default(),
            latency: HistogramVec::new(LATENCY_BUCKETS.to_vec()),
            heap: HistogramVec::new(heap_buckets()),
            runs_in_flight: GaugeVec::default(),
            rejected_requests: CounterVec::default(),
            draining: AtomicBool::new(false),
        }
    }
}

impl WorkloadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed operation.
    pub fn record_op(&self, label: &str, elapsed_secs: f64) {
        let labels = [("type", label)];
        self.ops.inc(&labels);
        self.latency.observe(&labels, elapsed_secs);
    }

    pub fn record_heap(&self, label: &str, heap_kb: f64) {
        self.heap.observe(&[("type", label)], heap_kb);
    }

    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    /// Render all registered metrics plus any extra gauge lines provided by callers.
    pub fn render(&self, extra: &[(&str, &str, f64)]) -> String {
        let mut out = String::new();
        self.ops.render("workload_ops_total", "Total number of operations executed", &mut out);
        self.latency.render(
            "workload_latency_seconds",
            "Latency of each operation in seconds",
            &mut out,
        );
        self.heap.render(
            "workload_heap_kb",
            "Heap usage in KB sampled after each worker run",
            &mut out,
        );
        self.runs_in_flight.render(
            "workload_runs_in_flight",
            "Worker loops currently executing",
            &mut out,
        );
        self.rejected_requests.render(
            "workload_rejected_requests_total",
            "Trigger requests rejected before any work ran",
            &mut out,
        );

        write_header(
            &mut out,
            "loadpulse_draining",
            "Whether the server is shutting down",
            "gauge",
        );
        let _ = writeln!(out, "loadpulse_draining {}", if self.is_draining() { 1 } else { 0 });

        for (name, help, v) in extra {
            write_header(&mut out, name, help, "gauge");
            let _ = writeln!(out, "{} {}", name, format_float(*v));
        }
        out
    }
}
