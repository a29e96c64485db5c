use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sink for per-read latency, injected into every capture source.
///
/// Sources call `record_read` once per successful `read()` with the wall
/// time the call took. Sinks are shared (`Arc`) between the resolver's
/// probes and the caller, so recording goes through `&self`.
pub trait ReadMetrics: Send + Sync {
    fn record_read(&self, elapsed: Duration);
}

/// Convenience for sources: time from `start` until now.
pub(crate) fn record_since(metrics: &dyn ReadMetrics, start: Instant) {
    metrics.record_read(start.elapsed());
}

/// Discards every measurement.
pub struct NullReadMetrics;

impl ReadMetrics for NullReadMetrics {
    fn record_read(&self, _elapsed: Duration) {}
}

/// Point-in-time view of [`LatencyMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencySnapshot {
    pub reads: usize,
    pub total: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl LatencySnapshot {
    pub fn average_ms(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / self.reads as f64
        }
    }
}

/// Accumulates read latency for end-of-run reporting.
#[derive(Default)]
pub struct LatencyMetrics {
    stats: Mutex<LatencySnapshot>,
}

impl LatencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn count(&self) -> usize {
        self.snapshot().reads
    }

    pub fn average_ms(&self) -> f64 {
        self.snapshot().average_ms()
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        let stats = self.snapshot();
        if stats.reads == 0 {
            return None;
        }
        let ms = |d: Option<Duration>| d.map_or(0.0, |d| d.as_secs_f64() * 1000.0);
        Some(format!(
            "Read latency ({} frames): avg {:.1}ms  min {:.1}ms  max {:.1}ms  total {:.0}ms",
            stats.reads,
            stats.average_ms(),
            ms(stats.min),
            ms(stats.max),
            stats.total.as_secs_f64() * 1000.0,
        ))
    }

    pub fn log_summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}

impl ReadMetrics for LatencyMetrics {
    fn record_read(&self, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.reads += 1;
        stats.total += elapsed;
        stats.min = Some(stats.min.map_or(elapsed, |m| m.min(elapsed)));
        stats.max = Some(stats.max.map_or(elapsed, |m| m.max(elapsed)));
    }
}
