//! Bounded, opt-in recorder of turn outcomes.
//!
//! Recording is off by default. When the debug flag is set, each turn is
//! kept in a ring buffer (oldest dropped first) and forwarded to the
//! optional [`TelemetrySink`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tutorlane_types::config::TelemetryConfig;
use tutorlane_types::telemetry::{TelemetryEntry, TelemetrySummary};

/// Write-only receiver of telemetry entries (file, database, ...).
///
/// Implementations must not block for long; they are called on the turn path.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, entry: &TelemetryEntry);
}

/// Upper bound on entries kept in memory.
pub const MAX_TELEMETRY_ENTRIES: usize = 50;

pub struct TelemetryLogger {
    enabled: AtomicBool,
    capacity: usize,
    entries: Mutex<VecDeque<TelemetryEntry>>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl std::fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("enabled", &self.is_enabled())
            .field("capacity", &self.capacity)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl TelemetryLogger {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_TELEMETRY_ENTRIES);
        Self {
            enabled: AtomicBool::new(enabled),
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            sink: None,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.debug, config.capacity)
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn log_turn(&self, entry: TelemetryEntry) {
        if !self.is_enabled() {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.record(&entry);
        }
        let mut entries = self.entries.lock().expect("telemetry lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Up to `n` most recent entries, oldest first.
    pub fn get_recent(&self, n: usize) -> Vec<TelemetryEntry> {
        let entries = self.entries.lock().expect("telemetry lock poisoned");
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("telemetry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> TelemetrySummary {
        let entries = self.entries.lock().expect("telemetry lock poisoned");
        let total = entries.len();
        if total == 0 {
            return TelemetrySummary::default();
        }

        let fallback_count = entries.iter().filter(|e| e.used_fallback).count();
        let cache_hit_count = entries.iter().filter(|e| e.used_cache).count();
        let gated_count = entries.iter().filter(|e| e.gate_reason.is_some()).count();
        let error_count = entries.iter().filter(|e| e.error.is_some()).count();
        let latency: u64 = entries.iter().map(|e| e.latency_ms).sum();
        let retries: u64 = entries.iter().map(|e| u64::from(e.retry_count)).sum();
        let total_tokens: u64 = entries.iter().map(|e| u64::from(e.tokens_used)).sum();
        let n = total as f64;

        TelemetrySummary {
            total_turns: total,
            fallback_count,
            cache_hit_count,
            gated_count,
            error_count,
            fallback_rate: fallback_count as f64 / n,
            cache_hit_rate: cache_hit_count as f64 / n,
            avg_latency_ms: latency as f64 / n,
            avg_retries: retries as f64 / n,
            total_tokens,
        }
    }
}
