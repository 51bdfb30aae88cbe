//! In-process chain metrics.
//!
//! Every `generate_chain` call records one [`ChainEvent`]; fallbacks also
//! record a [`FallbackEvent`]. Both buffers are bounded; the totals are
//! kept in separate counters and never roll off.
//!
//! # Example
//!
//! ```
//! use deep_thinking::metrics::{ChainEvent, ChainMetrics};
//! use deep_thinking::selector::ThinkingMode;
//!
//! let metrics = ChainMetrics::new();
//! metrics.record(ChainEvent::new(ThinkingMode::Hybrid, 120, 4));
//! metrics.record(ChainEvent::new(ThinkingMode::Hybrid, 80, 2));
//! metrics.record(ChainEvent::new(ThinkingMode::Fast, 10, 1).fallback());
//!
//! let summary = metrics.summary();
//! assert_eq!(summary.total_chains, 3);
//! assert_eq!(summary.fallback_count, 1);
//! assert_eq!(summary.by_mode["hybrid"].count, 2);
//! ```

#![allow(clippy::cast_precision_loss)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::selector::ThinkingMode;

/// Chain events kept for summaries.
const MAX_EVENTS: usize = 10_000;

/// Fallback events kept for inspection.
const MAX_FALLBACKS: usize = 100;

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// One finished chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Mode the chain ran under.
    pub mode: ThinkingMode,
    /// Wall-clock processing time.
    pub latency_ms: u64,
    /// Steps in the finished chain.
    pub steps: usize,
    /// Minimal fallback chain.
    pub fallback: bool,
    /// Search stopped on cancellation.
    pub cancelled: bool,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
}

impl ChainEvent {
    /// Create an event.
    #[must_use]
    pub fn new(mode: ThinkingMode, latency_ms: u64, steps: usize) -> Self {
        Self {
            mode,
            latency_ms,
            steps,
            fallback: false,
            cancelled: false,
            timestamp: unix_millis(),
        }
    }

    /// Mark as a fallback chain.
    #[must_use]
    pub const fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Mark as cancelled.
    #[must_use]
    pub const fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

/// Why a chain fell back to the minimal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEvent {
    /// Chain that fell back.
    pub chain_id: String,
    /// Failure description.
    pub reason: String,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
}

impl FallbackEvent {
    /// Create an event.
    #[must_use]
    pub fn new(chain_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            reason: reason.into(),
            timestamp: unix_millis(),
        }
    }
}

/// Per-mode statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeSummary {
    /// Chains produced.
    pub count: u64,
    /// Mean latency.
    pub avg_latency_ms: f64,
    /// Fastest chain.
    pub min_latency_ms: u64,
    /// Slowest chain.
    pub max_latency_ms: u64,
    /// Mean step count.
    pub mean_steps: f64,
}

/// Snapshot of all metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Chains recorded since creation or the last [`ChainMetrics::clear`].
    pub total_chains: u64,
    /// Keyed by mode name, over the retained event window.
    pub by_mode: HashMap<String, ModeSummary>,
    /// Fallback chains since creation or the last clear.
    pub fallback_count: u64,
    /// Cancelled searches since creation or the last clear.
    pub cancellation_count: u64,
    /// Most recent fallback reasons, oldest first.
    pub recent_fallbacks: Vec<FallbackEvent>,
}

/// Thread-safe collector shared by an orchestrator.
#[derive(Debug, Default)]
pub struct ChainMetrics {
    events: RwLock<VecDeque<ChainEvent>>,
    fallbacks: RwLock<VecDeque<FallbackEvent>>,
    total: AtomicU64,
    fallback_total: AtomicU64,
    cancelled_total: AtomicU64,
}

impl ChainMetrics {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished chain.
    pub fn record(&self, event: ChainEvent) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if event.fallback {
            self.fallback_total.fetch_add(1, Ordering::Relaxed);
        }
        if event.cancelled {
            self.cancelled_total.fetch_add(1, Ordering::Relaxed);
        }

        match self.events.write() {
            Ok(mut events) => {
                if events.len() >= MAX_EVENTS {
                    events.pop_front();
                }
                events.push_back(event);
            }
            Err(poison_error) => {
                tracing::error!(
                    mode = %event.mode,
                    error = %poison_error,
                    "Failed to record chain event: RwLock poisoned"
                );
            }
        }
    }

    /// Record why a chain fell back.
    pub fn record_fallback(&self, fallback: FallbackEvent) {
        match self.fallbacks.write() {
            Ok(mut fallbacks) => {
                if fallbacks.len() >= MAX_FALLBACKS {
                    fallbacks.pop_front();
                }
                fallbacks.push_back(fallback);
            }
            Err(poison_error) => {
                tracing::error!(
                    chain_id = %fallback.chain_id,
                    error = %poison_error,
                    "Failed to record fallback event: RwLock poisoned"
                );
            }
        }
    }

    /// Compute a summary.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let events: Vec<ChainEvent> = match self.events.read() {
            Ok(e) => e.iter().cloned().collect(),
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Reading events from poisoned lock, using recovered data"
                );
                poison_error.into_inner().iter().cloned().collect()
            }
        };

        let mut grouped: HashMap<ThinkingMode, Vec<&ChainEvent>> = HashMap::new();
        for event in &events {
            grouped.entry(event.mode).or_default().push(event);
        }

        let by_mode = grouped
            .into_iter()
            .map(|(mode, mode_events)| {
                let count = mode_events.len() as u64;
                let total_latency: u64 = mode_events.iter().map(|e| e.latency_ms).sum();
                let total_steps: usize = mode_events.iter().map(|e| e.steps).sum();
                let summary = ModeSummary {
                    count,
                    avg_latency_ms: total_latency as f64 / count as f64,
                    min_latency_ms: mode_events.iter().map(|e| e.latency_ms).min().unwrap_or(0),
                    max_latency_ms: mode_events.iter().map(|e| e.latency_ms).max().unwrap_or(0),
                    mean_steps: total_steps as f64 / count as f64,
                };
                (mode.as_str().to_string(), summary)
            })
            .collect();

        MetricsSummary {
            total_chains: self.total.load(Ordering::Relaxed),
            by_mode,
            fallback_count: self.fallback_total.load(Ordering::Relaxed),
            cancellation_count: self.cancelled_total.load(Ordering::Relaxed),
            recent_fallbacks: self.fallbacks(),
        }
    }

    /// Recent fallback events, oldest first.
    #[must_use]
    pub fn fallbacks(&self) -> Vec<FallbackEvent> {
        self.fallbacks
            .read()
            .map(|f| f.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.fallback_total.store(0, Ordering::Relaxed);
        self.cancelled_total.store(0, Ordering::Relaxed);
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
        if let Ok(mut fallbacks) = self.fallbacks.write() {
            fallbacks.clear();
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_chain_event_new() {
        let event = ChainEvent::new(ThinkingMode::Deliberate, 300, 5);
        assert_eq!(event.mode, ThinkingMode::Deliberate);
        assert_eq!(event.steps, 5);
        assert!(!event.fallback);
        assert!(!event.cancelled);
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = ChainMetrics::new().summary();
        assert_eq!(summary.total_chains, 0);
        assert!(summary.by_mode.is_empty());
        assert!(summary.recent_fallbacks.is_empty());
    }

    #[test]
    fn test_mode_summary_latency_and_steps() {
        let metrics = ChainMetrics::new();
        metrics.record(ChainEvent::new(ThinkingMode::Hybrid, 100, 3));
        metrics.record(ChainEvent::new(ThinkingMode::Hybrid, 300, 5));
        metrics.record(ChainEvent::new(ThinkingMode::Fast, 20, 1).cancelled());

        let summary = metrics.summary();
        let hybrid = &summary.by_mode["hybrid"];
        assert_eq!(hybrid.count, 2);
        assert_eq!(hybrid.avg_latency_ms, 200.0);
        assert_eq!(hybrid.min_latency_ms, 100);
        assert_eq!(hybrid.max_latency_ms, 300);
        assert_eq!(hybrid.mean_steps, 4.0);
        assert_eq!(summary.cancellation_count, 1);
        assert_eq!(summary.fallback_count, 0);
    }

    #[test]
    fn test_fallback_buffer_is_bounded() {
        let metrics = ChainMetrics::new();
        for i in 0..(MAX_FALLBACKS + 5) {
            metrics.record_fallback(FallbackEvent::new(format!("c-{i}"), "boom"));
        }
        let fallbacks = metrics.fallbacks();
        assert_eq!(fallbacks.len(), MAX_FALLBACKS);
        assert_eq!(fallbacks[0].chain_id, "c-5");
    }

    #[test]
    fn test_totals_survive_event_buffer_rollover() {
        let metrics = ChainMetrics::new();
        for i in 0..(MAX_EVENTS + 5) {
            let event = ChainEvent::new(ThinkingMode::Hybrid, 10, 2);
            metrics.record(if i < 3 { event.fallback().cancelled() } else { event });
        }

        let summary = metrics.summary();
        assert_eq!(summary.total_chains, (MAX_EVENTS + 5) as u64);
        assert_eq!(summary.fallback_count, 3);
        assert_eq!(summary.cancellation_count, 3);
        assert_eq!(summary.by_mode["hybrid"].count, MAX_EVENTS as u64);
    }

    #[test]
    fn test_clear() {
        let metrics = ChainMetrics::new();
        metrics.record(ChainEvent::new(ThinkingMode::Fast, 1, 1));
        metrics.record_fallback(FallbackEvent::new("c", "r"));
        metrics.record(ChainEvent::new(ThinkingMode::Fast, 1, 1).fallback());
        metrics.clear();
        let summary = metrics.summary();
        assert_eq!(summary.total_chains, 0);
        assert_eq!(summary.fallback_count, 0);
        assert!(metrics.fallbacks().is_empty());
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(ChainMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        metrics.record(ChainEvent::new(ThinkingMode::Deliberate, 5, 3));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.summary().total_chains, 400);
    }
}
