//! Backend-agnostic metrics via a pluggable sink.
//!
//! Only compiled with the `observability` feature (on by default).
//!
//! Implement [`MetricsSink`] and install it with [`set_sink`]; every call to
//! `PolicyEngine::evaluate` and `PolicyEngine::reload` then reports to it.
//! With no sink installed, reporting is a no-op.
//!
//! ```ignore
//! use canopy_core::metrics::{EvaluationStats, MetricsSink, ReloadStats};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! struct Counter(AtomicU64);
//!
//! impl MetricsSink for Counter {
//!     fn on_evaluation(&self, stats: &EvaluationStats) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//!     fn on_reload(&self, _stats: &ReloadStats) {}
//! }
//!
//! canopy_core::metrics::set_sink(Arc::new(Counter(AtomicU64::new(0))));
//! ```

use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tracing::warn;

/// One completed evaluation, passed to [`MetricsSink::on_evaluation`].
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStats {
    /// Wall-clock time for the whole evaluation.
    pub duration: Duration,
    pub allowed: bool,
    /// Principal uid, e.g. `User::"alice"`.
    pub principal_id: String,
    /// Action uid, e.g. `Action::"view"`.
    pub action_id: String,
    /// Ids of the policies that determined the decision.
    pub reasons: Vec<String>,
    /// Number of policies whose conditions failed to evaluate.
    pub errors: usize,
}

/// Evaluation time split by phase, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationPhases {
    /// Scope matching across all policies.
    pub scope_ms: f64,
    /// Condition evaluation for policies whose scope matched.
    pub conditions_ms: f64,
    pub total_ms: f64,
}

impl EvaluationPhases {
    /// Time not accounted for by the measured phases.
    pub fn overhead_ms(&self) -> f64 {
        self.total_ms - (self.scope_ms + self.conditions_ms)
    }
}

/// A completed snapshot swap, passed to [`MetricsSink::on_reload`].
#[derive(Debug, Clone, Serialize)]
pub struct ReloadStats {
    pub reload_time: SystemTime,
    /// Number of policies in the new snapshot.
    pub policies: usize,
    /// Content hash of the new snapshot.
    pub hash: String,
}

/// Consumer of evaluation and reload metrics.
///
/// Called synchronously on the evaluation path, possibly from many threads
/// at once; implementations should be cheap and must not block.
pub trait MetricsSink: Send + Sync {
    fn on_evaluation(&self, stats: &EvaluationStats);

    fn on_reload(&self, stats: &ReloadStats);

    /// Per-phase timings for the same evaluation. Ignored by default.
    fn on_evaluation_phases(&self, _stats: &EvaluationStats, _phases: &EvaluationPhases) {}
}

static SINK: RwLock<Option<Arc<dyn MetricsSink>>> = RwLock::new(None);

/// Install the process-wide sink, replacing any previous one.
pub fn set_sink(sink: Arc<dyn MetricsSink>) {
    match SINK.write() {
        Ok(mut slot) => *slot = Some(sink),
        Err(_) => warn!(event = "Metrics", phase = "Install", "metrics sink lock poisoned"),
    }
}

/// Remove the installed sink; subsequent events are dropped.
pub fn clear_sink() {
    if let Ok(mut slot) = SINK.write() {
        *slot = None;
    }
}

fn sink() -> Option<Arc<dyn MetricsSink>> {
    SINK.read().ok().and_then(|slot| slot.clone())
}

pub(crate) fn record_evaluation(stats: EvaluationStats, phases: Option<EvaluationPhases>) {
    let Some(sink) = sink() else {
        return;
    };
    sink.on_evaluation(&stats);
    if let Some(phases) = phases {
        sink.on_evaluation_phases(&stats, &phases);
    }
}

pub(crate) fn record_reload(policies: usize, hash: String) {
    if let Some(sink) = sink() {
        sink.on_reload(&ReloadStats {
            reload_time: SystemTime::now(),
            policies,
            hash,
        });
    }
}

/// RAII timer that adds the elapsed time to `slot` when dropped.
///
/// ```ignore
/// let mut scope = Duration::ZERO;
/// {
///     let _timer = PhaseTimer::new(&mut scope);
///     // ... measured work ...
/// }
/// ```
pub struct PhaseTimer<'a> {
    start: Instant,
    slot: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(slot: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        *self.slot += self.start.elapsed();
    }
}

pub(crate) fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}
