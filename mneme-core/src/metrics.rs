//! Per-turn token metrics and cross-policy comparison

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::accounting::CountingMode;

/// Token accounting for one completed turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TurnMetrics {
    /// 0-indexed turn number within the session
    pub turn_index: usize,

    /// Tokens in the outgoing view, as measured before the delegate call
    pub prompt_tokens: usize,

    /// Tokens in the assistant response
    pub response_tokens: usize,

    /// Measurement basis that produced these counts
    pub counting_mode: CountingMode,
}

impl TurnMetrics {
    pub fn total(&self) -> usize {
        self.prompt_tokens + self.response_tokens
    }
}

/// Aggregated token totals for one policy label
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PolicyTotals {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunKey {
    session: String,
    policy: String,
}

/// Append-only recorder of turn metrics, keyed by (session, policy)
pub struct MetricsRecorder {
    runs: RwLock<HashMap<RunKey, Vec<TurnMetrics>>>,
}

impl MetricsRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }

    /// Record one turn for a (session, policy) run.
    pub async fn record(&self, session_id: &str, policy: &str, metrics: TurnMetrics) {
        let key = RunKey {
            session: session_id.to_string(),
            policy: policy.to_string(),
        };

        let mut runs = self.runs.write().await;
        runs.entry(key).or_default().push(metrics);
    }

    /// Per-turn history for one (session, policy) run.
    pub async fn turns(&self, session_id: &str, policy: &str) -> Vec<TurnMetrics> {
        let key = RunKey {
            session: session_id.to_string(),
            policy: policy.to_string(),
        };

        let runs = self.runs.read().await;
        runs.get(&key).cloned().unwrap_or_default()
    }

    /// Token totals across every session recorded under a policy label.
    pub async fn totals(&self, policy: &str) -> PolicyTotals {
        let runs = self.runs.read().await;
        let mut totals = PolicyTotals::default();

        for (key, turns) in runs.iter() {
            if key.policy != policy {
                continue;
            }
            for turn in turns {
                totals.prompt_tokens += turn.prompt_tokens as u64;
                totals.response_tokens += turn.response_tokens as u64;
            }
        }

        totals.total = totals.prompt_tokens + totals.response_tokens;
        totals
    }

    /// Percentage of tokens saved by `other` relative to `baseline`.
    ///
    /// Returns 0.0 when the baseline recorded nothing.
    pub async fn savings(&self, baseline: &str, other: &str) -> f64 {
        let baseline_totals = self.totals(baseline).await;
        if baseline_totals.total == 0 {
            return 0.0;
        }

        let other_totals = self.totals(other).await;
        (baseline_totals.total as f64 - other_totals.total as f64)
            / baseline_totals.total as f64
            * 100.0
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
