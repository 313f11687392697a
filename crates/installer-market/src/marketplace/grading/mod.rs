mod aggregate;
mod classify;
mod config;

pub use aggregate::EvaluationStats;
pub use config::{GradingConfig, GradingConfigError, TierThreshold};

use chrono::{DateTime, Utc};

use super::domain::{Evaluation, GradeTier, WorkerGrade, WorkerId};

/// Stateless evaluator that applies the grading rubric to an evaluation set.
///
/// Every call recomputes from the full set it is given, so concurrent or
/// scheduled recalculations over the same snapshot converge on one answer.
#[derive(Debug, Clone)]
pub struct GradingEngine {
    config: GradingConfig,
}

impl GradingEngine {
    pub fn new(config: GradingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    /// Order of `evaluations` does not affect the result. `now` anchors the
    /// recency window.
    pub fn aggregate(&self, evaluations: &[Evaluation], now: DateTime<Utc>) -> EvaluationStats {
        aggregate::aggregate(evaluations, now, &self.config)
    }

    pub fn classify(&self, stats: &EvaluationStats) -> Option<GradeTier> {
        classify::classify(stats, &self.config)
    }

    /// Builds the stored grade for a contractor. A contractor with nothing
    /// to average has no grade record at all.
    pub fn grade(
        &self,
        worker_id: &WorkerId,
        evaluations: &[Evaluation],
        now: DateTime<Utc>,
    ) -> Option<WorkerGrade> {
        let stats = self.aggregate(evaluations, now);
        let average_rating = stats.average_rating?;
        Some(WorkerGrade {
            worker_id: worker_id.clone(),
            average_rating,
            total_evaluations: stats.total_evaluations,
            recent_negative_count: stats.recent_negative_count,
            tier: self.classify(&stats),
            last_recalculated_at: now,
        })
    }
}

impl Default for GradingEngine {
    fn default() -> Self {
        Self::new(GradingConfig::default())
    }
}
