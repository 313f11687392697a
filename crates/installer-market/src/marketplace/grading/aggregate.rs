use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::super::domain::Evaluation;
use super::config::GradingConfig;

/// Statistics folded from a contractor's full evaluation history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// One decimal place; `None` when nothing could be averaged.
    pub average_rating: Option<f64>,
    pub total_evaluations: u32,
    pub recent_negative_count: u32,
}

impl EvaluationStats {
    pub const EMPTY: Self = Self {
        average_rating: None,
        total_evaluations: 0,
        recent_negative_count: 0,
    };
}

pub(crate) fn aggregate(
    evaluations: &[Evaluation],
    now: DateTime<Utc>,
    config: &GradingConfig,
) -> EvaluationStats {
    // a window reaching past the calendar range has no lower bound
    let window_start = Duration::try_days(config.recency_window_days)
        .and_then(|window| now.checked_sub_signed(window));
    let negative_threshold =
        Decimal::from_f64(config.negative_rating_threshold).unwrap_or(Decimal::ZERO);

    let mut averages = Vec::with_capacity(evaluations.len());
    let mut recent_negative_count = 0u32;
    for evaluation in evaluations {
        let Some(average) = evaluation.average_rating() else {
            continue;
        };
        let recent = window_start.map_or(true, |start| evaluation.created_at >= start);
        if recent && average < negative_threshold {
            recent_negative_count += 1;
        }
        averages.push(average);
    }

    if averages.is_empty() {
        return EvaluationStats::EMPTY;
    }

    averages.sort();
    let total: Decimal = averages.iter().sum();
    let mean = total / Decimal::from(averages.len());

    EvaluationStats {
        average_rating: round_one_decimal(mean).to_f64(),
        total_evaluations: averages.len() as u32,
        recent_negative_count,
    }
}

/// Rounds half away from zero to one decimal place. Thirds and sixths are
/// inexact in `Decimal`, so the mean is first settled at twelve places; no
/// real mean lies that close to a midpoint without being on it.
fn round_one_decimal(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(12, RoundingStrategy::MidpointNearestEven)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}
