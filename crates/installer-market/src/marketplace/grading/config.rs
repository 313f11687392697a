use serde::{Deserialize, Serialize};

/// Requirements a contractor must meet to hold a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub min_average: f64,
    pub min_evaluations: u32,
    /// `None` means recent negatives do not matter for this tier.
    pub max_recent_negative: Option<u32>,
}

/// Rubric configuration for contractor grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    pub minimum_sample_size: u32,
    pub recency_window_days: i64,
    pub negative_rating_threshold: f64,
    pub tier_a: TierThreshold,
    pub tier_b: TierThreshold,
    pub tier_c: TierThreshold,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            minimum_sample_size: 5,
            recency_window_days: 90,
            negative_rating_threshold: 3.0,
            tier_a: TierThreshold {
                min_average: 4.5,
                min_evaluations: 10,
                max_recent_negative: Some(0),
            },
            tier_b: TierThreshold {
                min_average: 3.5,
                min_evaluations: 5,
                max_recent_negative: Some(1),
            },
            tier_c: TierThreshold {
                min_average: 2.5,
                min_evaluations: 0,
                max_recent_negative: None,
            },
        }
    }
}

impl GradingConfig {
    /// Longest accepted recency window (about a century).
    pub const MAX_RECENCY_WINDOW_DAYS: i64 = 36_500;

    pub fn validate(&self) -> Result<(), GradingConfigError> {
        if !(1..=Self::MAX_RECENCY_WINDOW_DAYS).contains(&self.recency_window_days) {
            return Err(GradingConfigError::RecencyWindow(self.recency_window_days));
        }
        if !(0.0..=5.0).contains(&self.negative_rating_threshold) {
            return Err(GradingConfigError::RatingScale {
                field: "negative_rating_threshold",
                value: self.negative_rating_threshold,
            });
        }
        for (field, threshold) in [
            ("tier_a.min_average", &self.tier_a),
            ("tier_b.min_average", &self.tier_b),
            ("tier_c.min_average", &self.tier_c),
        ] {
            if !(0.0..=5.0).contains(&threshold.min_average) {
                return Err(GradingConfigError::RatingScale {
                    field,
                    value: threshold.min_average,
                });
            }
        }
        if self.tier_a.min_average < self.tier_b.min_average
            || self.tier_b.min_average < self.tier_c.min_average
        {
            return Err(GradingConfigError::ThresholdOrder);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradingConfigError {
    #[error("recency window must be between 1 and 36500 days (got {0})")]
    RecencyWindow(i64),
    #[error("{field} must lie on the 0-5 rating scale (got {value})")]
    RatingScale { field: &'static str, value: f64 },
    #[error("tier averages must not increase from tier A to tier C")]
    ThresholdOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_window_is_bounded_on_both_sides() {
        for days in [0, -1, GradingConfig::MAX_RECENCY_WINDOW_DAYS + 1, i64::MAX] {
            let config = GradingConfig {
                recency_window_days: days,
                ..GradingConfig::default()
            };
            assert_eq!(
                config.validate(),
                Err(GradingConfigError::RecencyWindow(days))
            );
        }

        let config = GradingConfig {
            recency_window_days: GradingConfig::MAX_RECENCY_WINDOW_DAYS,
            ..GradingConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(GradingConfig::default().validate(), Ok(()));
    }

    #[test]
    fn tier_averages_must_not_increase() {
        let mut config = GradingConfig::default();
        config.tier_c.min_average = 4.0;
        assert_eq!(config.validate(), Err(GradingConfigError::ThresholdOrder));
    }
}
