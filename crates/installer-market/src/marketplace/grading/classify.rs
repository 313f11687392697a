use super::super::domain::GradeTier;
use super::aggregate::EvaluationStats;
use super::config::{GradingConfig, TierThreshold};

/// Derives the tier from aggregated statistics.
///
/// Returns `None` below the minimum sample size regardless of the average.
/// Tiers are tried from A downward and the first one whose thresholds all
/// hold wins, so recent negatives can demote a contractor whose lifetime
/// average alone would rank higher.
pub(crate) fn classify(stats: &EvaluationStats, config: &GradingConfig) -> Option<GradeTier> {
    let average = stats.average_rating?;
    if stats.total_evaluations < config.minimum_sample_size {
        return None;
    }

    let tiers = [
        (GradeTier::A, &config.tier_a),
        (GradeTier::B, &config.tier_b),
        (GradeTier::C, &config.tier_c),
    ];
    let tier = tiers
        .into_iter()
        .find(|(_, threshold)| meets(threshold, average, stats))
        .map_or(GradeTier::D, |(tier, _)| tier);
    Some(tier)
}

fn meets(threshold: &TierThreshold, average: f64, stats: &EvaluationStats) -> bool {
    average >= threshold.min_average
        && stats.total_evaluations >= threshold.min_evaluations
        && threshold
            .max_recent_negative
            .map_or(true, |limit| stats.recent_negative_count <= limit)
}
