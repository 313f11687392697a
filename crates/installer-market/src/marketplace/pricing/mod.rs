mod breakdown;
mod config;
mod escalation;
mod multiplier;

pub use config::{GradeMultiplierTable, PricingConfig, PricingConfigError};
pub use escalation::current_urgent_fee_percent;
pub use multiplier::GradeMultiplierResolver;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{GradeTier, PaymentBreakdown, WorkOrder, WorkerGrade};
use super::validation::ValidationError;

/// Stateless pricing engine. Holds only the caller-supplied configuration, so
/// one instance can be shared across request handlers.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
    resolver: GradeMultiplierResolver,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        let resolver = GradeMultiplierResolver::new(config.multipliers);
        Self { config, resolver }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn multiplier_for(&self, tier: Option<GradeTier>) -> Decimal {
        self.resolver.multiplier_for(tier)
    }

    /// Current urgent-fee percentage for a work order. Orders without an
    /// escalation policy stay at their base percentage.
    pub fn urgent_fee_percent(&self, order: &WorkOrder, now: DateTime<Utc>) -> Decimal {
        escalation::urgent_fee_percent_for(order, now)
    }

    /// Full payment breakdown. `now` defaults to the current time and an
    /// absent grade pays the base commission.
    pub fn compute_breakdown(
        &self,
        order: &WorkOrder,
        now: Option<DateTime<Utc>>,
        grade: Option<&WorkerGrade>,
    ) -> Result<PaymentBreakdown, ValidationError> {
        let now = now.unwrap_or_else(Utc::now);
        let tier = grade.and_then(|grade| grade.tier);
        self.compute_breakdown_for_tier(order, now, tier)
    }

    /// Same as [`PricingEngine::compute_breakdown`] for callers that only
    /// know the tier, such as what-if quotes.
    pub fn compute_breakdown_for_tier(
        &self,
        order: &WorkOrder,
        now: DateTime<Utc>,
        tier: Option<GradeTier>,
    ) -> Result<PaymentBreakdown, ValidationError> {
        breakdown::compute_breakdown(order, now, tier, &self.resolver)
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
