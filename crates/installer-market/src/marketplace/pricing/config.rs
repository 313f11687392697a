use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{EscalationPolicy, GradeTier};

/// Commission multipliers per grade tier. Lower multiplier means the
/// platform keeps less of the job fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeMultiplierTable {
    pub a: Decimal,
    pub b: Decimal,
    pub c: Decimal,
    pub d: Decimal,
}

impl Default for GradeMultiplierTable {
    fn default() -> Self {
        Self {
            a: Decimal::new(60, 2),
            b: Decimal::new(80, 2),
            c: Decimal::new(90, 2),
            d: Decimal::ONE,
        }
    }
}

impl GradeMultiplierTable {
    pub fn get(&self, tier: GradeTier) -> Decimal {
        match tier {
            GradeTier::A => self.a,
            GradeTier::B => self.b,
            GradeTier::C => self.c,
            GradeTier::D => self.d,
        }
    }

    /// Each multiplier must lie in `(0, 1]` and a better tier may never pay
    /// more commission than a worse one.
    pub fn validate(&self) -> Result<(), PricingConfigError> {
        for tier in [GradeTier::A, GradeTier::B, GradeTier::C, GradeTier::D] {
            let value = self.get(tier);
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(PricingConfigError::MultiplierOutOfRange { tier, value });
            }
        }
        if !(self.a <= self.b && self.b <= self.c && self.c <= self.d) {
            return Err(PricingConfigError::MultiplierOrder);
        }
        Ok(())
    }
}

/// Pricing options supplied by the caller at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Applied to new work orders that do not carry their own policy.
    pub default_escalation: Option<EscalationPolicy>,
    pub multipliers: GradeMultiplierTable,
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), PricingConfigError> {
        self.multipliers.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingConfigError {
    #[error("multiplier for tier {tier} must be greater than 0 and at most 1 (got {value})")]
    MultiplierOutOfRange { tier: GradeTier, value: Decimal },
    #[error("multipliers must not increase from tier D to tier A")]
    MultiplierOrder,
}
