use rust_decimal::Decimal;

use super::super::domain::GradeTier;
use super::config::GradeMultiplierTable;

/// Maps a contractor's tier to the commission multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeMultiplierResolver {
    table: GradeMultiplierTable,
}

impl GradeMultiplierResolver {
    pub fn new(table: GradeMultiplierTable) -> Self {
        Self { table }
    }

    /// Ungraded contractors pay the full base commission.
    pub fn multiplier_for(&self, tier: Option<GradeTier>) -> Decimal {
        tier.map_or(Decimal::ONE, |tier| self.table.get(tier))
    }
}
