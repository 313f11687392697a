use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::super::domain::{GradeTier, PaymentBreakdown, WorkOrder};
use super::super::validation::ValidationError;
use super::escalation::urgent_fee_percent_for;
use super::multiplier::GradeMultiplierResolver;

/// Computes the payment breakdown in a fixed stage order. Rounding happens
/// only when a percentage is applied to an amount; the worker payment is a
/// subtraction so the split always sums back to the total fee.
pub(crate) fn compute_breakdown(
    order: &WorkOrder,
    now: DateTime<Utc>,
    tier: Option<GradeTier>,
    resolver: &GradeMultiplierResolver,
) -> Result<PaymentBreakdown, ValidationError> {
    let fees = &order.fees;
    fees.validate()?;

    let urgent_fee_percent = urgent_fee_percent_for(order, now);

    let base_fee = Decimal::from(fees.base_fee);
    let discounted_base_fee = apply_percent(
        "discounted_base_fee",
        base_fee,
        Decimal::ONE_HUNDRED - fees.discount_percent,
    )?;
    if discounted_base_fee < 0 {
        return Err(ValidationError::NegativeAmount {
            field: "discounted_base_fee",
            value: discounted_base_fee,
        });
    }

    let urgent_fee_amount = apply_percent("urgent_fee_amount", base_fee, urgent_fee_percent)?;
    let total_fee = discounted_base_fee
        .checked_add(urgent_fee_amount)
        .ok_or(ValidationError::AmountOverflow { field: "total_fee" })?;

    let grade_multiplier = resolver.multiplier_for(tier);
    let platform_fee_percent = fees.platform_fee_base_percent * grade_multiplier;
    let total = Decimal::from(total_fee);
    let platform_fee_amount = apply_percent("platform_fee_amount", total, platform_fee_percent)?;
    let worker_payment = total_fee - platform_fee_amount;

    let tax_amount = apply_percent("tax_amount", total, fees.tax_percent)?;
    let customer_total_payment = total_fee
        .checked_add(tax_amount)
        .ok_or(ValidationError::AmountOverflow {
            field: "customer_total_payment",
        })?;

    Ok(PaymentBreakdown {
        urgent_fee_percent: urgent_fee_percent.normalize(),
        urgent_fee_amount,
        discounted_base_fee,
        total_fee,
        grade_tier: tier,
        grade_multiplier,
        platform_fee_percent: platform_fee_percent.normalize(),
        platform_fee_amount,
        worker_payment,
        tax_amount,
        customer_total_payment,
    })
}

/// `amount * percent / 100`, rounded half-up to whole currency units.
fn apply_percent(
    field: &'static str,
    amount: Decimal,
    percent: Decimal,
) -> Result<i64, ValidationError> {
    amount
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .map(|value| value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or(ValidationError::AmountOverflow { field })
}
