use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::super::domain::{EscalationPolicy, WorkOrder};

/// Urgent-fee percentage in effect at `now`.
///
/// Holds at `base` until the start delay has passed, then adds one increment
/// per full interval, capped at `max`. A `max` below `base` never lowers the
/// fee. `now` before `created_at` counts as zero elapsed time.
pub fn current_urgent_fee_percent(
    base: Decimal,
    max: Decimal,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &EscalationPolicy,
) -> Decimal {
    if !policy.is_active() {
        return base;
    }

    let ceiling = max.max(base);
    let elapsed = (now - created_at).num_seconds().max(0);
    let escalating_for = elapsed.saturating_sub(policy.start_delay_seconds.max(0));
    if escalating_for <= 0 {
        return base;
    }

    let steps = escalating_for / policy.interval_seconds;
    Decimal::from(steps)
        .checked_mul(policy.increment_percent)
        .and_then(|raise| base.checked_add(raise))
        .map_or(ceiling, |percent| percent.min(ceiling))
}

/// Applies the order's own policy; orders without one stay at base.
pub(crate) fn urgent_fee_percent_for(order: &WorkOrder, now: DateTime<Utc>) -> Decimal {
    match &order.escalation {
        Some(policy) => current_urgent_fee_percent(
            order.fees.urgent_fee_base_percent,
            order.fees.urgent_fee_max_percent,
            order.created_at,
            now,
            policy,
        ),
        None => order.fees.urgent_fee_base_percent,
    }
}
