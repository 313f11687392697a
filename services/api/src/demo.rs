use crate::infra::{in_memory_service, MarketService};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use installer_market::config::MarketConfig;
use installer_market::error::AppError;
use installer_market::marketplace::{
    AccountId, EscalationPolicy, EvaluationDraft, FeeTerms, GradeTier, PaymentBreakdown,
    PricingEngine, RatingCategory, StatusChange, ValidationError, WorkOrder, WorkOrderDraft,
    WorkOrderId, WorkOrderStatus, WorkerGradeView, WorkerId,
};
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Base installation fee in whole currency units
    #[arg(long)]
    pub(crate) base_fee: i64,
    /// Urgent-fee percentage at posting time
    #[arg(long, default_value = "15")]
    pub(crate) urgent_base: Decimal,
    /// Ceiling for the escalating urgent fee
    #[arg(long, default_value = "30")]
    pub(crate) urgent_max: Decimal,
    /// Seller discount applied to the base fee
    #[arg(long, default_value = "0")]
    pub(crate) discount: Decimal,
    #[arg(long, default_value = "10")]
    pub(crate) tax: Decimal,
    /// Platform commission before the grade multiplier
    #[arg(long, default_value = "10")]
    pub(crate) platform: Decimal,
    /// Contractor grade (A-D). Omit for an ungraded contractor.
    #[arg(long, value_parser = parse_grade)]
    pub(crate) grade: Option<GradeTier>,
    /// Minutes since the job was posted
    #[arg(long, default_value_t = 0)]
    pub(crate) elapsed_minutes: i64,
    /// Escalation interval in minutes; escalation is off when omitted
    #[arg(long)]
    pub(crate) escalate_every_minutes: Option<i64>,
    /// Urgent-fee increase per escalation interval
    #[arg(long, default_value = "5")]
    pub(crate) escalation_step: Decimal,
    /// Print the breakdown as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of completed jobs to run before the complaint
    #[arg(long, default_value_t = 10)]
    pub(crate) jobs: u32,
    /// Skip the complaint and scheduled recalculation portion of the demo
    #[arg(long)]
    pub(crate) skip_complaint: bool,
}

pub(crate) fn parse_grade(raw: &str) -> Result<GradeTier, String> {
    GradeTier::parse(raw).ok_or_else(|| format!("unknown grade '{raw}' (expected A, B, C or D)"))
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let market = MarketConfig::from_env()?;
    let now = Utc::now();
    let order = quote_order(&args, market.pricing.default_escalation, now)?;
    let engine = PricingEngine::new(market.pricing);
    let breakdown = engine.compute_breakdown_for_tier(&order, now, args.grade)?;

    if args.json {
        match serde_json::to_string_pretty(&breakdown) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Breakdown unavailable as JSON: {err}"),
        }
        return Ok(());
    }

    println!(
        "Quote for base fee {} after {} minutes",
        args.base_fee, args.elapsed_minutes
    );
    render_breakdown(&breakdown);
    Ok(())
}

/// Builds the order being quoted. `--escalate-every-minutes` overrides the
/// configured default escalation.
fn quote_order(
    args: &QuoteArgs,
    default_escalation: Option<EscalationPolicy>,
    now: DateTime<Utc>,
) -> Result<WorkOrder, AppError> {
    let escalation = args
        .escalate_every_minutes
        .map(|minutes| EscalationPolicy {
            interval_seconds: minutes.saturating_mul(60),
            increment_percent: args.escalation_step,
            start_delay_seconds: 0,
        })
        .or(default_escalation);
    let created_at = Duration::try_minutes(args.elapsed_minutes.max(0))
        .and_then(|elapsed| now.checked_sub_signed(elapsed))
        .ok_or(ValidationError::TimeOutOfRange {
            field: "elapsed_minutes",
            value: args.elapsed_minutes,
        })?;

    Ok(WorkOrder {
        id: WorkOrderId("wo-quote".to_string()),
        seller_id: AccountId("cli".to_string()),
        title: "Ad-hoc quote".to_string(),
        fees: FeeTerms {
            base_fee: args.base_fee,
            urgent_fee_base_percent: args.urgent_base,
            urgent_fee_max_percent: args.urgent_max,
            discount_percent: args.discount,
            tax_percent: args.tax,
            platform_fee_base_percent: args.platform,
        },
        escalation,
        created_at,
        status: WorkOrderStatus::Registered,
        assigned_worker: None,
        finalized_payment: None,
    })
}

fn render_breakdown(breakdown: &PaymentBreakdown) {
    let tier = breakdown
        .grade_tier
        .map_or_else(|| "ungraded".to_string(), |tier| tier.to_string());
    println!(
        "- Urgent fee {}% -> {}",
        breakdown.urgent_fee_percent, breakdown.urgent_fee_amount
    );
    println!("- Discounted base fee {}", breakdown.discounted_base_fee);
    println!("- Total fee {}", breakdown.total_fee);
    println!(
        "- Platform fee {}% (grade {}, x{}) -> {}",
        breakdown.platform_fee_percent, tier, breakdown.grade_multiplier, breakdown.platform_fee_amount
    );
    println!("- Contractor payment {}", breakdown.worker_payment);
    println!("- Tax {}", breakdown.tax_amount);
    println!("- Customer pays {}", breakdown.customer_total_payment);
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = in_memory_service(&MarketConfig::default());
    let worker = WorkerId("installer-demo".to_string());
    let start = Duration::try_days(i64::from(args.jobs) + 1)
        .and_then(|history| Utc::now().checked_sub_signed(history))
        .ok_or(ValidationError::TimeOutOfRange {
            field: "jobs",
            value: i64::from(args.jobs),
        })?;

    println!("Installer marketplace demo");
    println!("\nFirst job (contractor not yet graded)");
    let first = complete_job(&service, &worker, "Living room roller blinds", start)?;
    if let Some(payment) = &first.finalized_payment {
        render_breakdown(payment);
    }

    println!("\nCustomer evaluations");
    let mut view = evaluate_job(&service, &first, &worker, 5, start)?;
    println!("- {} -> {}", first.id, view.summary);
    for job in 1..args.jobs {
        let at = start + Duration::days(i64::from(job));
        let order = complete_job(&service, &worker, &format!("Window job {job}"), at)?;
        view = evaluate_job(&service, &order, &worker, 5, at)?;
        println!("- {} -> {}", order.id, view.summary);
    }

    println!("\nNext job at the earned grade");
    let now = Utc::now();
    let graded = complete_job(&service, &worker, "Bay window vertical blinds", now)?;
    if let Some(payment) = &graded.finalized_payment {
        render_breakdown(payment);
    }

    if args.skip_complaint {
        return Ok(());
    }

    println!("\nComplaint on the latest job");
    view = evaluate_job(&service, &graded, &worker, 2, now)?;
    println!("- {}", view.summary);

    let later = now + Duration::days(service.grading().config().recency_window_days + 1);
    let summary = service.recalculate_all(later)?;
    println!(
        "\nScheduled recalculation after the recency window: {} contractors, {} tier changes",
        summary.workers, summary.tier_changes
    );
    let grade = service.worker_grade(&worker)?;
    let view = WorkerGradeView::from_grade(&worker, grade.as_ref());
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("  Grade payload:\n{json}"),
        Err(err) => println!("  Grade payload unavailable: {err}"),
    }

    Ok(())
}

fn demo_fees() -> FeeTerms {
    FeeTerms {
        base_fee: 150_000,
        urgent_fee_base_percent: Decimal::from(15),
        urgent_fee_max_percent: Decimal::from(30),
        discount_percent: Decimal::ZERO,
        tax_percent: Decimal::from(10),
        platform_fee_base_percent: Decimal::from(10),
    }
}

fn complete_job(
    service: &MarketService,
    worker: &WorkerId,
    title: &str,
    at: DateTime<Utc>,
) -> Result<WorkOrder, AppError> {
    let order = service.register_work_order(
        WorkOrderDraft {
            seller_id: AccountId("demo-blinds-shop".to_string()),
            title: title.to_string(),
            fees: demo_fees(),
            escalation: None,
        },
        at,
    )?;
    service.change_status(
        &order.id,
        StatusChange::Assign {
            worker_id: worker.clone(),
        },
        at,
    )?;
    service.change_status(&order.id, StatusChange::Start, at)?;
    Ok(service.change_status(&order.id, StatusChange::Complete, at)?)
}

fn evaluate_job(
    service: &MarketService,
    order: &WorkOrder,
    worker: &WorkerId,
    rating: u8,
    at: DateTime<Utc>,
) -> Result<WorkerGradeView, AppError> {
    let category_ratings = RatingCategory::STANDARD
        .iter()
        .map(|name| (RatingCategory::new(*name), rating))
        .collect();
    let receipt = service.record_evaluation(
        EvaluationDraft {
            target_worker_id: worker.clone(),
            evaluator_id: AccountId("demo-customer".to_string()),
            work_order_id: order.id.clone(),
            category_ratings,
            comment: "Installed on schedule and cleaned up afterwards.".to_string(),
        },
        at,
    )?;
    Ok(receipt.grade)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> QuoteArgs {
        QuoteArgs {
            base_fee: 150_000,
            urgent_base: Decimal::from(15),
            urgent_max: Decimal::from(30),
            discount: Decimal::ZERO,
            tax: Decimal::from(10),
            platform: Decimal::from(10),
            grade: Some(GradeTier::B),
            elapsed_minutes: 0,
            escalate_every_minutes: None,
            escalation_step: Decimal::from(5),
            json: false,
        }
    }

    #[test]
    fn quote_order_backdates_creation_and_applies_escalation() {
        let now = Utc::now();
        let mut quote = args();
        quote.elapsed_minutes = 90;
        quote.escalate_every_minutes = Some(30);

        let order = quote_order(&quote, None, now).expect("order builds");
        assert_eq!(order.created_at, now - Duration::minutes(90));
        let breakdown = PricingEngine::default()
            .compute_breakdown_for_tier(&order, now, quote.grade)
            .expect("breakdown computes");
        assert_eq!(breakdown.urgent_fee_percent, Decimal::from(30));
        assert_eq!(breakdown.grade_tier, Some(GradeTier::B));
        assert!(breakdown.reconciles());
    }

    #[test]
    fn quote_order_falls_back_to_configured_escalation() {
        let now = Utc::now();
        let mut quote = args();
        quote.elapsed_minutes = 60;
        let configured = EscalationPolicy {
            interval_seconds: 1_800,
            increment_percent: Decimal::from(2),
            start_delay_seconds: 0,
        };

        let order = quote_order(&quote, Some(configured), now).expect("order builds");
        assert_eq!(order.escalation, Some(configured));

        quote.escalate_every_minutes = Some(10);
        let order = quote_order(&quote, Some(configured), now).expect("order builds");
        assert_eq!(
            order.escalation.map(|policy| policy.interval_seconds),
            Some(600)
        );
    }

    #[test]
    fn quote_order_rejects_elapsed_time_beyond_the_calendar() {
        let now = Utc::now();
        for minutes in [i64::MAX, 1_000_000_000_000] {
            let mut quote = args();
            quote.elapsed_minutes = minutes;
            assert!(matches!(
                quote_order(&quote, None, now),
                Err(AppError::Validation(ValidationError::TimeOutOfRange {
                    field: "elapsed_minutes",
                    ..
                }))
            ));
        }
    }

    #[test]
    fn quote_rejects_out_of_range_terms() {
        let mut quote = args();
        quote.tax = Decimal::from(150);
        assert!(matches!(run_quote(quote), Err(AppError::Validation(_))));
    }

    #[test]
    fn demo_runs_against_in_memory_storage() {
        run_demo(DemoArgs {
            jobs: 6,
            skip_complaint: false,
        })
        .expect("demo completes");
    }

    #[test]
    fn parse_grade_accepts_lowercase() {
        assert_eq!(parse_grade(" a "), Ok(GradeTier::A));
        assert!(parse_grade("E").is_err());
    }
}
