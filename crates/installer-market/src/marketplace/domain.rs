use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for posted installation jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkOrderId(pub String);

/// Identifier for an independent contractor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

/// Identifier for sellers and customers (anyone who can post or evaluate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

impl fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static price terms fixed when the seller posts the job.
///
/// Percentages are expressed on a 0..=100 scale. Values outside that range are
/// rejected by validation rather than clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTerms {
    pub base_fee: i64,
    pub urgent_fee_base_percent: Decimal,
    pub urgent_fee_max_percent: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
    pub platform_fee_base_percent: Decimal,
}

/// Time-based escalation of the urgent fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub interval_seconds: i64,
    pub increment_percent: Decimal,
    #[serde(default)]
    pub start_delay_seconds: i64,
}

impl EscalationPolicy {
    /// Escalation only runs with a positive interval and a positive increment.
    pub fn is_active(&self) -> bool {
        self.interval_seconds > 0 && self.increment_percent > Decimal::ZERO
    }
}

/// Lifecycle of a work order. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Registered,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkOrderStatus::Registered => "registered",
            WorkOrderStatus::Assigned => "assigned",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        match (self, next) {
            (Registered, Assigned) | (Assigned, InProgress) | (InProgress, Completed) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seller or contractor action that moves a work order through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatusChange {
    Assign { worker_id: WorkerId },
    Start,
    Complete,
    Cancel,
}

impl StatusChange {
    pub const fn target(&self) -> WorkOrderStatus {
        match self {
            StatusChange::Assign { .. } => WorkOrderStatus::Assigned,
            StatusChange::Start => WorkOrderStatus::InProgress,
            StatusChange::Complete => WorkOrderStatus::Completed,
            StatusChange::Cancel => WorkOrderStatus::Cancelled,
        }
    }
}

/// Seller submission used to register a new work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderDraft {
    pub seller_id: AccountId,
    pub title: String,
    pub fees: FeeTerms,
    #[serde(default)]
    pub escalation: Option<EscalationPolicy>,
}

/// A single installation job posted by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub seller_id: AccountId,
    pub title: String,
    pub fees: FeeTerms,
    pub escalation: Option<EscalationPolicy>,
    pub created_at: DateTime<Utc>,
    pub status: WorkOrderStatus,
    pub assigned_worker: Option<WorkerId>,
    pub finalized_payment: Option<PaymentBreakdown>,
}

/// Rating category name. The standard set is exposed as constructors; any
/// other non-empty name is accepted so the rubric can grow without a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingCategory(pub String);

impl RatingCategory {
    pub const STANDARD: [&'static str; 5] = [
        "quality",
        "punctuality",
        "cost_saving",
        "communication",
        "professionalism",
    ];

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn quality() -> Self {
        Self::new("quality")
    }

    pub fn punctuality() -> Self {
        Self::new("punctuality")
    }

    pub fn cost_saving() -> Self {
        Self::new("cost_saving")
    }

    pub fn communication() -> Self {
        Self::new("communication")
    }

    pub fn professionalism() -> Self {
        Self::new("professionalism")
    }

    pub fn is_standard(&self) -> bool {
        Self::STANDARD.contains(&self.0.as_str())
    }
}

impl fmt::Display for RatingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evaluation payload submitted after a job is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDraft {
    pub target_worker_id: WorkerId,
    pub evaluator_id: AccountId,
    pub work_order_id: WorkOrderId,
    pub category_ratings: BTreeMap<RatingCategory, u8>,
    pub comment: String,
}

impl EvaluationDraft {
    pub fn key(&self) -> EvaluationKey {
        EvaluationKey {
            target_worker_id: self.target_worker_id.clone(),
            evaluator_id: self.evaluator_id.clone(),
            work_order_id: self.work_order_id.clone(),
        }
    }
}

/// Uniqueness key: one evaluation per contractor, evaluator and job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluationKey {
    pub target_worker_id: WorkerId,
    pub evaluator_id: AccountId,
    pub work_order_id: WorkOrderId,
}

/// Stored evaluation. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub target_worker_id: WorkerId,
    pub evaluator_id: AccountId,
    pub work_order_id: WorkOrderId,
    pub category_ratings: BTreeMap<RatingCategory, u8>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn key(&self) -> EvaluationKey {
        EvaluationKey {
            target_worker_id: self.target_worker_id.clone(),
            evaluator_id: self.evaluator_id.clone(),
            work_order_id: self.work_order_id.clone(),
        }
    }

    /// Mean of the category ratings, or `None` when no category was rated.
    pub fn average_rating(&self) -> Option<Decimal> {
        if self.category_ratings.is_empty() {
            return None;
        }
        let sum: u32 = self
            .category_ratings
            .values()
            .map(|rating| u32::from(*rating))
            .sum();
        Some(Decimal::from(sum) / Decimal::from(self.category_ratings.len()))
    }
}

/// Coarse quality tier. Declared lowest first so `Ord` reads `D < C < B < A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeTier {
    D,
    C,
    B,
    A,
}

impl GradeTier {
    pub const fn label(self) -> &'static str {
        match self {
            GradeTier::A => "A",
            GradeTier::B => "B",
            GradeTier::C => "C",
            GradeTier::D => "D",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Some(GradeTier::A),
            "B" => Some(GradeTier::B),
            "C" => Some(GradeTier::C),
            "D" => Some(GradeTier::D),
            _ => None,
        }
    }
}

impl fmt::Display for GradeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived grade for a contractor, overwritten on every recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerGrade {
    pub worker_id: WorkerId,
    pub average_rating: f64,
    pub total_evaluations: u32,
    pub recent_negative_count: u32,
    pub tier: Option<GradeTier>,
    pub last_recalculated_at: DateTime<Utc>,
}

/// Full payment breakdown for a work order at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    pub urgent_fee_percent: Decimal,
    pub urgent_fee_amount: i64,
    pub discounted_base_fee: i64,
    pub total_fee: i64,
    pub grade_tier: Option<GradeTier>,
    pub grade_multiplier: Decimal,
    pub platform_fee_percent: Decimal,
    pub platform_fee_amount: i64,
    pub worker_payment: i64,
    pub tax_amount: i64,
    pub customer_total_payment: i64,
}

impl PaymentBreakdown {
    /// Both money identities hold exactly.
    pub fn reconciles(&self) -> bool {
        self.platform_fee_amount + self.worker_payment == self.total_fee
            && self.customer_total_payment == self.total_fee + self.tax_amount
    }
}
