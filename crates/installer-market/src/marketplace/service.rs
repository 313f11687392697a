use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Evaluation, EvaluationDraft, EvaluationId, PaymentBreakdown, StatusChange, WorkOrder,
    WorkOrderDraft, WorkOrderId, WorkOrderStatus, WorkerGrade, WorkerId,
};
use super::grading::{GradingConfig, GradingEngine};
use super::pricing::{PricingConfig, PricingEngine};
use super::repository::{
    EvaluationRepository, RepositoryError, WorkOrderRepository, WorkerGradeRepository,
    WorkerGradeView,
};
use super::validation::ValidationError;

/// Service composing the repositories with the pricing and grading engines.
pub struct MarketplaceService<W, E, G> {
    work_orders: Arc<W>,
    evaluations: Arc<E>,
    grades: Arc<G>,
    pricing: Arc<PricingEngine>,
    grading: Arc<GradingEngine>,
}

static WORK_ORDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_work_order_id() -> WorkOrderId {
    let id = WORK_ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    WorkOrderId(format!("wo-{id:06}"))
}

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("ev-{id:06}"))
}

/// Outcome of a grade sweep across every evaluated contractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecalculationSummary {
    pub workers: usize,
    pub graded: usize,
    pub tier_changes: usize,
}

/// Stored evaluation together with the contractor's refreshed grade.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReceipt {
    pub evaluation: Evaluation,
    pub grade: WorkerGradeView,
}

impl<W, E, G> MarketplaceService<W, E, G>
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    pub fn new(
        work_orders: Arc<W>,
        evaluations: Arc<E>,
        grades: Arc<G>,
        pricing: PricingConfig,
        grading: GradingConfig,
    ) -> Self {
        Self {
            work_orders,
            evaluations,
            grades,
            pricing: Arc::new(PricingEngine::new(pricing)),
            grading: Arc::new(GradingEngine::new(grading)),
        }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub fn grading(&self) -> &GradingEngine {
        &self.grading
    }

    /// Validate and store a new work order. Drafts without their own
    /// escalation policy inherit the configured default.
    pub fn register_work_order(
        &self,
        draft: WorkOrderDraft,
        now: DateTime<Utc>,
    ) -> Result<WorkOrder, MarketplaceServiceError> {
        draft.validate()?;

        let WorkOrderDraft {
            seller_id,
            title,
            fees,
            escalation,
        } = draft;

        let order = WorkOrder {
            id: next_work_order_id(),
            seller_id,
            title,
            fees,
            escalation: escalation.or(self.pricing.config().default_escalation),
            created_at: now,
            status: WorkOrderStatus::Registered,
            assigned_worker: None,
            finalized_payment: None,
        };

        let stored = self.work_orders.insert(order)?;
        info!(work_order = %stored.id, seller = %stored.seller_id.0, "work order registered");
        Ok(stored)
    }

    pub fn work_order(&self, id: &WorkOrderId) -> Result<WorkOrder, MarketplaceServiceError> {
        let order = self
            .work_orders
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(order)
    }

    /// Price a work order as of `now`. Completed orders return the breakdown
    /// fixed at completion.
    pub fn quote(
        &self,
        id: &WorkOrderId,
        now: DateTime<Utc>,
    ) -> Result<PaymentBreakdown, MarketplaceServiceError> {
        let order = self.work_order(id)?;
        if let Some(finalized) = order.finalized_payment {
            return Ok(finalized);
        }

        let grade = self.assigned_grade(&order)?;
        let breakdown = self
            .pricing
            .compute_breakdown(&order, Some(now), grade.as_ref())?;
        debug!(
            work_order = %order.id,
            total_fee = breakdown.total_fee,
            urgent_fee_percent = %breakdown.urgent_fee_percent,
            "quote computed"
        );
        Ok(breakdown)
    }

    /// Move a work order along its lifecycle. Completion fixes the payment
    /// breakdown using the contractor's grade at that moment.
    pub fn change_status(
        &self,
        id: &WorkOrderId,
        change: StatusChange,
        now: DateTime<Utc>,
    ) -> Result<WorkOrder, MarketplaceServiceError> {
        let mut order = self.work_order(id)?;
        let target = change.target();
        if !order.status.can_transition_to(target) {
            return Err(MarketplaceServiceError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        match change {
            StatusChange::Assign { worker_id } => {
                order.assigned_worker = Some(worker_id);
            }
            StatusChange::Complete => {
                let grade = self.assigned_grade(&order)?;
                let breakdown = self
                    .pricing
                    .compute_breakdown(&order, Some(now), grade.as_ref())?;
                order.finalized_payment = Some(breakdown);
            }
            StatusChange::Start | StatusChange::Cancel => {}
        }

        let from = order.status;
        order.status = target;
        match self.work_orders.update(order.clone(), from) {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => {
                // Another caller moved the order after we read it.
                let current = self.work_order(id)?.status;
                warn!(
                    work_order = %order.id,
                    %from,
                    %current,
                    to = %target,
                    "stale status change rejected"
                );
                return Err(MarketplaceServiceError::InvalidTransition {
                    from: current,
                    to: target,
                });
            }
            Err(err) => return Err(err.into()),
        }
        info!(work_order = %order.id, %from, to = %target, "work order status changed");
        Ok(order)
    }

    /// Record an evaluation for a completed job and refresh the contractor's
    /// grade from the full evaluation set.
    pub fn record_evaluation(
        &self,
        draft: EvaluationDraft,
        now: DateTime<Utc>,
    ) -> Result<EvaluationReceipt, MarketplaceServiceError> {
        draft.validate()?;

        let order = self.work_order(&draft.work_order_id)?;
        if order.status != WorkOrderStatus::Completed {
            return Err(MarketplaceServiceError::WorkOrderNotCompleted {
                work_order_id: order.id,
                status: order.status,
            });
        }
        if order.assigned_worker.as_ref() != Some(&draft.target_worker_id) {
            return Err(MarketplaceServiceError::WorkerMismatch {
                work_order_id: order.id,
                worker_id: draft.target_worker_id,
            });
        }
        if self.evaluations.exists(&draft.key())? {
            return Err(MarketplaceServiceError::AlreadyEvaluated);
        }

        let EvaluationDraft {
            target_worker_id,
            evaluator_id,
            work_order_id,
            category_ratings,
            comment,
        } = draft;

        let evaluation = Evaluation {
            id: next_evaluation_id(),
            target_worker_id,
            evaluator_id,
            work_order_id,
            category_ratings,
            comment: comment.trim().to_string(),
            created_at: now,
        };

        let stored = match self.evaluations.insert(evaluation) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(MarketplaceServiceError::AlreadyEvaluated),
            Err(other) => return Err(other.into()),
        };
        info!(
            evaluation = %stored.id.0,
            worker = %stored.target_worker_id,
            "evaluation recorded"
        );

        let grade = self.recalculate_grade(&stored.target_worker_id, now)?;
        let view = WorkerGradeView::from_grade(&stored.target_worker_id, grade.as_ref());
        Ok(EvaluationReceipt {
            evaluation: stored,
            grade: view,
        })
    }

    /// Recompute and store one contractor's grade as of `now`.
    pub fn recalculate_grade(
        &self,
        worker_id: &WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkerGrade>, MarketplaceServiceError> {
        let evaluations = self.evaluations.for_worker(worker_id)?;
        let Some(grade) = self.grading.grade(worker_id, &evaluations, now) else {
            debug!(worker = %worker_id, "no ratable evaluations; grade left untouched");
            return Ok(None);
        };

        self.grades.upsert(grade.clone())?;
        debug!(
            worker = %worker_id,
            tier = ?grade.tier,
            average = grade.average_rating,
            "grade recalculated"
        );
        Ok(Some(grade))
    }

    /// Sweep every evaluated contractor. Scheduled runs pick up promotions
    /// and demotions caused by evaluations ageing out of the recency window.
    pub fn recalculate_all(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RecalculationSummary, MarketplaceServiceError> {
        let workers = self.evaluations.evaluated_workers()?;
        let mut summary = RecalculationSummary {
            workers: workers.len(),
            ..RecalculationSummary::default()
        };

        for worker_id in workers {
            let previous = self.grades.fetch(&worker_id)?.and_then(|grade| grade.tier);
            match self.recalculate_grade(&worker_id, now) {
                Ok(Some(grade)) => {
                    summary.graded += 1;
                    if grade.tier != previous {
                        summary.tier_changes += 1;
                        info!(
                            worker = %worker_id,
                            from = ?previous,
                            to = ?grade.tier,
                            "grade tier changed"
                        );
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(worker = %worker_id, error = %err, "grade recalculation failed");
                    return Err(err);
                }
            }
        }

        Ok(summary)
    }

    pub fn worker_grade(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Option<WorkerGrade>, MarketplaceServiceError> {
        Ok(self.grades.fetch(worker_id)?)
    }

    fn assigned_grade(
        &self,
        order: &WorkOrder,
    ) -> Result<Option<WorkerGrade>, MarketplaceServiceError> {
        match &order.assigned_worker {
            Some(worker_id) => Ok(self.grades.fetch(worker_id)?),
            None => Ok(None),
        }
    }
}

/// Error raised by the marketplace service.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("cannot move work order from {from} to {to}")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },
    #[error("work order {work_order_id} is {status}; evaluations require a completed job")]
    WorkOrderNotCompleted {
        work_order_id: WorkOrderId,
        status: WorkOrderStatus,
    },
    #[error("worker {worker_id} was not assigned to work order {work_order_id}")]
    WorkerMismatch {
        work_order_id: WorkOrderId,
        worker_id: WorkerId,
    },
    #[error("this evaluator has already evaluated the worker for this work order")]
    AlreadyEvaluated,
}
