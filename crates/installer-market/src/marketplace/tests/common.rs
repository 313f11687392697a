use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::marketplace::domain::{
    AccountId, Evaluation, EvaluationDraft, EvaluationId, EvaluationKey, FeeTerms, GradeTier,
    RatingCategory, WorkOrder, WorkOrderDraft, WorkOrderId, WorkOrderStatus, WorkerGrade,
    WorkerId,
};
use crate::marketplace::repository::{
    EvaluationRepository, RepositoryError, WorkOrderRepository, WorkerGradeRepository,
};
use crate::marketplace::{GradingConfig, MarketplaceService, PricingConfig};

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn fee_terms() -> FeeTerms {
    FeeTerms {
        base_fee: 150_000,
        urgent_fee_base_percent: Decimal::from(15),
        urgent_fee_max_percent: Decimal::from(30),
        discount_percent: Decimal::ZERO,
        tax_percent: Decimal::from(10),
        platform_fee_base_percent: Decimal::from(10),
    }
}

pub(super) fn work_order() -> WorkOrder {
    WorkOrder {
        id: WorkOrderId("wo-fixture".to_string()),
        seller_id: AccountId("seller-1".to_string()),
        title: "Living room roller blinds".to_string(),
        fees: fee_terms(),
        escalation: None,
        created_at: t0(),
        status: WorkOrderStatus::Registered,
        assigned_worker: None,
        finalized_payment: None,
    }
}

pub(super) fn work_order_draft() -> WorkOrderDraft {
    WorkOrderDraft {
        seller_id: AccountId("seller-1".to_string()),
        title: "Living room roller blinds".to_string(),
        fees: fee_terms(),
        escalation: None,
    }
}

pub(super) fn grade(tier: Option<GradeTier>) -> WorkerGrade {
    WorkerGrade {
        worker_id: worker(),
        average_rating: 4.0,
        total_evaluations: 8,
        recent_negative_count: 0,
        tier,
        last_recalculated_at: t0(),
    }
}

pub(super) fn worker() -> WorkerId {
    WorkerId("worker-1".to_string())
}

pub(super) fn ratings(values: &[u8]) -> BTreeMap<RatingCategory, u8> {
    RatingCategory::STANDARD
        .iter()
        .zip(values)
        .map(|(name, value)| (RatingCategory::new(*name), *value))
        .collect()
}

/// Evaluation with every listed rating, created `days_ago` before `t0()`.
pub(super) fn evaluation(index: usize, values: &[u8], days_ago: i64) -> Evaluation {
    Evaluation {
        id: EvaluationId(format!("ev-{index}")),
        target_worker_id: worker(),
        evaluator_id: AccountId(format!("customer-{index}")),
        work_order_id: WorkOrderId(format!("wo-{index}")),
        category_ratings: ratings(values),
        comment: "Installed the blinds cleanly and on schedule.".to_string(),
        created_at: t0() - Duration::days(days_ago),
    }
}

/// `count` evaluations that all average `rating`, aged past the recency window.
pub(super) fn uniform_history(count: usize, rating: u8) -> Vec<Evaluation> {
    (0..count)
        .map(|index| evaluation(index, &[rating; 5], 400))
        .collect()
}

pub(super) fn evaluation_draft(work_order_id: &WorkOrderId, evaluator: &str) -> EvaluationDraft {
    EvaluationDraft {
        target_worker_id: worker(),
        evaluator_id: AccountId(evaluator.to_string()),
        work_order_id: work_order_id.clone(),
        category_ratings: ratings(&[5, 5, 4, 5, 5]),
        comment: "Measured twice, mounted perfectly level.".to_string(),
    }
}

pub(super) type TestService = MarketplaceService<MemoryWorkOrders, MemoryEvaluations, MemoryGrades>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryWorkOrders>,
    Arc<MemoryEvaluations>,
    Arc<MemoryGrades>,
) {
    let work_orders = Arc::new(MemoryWorkOrders::default());
    let evaluations = Arc::new(MemoryEvaluations::default());
    let grades = Arc::new(MemoryGrades::default());
    let service = MarketplaceService::new(
        work_orders.clone(),
        evaluations.clone(),
        grades.clone(),
        PricingConfig::default(),
        GradingConfig::default(),
    );
    (service, work_orders, evaluations, grades)
}

#[derive(Default, Clone)]
pub(super) struct MemoryWorkOrders {
    pub(super) records: Arc<Mutex<HashMap<WorkOrderId, WorkOrder>>>,
}

impl WorkOrderRepository for MemoryWorkOrders {
    fn insert(&self, order: WorkOrder) -> Result<WorkOrder, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&order.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    fn update(&self, order: WorkOrder, expected: WorkOrderStatus) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&order.id).map(|stored| stored.status) {
            Some(status) if status == expected => {
                guard.insert(order.id.clone(), order);
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvaluations {
    pub(super) records: Arc<Mutex<Vec<Evaluation>>>,
}

impl MemoryEvaluations {
    pub(super) fn seed(&self, evaluations: Vec<Evaluation>) {
        self.records
            .lock()
            .expect("evaluation mutex poisoned")
            .extend(evaluations);
    }
}

impl EvaluationRepository for MemoryEvaluations {
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.records.lock().expect("evaluation mutex poisoned");
        let key = evaluation.key();
        if guard.iter().any(|existing| existing.key() == key) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(evaluation.clone());
        Ok(evaluation)
    }

    fn exists(&self, key: &EvaluationKey) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        Ok(guard.iter().any(|existing| &existing.key() == key))
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Evaluation>, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        Ok(guard
            .iter()
            .filter(|evaluation| &evaluation.target_worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn evaluated_workers(&self) -> Result<Vec<WorkerId>, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        let mut workers: Vec<WorkerId> = guard
            .iter()
            .map(|evaluation| evaluation.target_worker_id.clone())
            .collect();
        workers.sort();
        workers.dedup();
        Ok(workers)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryGrades {
    pub(super) records: Arc<Mutex<HashMap<WorkerId, WorkerGrade>>>,
}

impl WorkerGradeRepository for MemoryGrades {
    fn fetch(&self, worker_id: &WorkerId) -> Result<Option<WorkerGrade>, RepositoryError> {
        let guard = self.records.lock().expect("grade mutex poisoned");
        Ok(guard.get(worker_id).cloned())
    }

    fn upsert(&self, grade: WorkerGrade) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("grade mutex poisoned");
        guard.insert(grade.worker_id.clone(), grade);
        Ok(())
    }
}

pub(super) struct UnavailableGrades;

impl WorkerGradeRepository for UnavailableGrades {
    fn fetch(&self, _worker_id: &WorkerId) -> Result<Option<WorkerGrade>, RepositoryError> {
        Err(RepositoryError::Unavailable("grade store offline".to_string()))
    }

    fn upsert(&self, _grade: WorkerGrade) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("grade store offline".to_string()))
    }
}

/// Drives a registered order through assignment and completion.
pub(super) fn completed_order(service: &TestService) -> WorkOrder {
    use crate::marketplace::domain::StatusChange;

    let order = service
        .register_work_order(work_order_draft(), t0())
        .expect("order registers");
    service
        .change_status(
            &order.id,
            StatusChange::Assign {
                worker_id: worker(),
            },
            t0(),
        )
        .expect("assign");
    service
        .change_status(&order.id, StatusChange::Start, t0())
        .expect("start");
    service
        .change_status(&order.id, StatusChange::Complete, t0())
        .expect("complete")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
