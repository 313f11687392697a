use installer_market::config::MarketConfig;
use installer_market::marketplace::{
    Evaluation, EvaluationKey, EvaluationRepository, MarketplaceService, RepositoryError,
    WorkOrder, WorkOrderId, WorkOrderRepository, WorkOrderStatus, WorkerGrade,
    WorkerGradeRepository, WorkerId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MarketService = MarketplaceService<
    InMemoryWorkOrderRepository,
    InMemoryEvaluationRepository,
    InMemoryWorkerGradeRepository,
>;

pub(crate) fn in_memory_service(config: &MarketConfig) -> MarketService {
    MarketplaceService::new(
        Arc::new(InMemoryWorkOrderRepository::default()),
        Arc::new(InMemoryEvaluationRepository::default()),
        Arc::new(InMemoryWorkerGradeRepository::default()),
        config.pricing.clone(),
        config.grading.clone(),
    )
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryWorkOrderRepository {
    records: Arc<Mutex<HashMap<WorkOrderId, WorkOrder>>>,
}

impl WorkOrderRepository for InMemoryWorkOrderRepository {
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

/// Evaluations keyed by their uniqueness triple so duplicates are rejected
/// inside the same lock that stores them.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEvaluationRepository {
    records: Arc<Mutex<HashMap<EvaluationKey, Evaluation>>>,
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.records.lock().expect("evaluation mutex poisoned");
        let key = evaluation.key();
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, evaluation.clone());
        Ok(evaluation)
    }

    fn exists(&self, key: &EvaluationKey) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        Ok(guard.contains_key(key))
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Evaluation>, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        Ok(guard
            .values()
            .filter(|evaluation| &evaluation.target_worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn evaluated_workers(&self) -> Result<Vec<WorkerId>, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        let mut workers: Vec<WorkerId> = guard
            .keys()
            .map(|key| key.target_worker_id.clone())
            .collect();
        workers.sort();
        workers.dedup();
        Ok(workers)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryWorkerGradeRepository {
    records: Arc<Mutex<HashMap<WorkerId, WorkerGrade>>>,
}

impl WorkerGradeRepository for InMemoryWorkerGradeRepository {
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
