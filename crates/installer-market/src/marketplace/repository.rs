use serde::Serialize;

use super::domain::{
    Evaluation, EvaluationKey, GradeTier, WorkOrder, WorkOrderId, WorkOrderStatus, WorkerGrade,
    WorkerId,
};

/// Source and sink for work orders (the document store in production).
pub trait WorkOrderRepository: Send + Sync {
    fn insert(&self, order: WorkOrder) -> Result<WorkOrder, RepositoryError>;
    /// Stores `order` only while the stored status still equals `expected`;
    /// otherwise fails with `Conflict` and leaves the record untouched.
    fn update(&self, order: WorkOrder, expected: WorkOrderStatus) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError>;
}

/// Append-only evaluation storage.
pub trait EvaluationRepository: Send + Sync {
    /// Must reject a second evaluation for the same key with `Conflict`.
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError>;
    fn exists(&self, key: &EvaluationKey) -> Result<bool, RepositoryError>;
    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Evaluation>, RepositoryError>;
    /// Every contractor with at least one stored evaluation.
    fn evaluated_workers(&self) -> Result<Vec<WorkerId>, RepositoryError>;
}

/// One grade per contractor, overwritten on recalculation.
pub trait WorkerGradeRepository: Send + Sync {
    fn fetch(&self, worker_id: &WorkerId) -> Result<Option<WorkerGrade>, RepositoryError>;
    fn upsert(&self, grade: WorkerGrade) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized grade exposed to sellers and the admin back office.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerGradeView {
    pub worker_id: WorkerId,
    pub status: &'static str,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<GradeTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    pub total_evaluations: u32,
}

impl WorkerGradeView {
    pub fn from_grade(worker_id: &WorkerId, grade: Option<&WorkerGrade>) -> Self {
        match grade {
            Some(WorkerGrade {
                tier: Some(tier),
                average_rating,
                total_evaluations,
                ..
            }) => Self {
                worker_id: worker_id.clone(),
                status: "graded",
                summary: format!(
                    "grade {tier} ({average_rating:.1} over {total_evaluations} evaluations)"
                ),
                tier: Some(*tier),
                average_rating: Some(*average_rating),
                total_evaluations: *total_evaluations,
            },
            Some(grade) => Self {
                worker_id: worker_id.clone(),
                status: "not_yet_graded",
                summary: format!(
                    "no grade yet ({} evaluations recorded)",
                    grade.total_evaluations
                ),
                tier: None,
                average_rating: Some(grade.average_rating),
                total_evaluations: grade.total_evaluations,
            },
            None => Self {
                worker_id: worker_id.clone(),
                status: "not_yet_graded",
                summary: "no grade yet".to_string(),
                tier: None,
                average_rating: None,
                total_evaluations: 0,
            },
        }
    }
}
