use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{EvaluationDraft, StatusChange, WorkOrderDraft, WorkOrderId, WorkerId};
use super::repository::{
    EvaluationRepository, RepositoryError, WorkOrderRepository, WorkerGradeRepository,
    WorkerGradeView,
};
use super::service::{MarketplaceService, MarketplaceServiceError};

/// Router builder exposing work-order pricing and contractor grading.
pub fn marketplace_router<W, E, G>(service: Arc<MarketplaceService<W, E, G>>) -> Router
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    Router::new()
        .route("/api/v1/work-orders", post(register_handler::<W, E, G>))
        .route(
            "/api/v1/work-orders/:work_order_id",
            get(work_order_handler::<W, E, G>),
        )
        .route(
            "/api/v1/work-orders/:work_order_id/quote",
            get(quote_handler::<W, E, G>),
        )
        .route(
            "/api/v1/work-orders/:work_order_id/status",
            post(status_handler::<W, E, G>),
        )
        .route("/api/v1/evaluations", post(evaluation_handler::<W, E, G>))
        .route(
            "/api/v1/workers/:worker_id/grade",
            get(grade_handler::<W, E, G>),
        )
        .route(
            "/api/v1/grades/recalculate",
            post(recalculate_handler::<W, E, G>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QuoteQuery {
    /// Price as of this instant instead of the current time.
    #[serde(default)]
    pub(crate) at: Option<DateTime<Utc>>,
}

pub(crate) async fn register_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
    axum::Json(draft): axum::Json<WorkOrderDraft>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    match service.register_work_order(draft, Utc::now()) {
        Ok(order) => (StatusCode::CREATED, axum::Json(order)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn work_order_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
    Path(work_order_id): Path<String>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    match service.work_order(&WorkOrderId(work_order_id)) {
        Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn quote_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
    Path(work_order_id): Path<String>,
    Query(query): Query<QuoteQuery>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    let now = query.at.unwrap_or_else(Utc::now);
    match service.quote(&WorkOrderId(work_order_id), now) {
        Ok(breakdown) => (StatusCode::OK, axum::Json(breakdown)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
    Path(work_order_id): Path<String>,
    axum::Json(change): axum::Json<StatusChange>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    match service.change_status(&WorkOrderId(work_order_id), change, Utc::now()) {
        Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evaluation_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
    axum::Json(draft): axum::Json<EvaluationDraft>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    match service.record_evaluation(draft, Utc::now()) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn grade_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
    Path(worker_id): Path<String>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    let worker_id = WorkerId(worker_id);
    match service.worker_grade(&worker_id) {
        Ok(grade) => {
            let view = WorkerGradeView::from_grade(&worker_id, grade.as_ref());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recalculate_handler<W, E, G>(
    State(service): State<Arc<MarketplaceService<W, E, G>>>,
) -> Response
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    match service.recalculate_all(Utc::now()) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_status(err: &MarketplaceServiceError) -> StatusCode {
    match err {
        MarketplaceServiceError::Validation(_)
        | MarketplaceServiceError::WorkOrderNotCompleted { .. }
        | MarketplaceServiceError::WorkerMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MarketplaceServiceError::InvalidTransition { .. }
        | MarketplaceServiceError::AlreadyEvaluated
        | MarketplaceServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        MarketplaceServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MarketplaceServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: MarketplaceServiceError) -> Response {
    let status = error_status(&err);
    let payload = match &err {
        MarketplaceServiceError::Validation(validation) => json!({
            "error": err.to_string(),
            "field": validation.field(),
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}
