//! Work-order pricing and contractor grading for the installation marketplace.
//!
//! The engines under [`pricing`] and [`grading`] are pure: they take records
//! and caller-supplied configuration and return derived values without I/O.
//! [`service`] wires them to the repository traits and [`router`] exposes the
//! service over HTTP.

pub mod domain;
pub mod grading;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AccountId, EscalationPolicy, Evaluation, EvaluationDraft, EvaluationId, EvaluationKey,
    FeeTerms, GradeTier, PaymentBreakdown, RatingCategory, StatusChange, WorkOrder,
    WorkOrderDraft, WorkOrderId, WorkOrderStatus, WorkerGrade, WorkerId,
};
pub use grading::{EvaluationStats, GradingConfig, GradingEngine, TierThreshold};
pub use pricing::{GradeMultiplierTable, PricingConfig, PricingEngine};
pub use repository::{
    EvaluationRepository, RepositoryError, WorkOrderRepository, WorkerGradeRepository,
    WorkerGradeView,
};
pub use router::marketplace_router;
pub use service::{
    EvaluationReceipt, MarketplaceService, MarketplaceServiceError, RecalculationSummary,
};
pub use validation::ValidationError;
