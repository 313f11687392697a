use rust_decimal::Decimal;

use super::domain::{EvaluationDraft, FeeTerms, RatingCategory, WorkOrderDraft};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MIN_COMMENT_CHARS: usize = 10;
pub const MAX_COMMENT_CHARS: usize = 500;

/// Malformed or out-of-domain input. Always names the offending field so
/// callers can surface a specific message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },
    #[error("{field} must be between 0 and 100 percent (got {value})")]
    PercentOutOfRange { field: &'static str, value: Decimal },
    #[error("{field} exceeds the supported currency range")]
    AmountOverflow { field: &'static str },
    #[error("{field} is outside the supported time range (got {value})")]
    TimeOutOfRange { field: &'static str, value: i64 },
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("category_ratings must rate at least one category")]
    EmptyRatings,
    #[error("rating for '{category}' must be between 1 and 5 (got {value})")]
    RatingOutOfRange { category: RatingCategory, value: u8 },
    #[error("comment must be between 10 and 500 characters (got {length})")]
    CommentLength { length: usize },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::NegativeAmount { field, .. }
            | ValidationError::PercentOutOfRange { field, .. }
            | ValidationError::AmountOverflow { field }
            | ValidationError::TimeOutOfRange { field, .. }
            | ValidationError::Blank { field } => *field,
            ValidationError::EmptyRatings | ValidationError::RatingOutOfRange { .. } => {
                "category_ratings"
            }
            ValidationError::CommentLength { .. } => "comment",
        }
    }
}

pub(crate) fn ensure_percent(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::PercentOutOfRange { field, value });
    }
    Ok(())
}

impl FeeTerms {
    /// Checks every field in declaration order and reports the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_fee < 0 {
            return Err(ValidationError::NegativeAmount {
                field: "base_fee",
                value: self.base_fee,
            });
        }
        ensure_percent("urgent_fee_base_percent", self.urgent_fee_base_percent)?;
        ensure_percent("urgent_fee_max_percent", self.urgent_fee_max_percent)?;
        ensure_percent("discount_percent", self.discount_percent)?;
        ensure_percent("tax_percent", self.tax_percent)?;
        ensure_percent("platform_fee_base_percent", self.platform_fee_base_percent)?;
        Ok(())
    }
}

impl WorkOrderDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seller_id.0.trim().is_empty() {
            return Err(ValidationError::Blank { field: "seller_id" });
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::Blank { field: "title" });
        }
        self.fees.validate()
    }
}

impl EvaluationDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_worker_id.0.trim().is_empty() {
            return Err(ValidationError::Blank {
                field: "target_worker_id",
            });
        }
        if self.evaluator_id.0.trim().is_empty() {
            return Err(ValidationError::Blank {
                field: "evaluator_id",
            });
        }
        if self.category_ratings.is_empty() {
            return Err(ValidationError::EmptyRatings);
        }
        for (category, value) in &self.category_ratings {
            if category.0.trim().is_empty() {
                return Err(ValidationError::Blank {
                    field: "category_ratings",
                });
            }
            if !(MIN_RATING..=MAX_RATING).contains(value) {
                return Err(ValidationError::RatingOutOfRange {
                    category: category.clone(),
                    value: *value,
                });
            }
        }

        let length = self.comment.trim().chars().count();
        if !(MIN_COMMENT_CHARS..=MAX_COMMENT_CHARS).contains(&length) {
            return Err(ValidationError::CommentLength { length });
        }
        Ok(())
    }
}
