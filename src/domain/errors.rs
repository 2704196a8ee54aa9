//! Error taxonomy for the tracking engine.
//!
//! Five caller-visible classes plus storage plumbing. Only the concurrency
//! conflict is retryable; everything else is surfaced immediately.

use crate::domain::types::{UserId, WorkOrderId};
use thiserror::Error;

/// Errors surfaced by the tracking and workflow services.
#[derive(Debug, Clone, Error)]
pub enum TrackingError {
    /// A referenced work order, department, user or part does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requested event is inconsistent with the current status or the
    /// department entry/exit rules.
    #[error("illegal transition: {message} (expected status: {expected})")]
    IllegalTransition { message: String, expected: String },

    /// The acting user exists but is deactivated.
    #[error("user {user_id} is deactivated")]
    InactiveUser { user_id: UserId },

    /// The optimistic precondition failed during a guarded status write.
    /// The caller may retry; the work order moved underneath it.
    #[error("concurrency conflict on work order {work_order_id}: {message}")]
    ConcurrencyConflict {
        work_order_id: WorkOrderId,
        message: String,
    },

    /// A department-specific precondition prevents the transfer.
    #[error("transfer blocked: {reason}")]
    DependencyBlocked {
        reason: String,
        required_actions: Vec<String>,
    },

    /// Persistence failure outside the domain rules.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl TrackingError {
    /// Shorthand for a not-found error with a displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether this error class is worth an internal retry. Only the
    /// concurrency conflict qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Result alias used across the store and service layers.
pub type TrackingResult<T> = Result<T, TrackingError>;
