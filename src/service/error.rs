use thiserror::Error;
use uuid::Uuid;
use axum::http::StatusCode;

use crate::{
    db::db::StoreError,
    error::HttpError,
    models::gigmodel::GigStatus,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Bid {0} not found for this gig")]
    BidNotFound(Uuid),

    #[error("Gig {0} not found")]
    GigNotFound(Uuid),

    #[error("User {0} is not authorized to hire on gig {1}")]
    Unauthorized(Uuid, Uuid),

    #[error("Gig {0} is {status}", status = .1.to_str())]
    InvalidState(Uuid, GigStatus),

    #[error("A bid from this freelancer already exists for gig {0}")]
    DuplicateBid(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transaction could not be committed: {0}")]
    TransactionFailure(String),
}

impl ServiceError {
    /// Only a failed commit is worth retrying; every other error means the
    /// caller's view of the gig is stale.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::TransactionFailure(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BidNotFound(_) | ServiceError::GigNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Unauthorized(_, _) => StatusCode::FORBIDDEN,

            ServiceError::InvalidState(_, _) | ServiceError::DuplicateBid(_) => StatusCode::CONFLICT,

            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::TransactionFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateBid(gig_id) => ServiceError::DuplicateBid(gig_id),
            StoreError::GigMissing(gig_id) => ServiceError::GigNotFound(gig_id),
            StoreError::GigClosed(gig_id, status) => ServiceError::InvalidState(gig_id, status),
            StoreError::DuplicateEmail => ServiceError::Validation(error.to_string()),
            StoreError::Unavailable(_)
            | StoreError::Inconsistent(_)
            | StoreError::Database(_) => ServiceError::TransactionFailure(error.to_string()),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        HttpError::new(error.to_string(), error.status_code())
    }
}

impl From<StoreError> for HttpError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateBid(_) | StoreError::DuplicateEmail => {
                HttpError::unique_constraint_violation(error.to_string())
            }
            StoreError::GigMissing(_) => HttpError::not_found(error.to_string()),
            StoreError::GigClosed(_, _) => HttpError::conflict(error.to_string()),
            StoreError::Unavailable(_) => HttpError::service_unavailable(error.to_string()),
            _ => HttpError::server_error(error.to_string()),
        }
    }
}
