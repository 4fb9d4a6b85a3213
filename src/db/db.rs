// db/db.rs
use sqlx::{Pool, Postgres};
use thiserror::Error;
use uuid::Uuid;

use super::{gigdb::GigExt, userdb::UserExt};
use crate::models::gigmodel::GigStatus;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("A bid from this freelancer already exists for gig {0}")]
    DuplicateBid(Uuid),

    #[error("Gig {0} not found")]
    GigMissing(Uuid),

    #[error("Gig {0} is {status}", status = .1.to_str())]
    GigClosed(Uuid, GigStatus),

    #[error("A user with this email already exists")]
    DuplicateEmail,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything the handlers and services need from a persistence backend.
pub trait Storage: UserExt + GigExt {}

impl<T: UserExt + GigExt> Storage for T {}

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// Maps unique-constraint violations onto the domain duplicates they represent.
pub(crate) fn map_unique_violation(err: sqlx::Error, duplicate: StoreError) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => duplicate,
        _ => StoreError::Database(err),
    }
}
