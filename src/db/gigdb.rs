// db/gigdb.rs
use async_trait::async_trait;
use sqlx::{types::BigDecimal, Postgres, Transaction};
use uuid::Uuid;

use super::db::{map_unique_violation, DBClient, StoreError};
use crate::models::gigmodel::*;

const GIG_COLUMNS: &str = "id, title, description, budget, owner_id, status, created_at";
const BID_COLUMNS: &str = "id, gig_id, freelancer_id, message, price, status, created_at";

#[async_trait]
pub trait GigExt: Send + Sync {
    async fn create_gig(
        &self,
        owner_id: Uuid,
        title: String,
        description: String,
        budget: BigDecimal,
    ) -> Result<Gig, StoreError>;

    async fn get_gig(&self, gig_id: Uuid) -> Result<Option<Gig>, StoreError>;

    async fn get_open_gigs(&self) -> Result<Vec<Gig>, StoreError>;

    /// Fails with [`StoreError::DuplicateBid`] when the freelancer already bid on the gig,
    /// and with [`StoreError::GigClosed`] once the gig is no longer open.
    async fn create_bid(
        &self,
        gig_id: Uuid,
        freelancer_id: Uuid,
        message: String,
        price: BigDecimal,
    ) -> Result<Bid, StoreError>;

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, StoreError>;

    async fn get_bids_by_gig(&self, gig_id: Uuid) -> Result<Vec<Bid>, StoreError>;

    async fn list_bids_for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<Bid>, StoreError>;

    /// Opens the per-gig critical section used by the hire transaction.
    async fn begin_hire(&self, gig_id: Uuid) -> Result<Box<dyn HireUnit>, StoreError>;
}

/// A hire in progress. Reads see the gig as locked by `begin_hire`; nothing is
/// written until `commit`, and dropping the unit discards it.
#[async_trait]
pub trait HireUnit: Send {
    async fn find_bid(&mut self, bid_id: Uuid) -> Result<Option<Bid>, StoreError>;

    async fn find_gig(&mut self) -> Result<Option<Gig>, StoreError>;

    /// Marks the gig assigned, `bid_id` hired and every other bid of the gig rejected.
    async fn commit(self: Box<Self>, bid_id: Uuid) -> Result<HireOutcome, StoreError>;
}

pub struct PgHireUnit {
    tx: Transaction<'static, Postgres>,
    gig_id: Uuid,
    locked_gig: Option<Gig>,
}

#[async_trait]
impl HireUnit for PgHireUnit {
    async fn find_bid(&mut self, bid_id: Uuid) -> Result<Option<Bid>, StoreError> {
        let bid = sqlx::query_as::<_, Bid>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE id = $1"
        ))
        .bind(bid_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(bid)
    }

    async fn find_gig(&mut self) -> Result<Option<Gig>, StoreError> {
        Ok(self.locked_gig.clone())
    }

    async fn commit(self: Box<Self>, bid_id: Uuid) -> Result<HireOutcome, StoreError> {
        let PgHireUnit { mut tx, gig_id, .. } = *self;

        let gig = sqlx::query_as::<_, Gig>(&format!(
            r#"
            UPDATE gigs
            SET status = 'assigned'::gig_status
            WHERE id = $1 AND status = 'open'::gig_status
            RETURNING {GIG_COLUMNS}
            "#
        ))
        .bind(gig_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Inconsistent(format!("gig {} is no longer open", gig_id)))?;

        let bids = sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET status = CASE WHEN id = $2 THEN 'hired'::bid_status ELSE 'rejected'::bid_status END
            WHERE gig_id = $1
            RETURNING {BID_COLUMNS}
            "#
        ))
        .bind(gig_id)
        .bind(bid_id)
        .fetch_all(&mut *tx)
        .await?;

        let hired_bid = bids
            .iter()
            .find(|bid| bid.id == bid_id)
            .cloned()
            .ok_or_else(|| StoreError::Inconsistent(format!("bid {} is not on gig {}", bid_id, gig_id)))?;
        let rejected_count = bids.len().saturating_sub(1) as u64;

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await?;

        Ok(HireOutcome {
            gig,
            hired_bid,
            rejected_count,
        })
    }
}

#[async_trait]
impl GigExt for DBClient {
    async fn create_gig(
        &self,
        owner_id: Uuid,
        title: String,
        description: String,
        budget: BigDecimal,
    ) -> Result<Gig, StoreError> {
        let gig = sqlx::query_as::<_, Gig>(&format!(
            r#"
            INSERT INTO gigs (title, description, budget, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {GIG_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(description)
        .bind(budget)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(gig)
    }

    async fn get_gig(&self, gig_id: Uuid) -> Result<Option<Gig>, StoreError> {
        let gig = sqlx::query_as::<_, Gig>(&format!(
            "SELECT {GIG_COLUMNS} FROM gigs WHERE id = $1"
        ))
        .bind(gig_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gig)
    }

    async fn get_open_gigs(&self) -> Result<Vec<Gig>, StoreError> {
        let gigs = sqlx::query_as::<_, Gig>(&format!(
            r#"
            SELECT {GIG_COLUMNS} FROM gigs
            WHERE status = 'open'::gig_status
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(gigs)
    }

    async fn create_bid(
        &self,
        gig_id: Uuid,
        freelancer_id: Uuid,
        message: String,
        price: BigDecimal,
    ) -> Result<Bid, StoreError> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE conflicts with the hire's FOR UPDATE: a bid either lands
        // before the hire locks the gig or sees the gig already assigned.
        let gig = sqlx::query_as::<_, Gig>(&format!(
            "SELECT {GIG_COLUMNS} FROM gigs WHERE id = $1 FOR SHARE"
        ))
        .bind(gig_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::GigMissing(gig_id))?;

        if gig.status != GigStatus::Open {
            return Err(StoreError::GigClosed(gig_id, gig.status));
        }

        let bid = sqlx::query_as::<_, Bid>(&format!(
            r#"
            INSERT INTO bids (gig_id, freelancer_id, message, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {BID_COLUMNS}
            "#
        ))
        .bind(gig_id)
        .bind(freelancer_id)
        .bind(message)
        .bind(price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, StoreError::DuplicateBid(gig_id)))?;

        tx.commit().await?;

        Ok(bid)
    }

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, StoreError> {
        let bid = sqlx::query_as::<_, Bid>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE id = $1"
        ))
        .bind(bid_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bid)
    }

    async fn get_bids_by_gig(&self, gig_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let bids = sqlx::query_as::<_, Bid>(&format!(
            r#"
            SELECT {BID_COLUMNS} FROM bids
            WHERE gig_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(gig_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }

    async fn list_bids_for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let bids = sqlx::query_as::<_, Bid>(&format!(
            r#"
            SELECT {BID_COLUMNS} FROM bids
            WHERE freelancer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }

    async fn begin_hire(&self, gig_id: Uuid) -> Result<Box<dyn HireUnit>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent hires on this gig until commit or rollback.
        let locked_gig = sqlx::query_as::<_, Gig>(&format!(
            "SELECT {GIG_COLUMNS} FROM gigs WHERE id = $1 FOR UPDATE"
        ))
        .bind(gig_id)
        .fetch_optional(&mut *tx)
        .await?;

        Ok(Box::new(PgHireUnit {
            tx,
            gig_id,
            locked_gig,
        }))
    }
}
