// service/gig_service.rs
use std::sync::Arc;

use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{db::Storage, gigdb::GigExt},
    models::gigmodel::*,
    service::error::ServiceError,
};

#[derive(Clone)]
pub struct GigService {
    store: Arc<dyn Storage>,
}

/// Largest amount a `NUMERIC(12,2)` money column holds.
pub const MAX_AMOUNT: f64 = 9_999_999_999.99;

fn to_money(value: f64, field: &str) -> Result<BigDecimal, ServiceError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ServiceError::Validation(format!("{} must be greater than zero", field)));
    }
    if value > MAX_AMOUNT {
        return Err(ServiceError::Validation(format!(
            "{} must not exceed {:.2}",
            field, MAX_AMOUNT
        )));
    }

    BigDecimal::try_from(value)
        .map(|amount| amount.round(2).with_scale(2))
        .map_err(|_| ServiceError::Validation(format!("Invalid {}", field)))
}

impl GigService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    pub async fn create_gig(
        &self,
        owner_id: Uuid,
        title: String,
        description: String,
        budget: f64,
    ) -> Result<Gig, ServiceError> {
        let budget = to_money(budget, "budget")?;
        let gig = self
            .store
            .create_gig(owner_id, title.trim().to_string(), description, budget)
            .await?;

        tracing::info!("New gig {} posted by {}", gig.id, owner_id);
        Ok(gig)
    }

    /// Places a bid. One bid per freelancer per gig; a repeat leaves the first untouched.
    /// The open check here is a fast path; the store repeats it under the gig lock.
    pub async fn place_bid(
        &self,
        freelancer_id: Uuid,
        gig_id: Uuid,
        message: String,
        price: f64,
    ) -> Result<Bid, ServiceError> {
        let price = to_money(price, "price")?;

        let gig = self
            .store
            .get_gig(gig_id)
            .await?
            .ok_or(ServiceError::GigNotFound(gig_id))?;

        if gig.status != GigStatus::Open {
            return Err(ServiceError::InvalidState(gig_id, gig.status));
        }

        if gig.owner_id == freelancer_id {
            return Err(ServiceError::Validation("You cannot bid on your own gig".to_string()));
        }

        let bid = self
            .store
            .create_bid(gig_id, freelancer_id, message, price)
            .await?;

        tracing::info!("Bid {} placed on gig {} by {}", bid.id, gig_id, freelancer_id);
        Ok(bid)
    }

    /// Bids on a gig, visible to the gig owner only.
    pub async fn bids_for_owner(&self, actor_id: Uuid, gig_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        let gig = self
            .store
            .get_gig(gig_id)
            .await?
            .ok_or(ServiceError::GigNotFound(gig_id))?;

        if gig.owner_id != actor_id {
            return Err(ServiceError::Unauthorized(actor_id, gig_id));
        }

        Ok(self.store.get_bids_by_gig(gig_id).await?)
    }
}
