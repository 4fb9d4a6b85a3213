// service/hire_poller.rs
use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        db::{StoreError, Storage},
        gigdb::GigExt,
    },
    models::gigmodel::{Bid, BidStatus},
    service::notification_service::HireEvent,
};

/// Pull-mode hire detection for one freelancer: reads their bid list and
/// reports hired bids it has not reported before.
pub struct HirePoller {
    store: Arc<dyn Storage>,
    freelancer_id: Uuid,
    seen: HashSet<Uuid>,
    seeded: bool,
}

impl HirePoller {
    pub fn new(store: Arc<dyn Storage>, freelancer_id: Uuid) -> Self {
        Self {
            store,
            freelancer_id,
            seen: HashSet::new(),
            seeded: false,
        }
    }

    /// The first call only records hires that already exist, so a client that
    /// connects late is not flooded with old news.
    ///
    /// `seen` is only updated once every read has finished, so dropping the
    /// future part way through loses nothing.
    pub async fn poll(&mut self) -> Result<Vec<HireEvent>, StoreError> {
        let bids = self.store.list_bids_for_freelancer(self.freelancer_id).await?;
        let fresh = self.newly_hired(bids);

        if !self.seeded {
            self.seen.extend(fresh.iter().map(|bid| bid.id));
            self.seeded = true;
            return Ok(Vec::new());
        }

        let mut events = Vec::with_capacity(fresh.len());
        for bid in &fresh {
            match self.store.get_gig(bid.gig_id).await? {
                Some(gig) => events.push(HireEvent::new(bid, &gig)),
                // Left out of `seen`, so the next poll tries again.
                None => tracing::warn!("Hired bid {} points at missing gig {}", bid.id, bid.gig_id),
            }
        }

        self.seen.extend(events.iter().map(|event| event.bid_id));
        Ok(events)
    }

    fn newly_hired(&self, bids: Vec<Bid>) -> Vec<Bid> {
        bids.into_iter()
            .filter(|bid| bid.status == BidStatus::Hired)
            .filter(|bid| !self.seen.contains(&bid.id))
            .collect()
    }
}
