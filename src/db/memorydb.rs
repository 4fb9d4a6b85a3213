// db/memorydb.rs
//
// In-process backend used for local runs and the test suite. It implements the
// same traits as `DBClient` so business rules never branch on the backend.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::BigDecimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{
    db::StoreError,
    gigdb::{GigExt, HireUnit},
    userdb::UserExt,
};
use crate::models::{gigmodel::*, usermodel::User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    gigs: HashMap<Uuid, Gig>,
    bids: HashMap<Uuid, Bid>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    gig_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the backing store going away; every operation fails with
    /// [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Locks entries are only cloned under the map lock, so one with a strong
    /// count of 1 has no holder or waiter and can be dropped.
    async fn gig_lock(&self, gig_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.gig_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(gig_id).or_default().clone()
    }
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) async fn take_gig(&self, gig_id: Uuid) -> Option<Gig> {
        self.tables.write().await.gigs.remove(&gig_id)
    }

    pub(crate) async fn put_gig(&self, gig: Gig) {
        self.tables.write().await.gigs.insert(gig.id, gig);
    }
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;

        let user = match (user_id, email) {
            (Some(id), _) => tables.users.get(&id).cloned(),
            (None, Some(email)) => tables.users.values().find(|u| u.email == email).cloned(),
            (None, None) => None,
        };

        Ok(user)
    }

    async fn save_user(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<User, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }
}

#[async_trait]
impl GigExt for MemoryStore {
    async fn create_gig(
        &self,
        owner_id: Uuid,
        title: String,
        description: String,
        budget: BigDecimal,
    ) -> Result<Gig, StoreError> {
        self.ensure_available()?;

        let gig = Gig {
            id: Uuid::new_v4(),
            title,
            description,
            budget,
            owner_id,
            status: GigStatus::Open,
            created_at: Utc::now(),
        };
        self.tables.write().await.gigs.insert(gig.id, gig.clone());

        Ok(gig)
    }

    async fn get_gig(&self, gig_id: Uuid) -> Result<Option<Gig>, StoreError> {
        self.ensure_available()?;
        Ok(self.tables.read().await.gigs.get(&gig_id).cloned())
    }

    async fn get_open_gigs(&self) -> Result<Vec<Gig>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;

        let mut gigs: Vec<Gig> = tables
            .gigs
            .values()
            .filter(|g| g.status == GigStatus::Open)
            .cloned()
            .collect();
        gigs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(gigs)
    }

    async fn create_bid(
        &self,
        gig_id: Uuid,
        freelancer_id: Uuid,
        message: String,
        price: BigDecimal,
    ) -> Result<Bid, StoreError> {
        self.ensure_available()?;
        let _gig_guard = self.gig_lock(gig_id).await.lock_owned().await;
        let mut tables = self.tables.write().await;

        match tables.gigs.get(&gig_id) {
            None => return Err(StoreError::GigMissing(gig_id)),
            Some(gig) if gig.status != GigStatus::Open => {
                return Err(StoreError::GigClosed(gig_id, gig.status))
            }
            Some(_) => {}
        }

        let duplicate = tables
            .bids
            .values()
            .any(|b| b.gig_id == gig_id && b.freelancer_id == freelancer_id);
        if duplicate {
            return Err(StoreError::DuplicateBid(gig_id));
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            gig_id,
            freelancer_id,
            message,
            price,
            status: BidStatus::Pending,
            created_at: Utc::now(),
        };
        tables.bids.insert(bid.id, bid.clone());

        Ok(bid)
    }

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, StoreError> {
        self.ensure_available()?;
        Ok(self.tables.read().await.bids.get(&bid_id).cloned())
    }

    async fn get_bids_by_gig(&self, gig_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;

        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.gig_id == gig_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(bids)
    }

    async fn list_bids_for_freelancer(&self, freelancer_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;

        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.freelancer_id == freelancer_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(bids)
    }

    async fn begin_hire(&self, gig_id: Uuid) -> Result<Box<dyn HireUnit>, StoreError> {
        self.ensure_available()?;
        let guard = self.gig_lock(gig_id).await.lock_owned().await;

        Ok(Box::new(MemoryHireUnit {
            store: self.clone(),
            gig_id,
            _guard: guard,
        }))
    }
}

pub struct MemoryHireUnit {
    store: MemoryStore,
    gig_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl HireUnit for MemoryHireUnit {
    async fn find_bid(&mut self, bid_id: Uuid) -> Result<Option<Bid>, StoreError> {
        self.store.get_bid(bid_id).await
    }

    async fn find_gig(&mut self) -> Result<Option<Gig>, StoreError> {
        self.store.get_gig(self.gig_id).await
    }

    async fn commit(self: Box<Self>, bid_id: Uuid) -> Result<HireOutcome, StoreError> {
        self.store.ensure_available()?;
        let mut tables = self.store.tables.write().await;
        let Tables { gigs, bids, .. } = &mut *tables;

        // Check everything before the first write so a failure leaves no trace.
        match gigs.get(&self.gig_id) {
            Some(gig) if gig.status == GigStatus::Open => {}
            _ => {
                return Err(StoreError::Inconsistent(format!(
                    "gig {} is no longer open",
                    self.gig_id
                )))
            }
        }
        if !bids.get(&bid_id).is_some_and(|b| b.gig_id == self.gig_id) {
            return Err(StoreError::Inconsistent(format!(
                "bid {} is not on gig {}",
                bid_id, self.gig_id
            )));
        }

        let mut rejected_count = 0;
        let mut hired_bid = None;
        for bid in bids.values_mut().filter(|b| b.gig_id == self.gig_id) {
            if bid.id == bid_id {
                bid.status = BidStatus::Hired;
                hired_bid = Some(bid.clone());
            } else {
                bid.status = BidStatus::Rejected;
                rejected_count += 1;
            }
        }

        let gig = gigs
            .get_mut(&self.gig_id)
            .map(|gig| {
                gig.status = GigStatus::Assigned;
                gig.clone()
            })
            .ok_or_else(|| StoreError::Inconsistent(format!("gig {} vanished", self.gig_id)))?;
        let hired_bid = hired_bid
            .ok_or_else(|| StoreError::Inconsistent(format!("bid {} vanished", bid_id)))?;

        Ok(HireOutcome {
            gig,
            hired_bid,
            rejected_count,
        })
    }
}
