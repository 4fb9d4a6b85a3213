// service/hire_service.rs
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    db::{db::Storage, gigdb::GigExt},
    models::gigmodel::*,
    service::{
        error::ServiceError,
        health::BackendHealth,
        notification_service::{HireEvent, NotificationDispatcher},
    },
};

#[derive(Clone)]
pub struct HireService {
    store: Arc<dyn Storage>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    health: Arc<BackendHealth>,
    timeout: Duration,
}

impl HireService {
    pub fn new(
        store: Arc<dyn Storage>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        health: Arc<BackendHealth>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            health,
            timeout,
        }
    }

    /// Hires `bid_id` on `gig_id` on behalf of `actor_id`.
    ///
    /// Validation and writes happen inside the gig's critical section, so of
    /// several concurrent hires on one gig only the first to commit succeeds and
    /// the rest see `InvalidState`. Nothing is written unless everything is.
    pub async fn hire(
        &self,
        actor_id: Uuid,
        gig_id: Uuid,
        bid_id: Uuid,
    ) -> Result<HireOutcome, ServiceError> {
        let result = match tokio::time::timeout(self.timeout, self.run_hire(actor_id, gig_id, bid_id)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::TransactionFailure(format!(
                "hire on gig {} did not commit within {:?}",
                gig_id, self.timeout
            ))),
        };

        match &result {
            Ok(outcome) => {
                self.health.record_success();
                tracing::info!(
                    "Gig {} assigned: bid {} hired, {} bid(s) rejected",
                    gig_id,
                    bid_id,
                    outcome.rejected_count
                );
                self.dispatcher.dispatch(HireEvent::from_outcome(outcome));
            }
            Err(e) if e.is_retryable() => {
                self.health.record_failure();
                tracing::error!("Hire of bid {} on gig {} failed: {}", bid_id, gig_id, e);
            }
            Err(e) => {
                tracing::warn!("Hire of bid {} on gig {} refused: {}", bid_id, gig_id, e);
            }
        }

        result
    }

    async fn run_hire(
        &self,
        actor_id: Uuid,
        gig_id: Uuid,
        bid_id: Uuid,
    ) -> Result<HireOutcome, ServiceError> {
        let mut unit = self.store.begin_hire(gig_id).await?;

        let bid = unit
            .find_bid(bid_id)
            .await?
            .filter(|bid| bid.gig_id == gig_id)
            .ok_or(ServiceError::BidNotFound(bid_id))?;

        let gig = unit
            .find_gig()
            .await?
            .ok_or(ServiceError::GigNotFound(gig_id))?;

        if gig.owner_id != actor_id {
            return Err(ServiceError::Unauthorized(actor_id, gig_id));
        }

        if gig.status != GigStatus::Open {
            return Err(ServiceError::InvalidState(gig_id, gig.status));
        }

        let outcome = unit.commit(bid.id).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use sqlx::types::BigDecimal;

    use crate::db::memorydb::MemoryStore;
    use crate::service::notification_service::ConnectionHub;

    #[derive(Default)]
    struct RecordingDispatcher {
        events: Mutex<Vec<HireEvent>>,
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn dispatch(&self, event: HireEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Fixture {
        service: HireService,
        store: Arc<MemoryStore>,
        dispatcher: Arc<RecordingDispatcher>,
        health: Arc<BackendHealth>,
        owner: Uuid,
        gig: Gig,
    }

    async fn fixture_with_timeout(timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let health = Arc::new(BackendHealth::new(1));
        let owner = Uuid::new_v4();
        let gig = store
            .create_gig(owner, "G1".to_string(), "Build a site".to_string(), BigDecimal::from(500))
            .await
            .unwrap();

        let service = HireService::new(store.clone(), dispatcher.clone(), health.clone(), timeout);

        Fixture {
            service,
            store,
            dispatcher,
            health,
            owner,
            gig,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_timeout(Duration::from_secs(5)).await
    }

    async fn bid(store: &MemoryStore, gig_id: Uuid, freelancer: Uuid, price: i32) -> Bid {
        store
            .create_bid(gig_id, freelancer, "I can do it".to_string(), BigDecimal::from(price))
            .await
            .unwrap()
    }

    async fn statuses(store: &MemoryStore, gig_id: Uuid) -> (GigStatus, Vec<(Uuid, BidStatus)>) {
        let gig = store.get_gig(gig_id).await.unwrap().unwrap();
        let bids = store
            .get_bids_by_gig(gig_id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| (b.id, b.status))
            .collect();
        (gig.status, bids)
    }

    #[tokio::test]
    async fn test_hire_assigns_gig_and_rejects_other_bids() {
        let fx = fixture().await;
        let (f1, f2) = (Uuid::new_v4(), Uuid::new_v4());
        let b1 = bid(&fx.store, fx.gig.id, f1, 100).await;
        let b2 = bid(&fx.store, fx.gig.id, f2, 120).await;

        let outcome = fx.service.hire(fx.owner, fx.gig.id, b1.id).await.unwrap();

        assert_eq!(outcome.gig.status, GigStatus::Assigned);
        assert_eq!(outcome.hired_bid.id, b1.id);
        assert_eq!(outcome.rejected_count, 1);

        let stored_b1 = fx.store.get_bid(b1.id).await.unwrap().unwrap();
        let stored_b2 = fx.store.get_bid(b2.id).await.unwrap().unwrap();
        assert_eq!(stored_b1.status, BidStatus::Hired);
        assert_eq!(stored_b2.status, BidStatus::Rejected);
        assert_eq!(
            fx.store.get_gig(fx.gig.id).await.unwrap().unwrap().status,
            GigStatus::Assigned
        );

        let events = fx.dispatcher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].freelancer_id, f1);
        assert_eq!(events[0].gig_id, fx.gig.id);
        assert_eq!(events[0].bid_id, b1.id);
        assert_eq!(events[0].price, 100.0);
    }

    #[tokio::test]
    async fn test_exactly_one_hired_among_many() {
        let fx = fixture().await;
        let mut bids = Vec::new();
        for price in [50, 60, 70, 80, 90] {
            bids.push(bid(&fx.store, fx.gig.id, Uuid::new_v4(), price).await);
        }

        fx.service.hire(fx.owner, fx.gig.id, bids[2].id).await.unwrap();

        let (gig_status, stored) = statuses(&fx.store, fx.gig.id).await;
        assert_eq!(gig_status, GigStatus::Assigned);
        for (id, status) in stored {
            if id == bids[2].id {
                assert_eq!(status, BidStatus::Hired);
            } else {
                assert_eq!(status, BidStatus::Rejected);
            }
        }
    }

    #[tokio::test]
    async fn test_rehire_on_assigned_gig_is_invalid_state() {
        let fx = fixture().await;
        let b1 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 100).await;
        let b2 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 120).await;
        fx.service.hire(fx.owner, fx.gig.id, b1.id).await.unwrap();
        let before = statuses(&fx.store, fx.gig.id).await;

        for bid_id in [b1.id, b2.id] {
            let err = fx.service.hire(fx.owner, fx.gig.id, bid_id).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidState(id, GigStatus::Assigned) if id == fx.gig.id));
            assert!(!err.is_retryable());
        }

        assert_eq!(statuses(&fx.store, fx.gig.id).await, before);
        assert_eq!(fx.dispatcher.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_owner_is_unauthorized() {
        let fx = fixture().await;
        let freelancer = Uuid::new_v4();
        let b1 = bid(&fx.store, fx.gig.id, freelancer, 100).await;
        let before = statuses(&fx.store, fx.gig.id).await;

        for actor in [freelancer, Uuid::new_v4()] {
            let err = fx.service.hire(actor, fx.gig.id, b1.id).await.unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(a, g) if a == actor && g == fx.gig.id));
        }

        assert_eq!(statuses(&fx.store, fx.gig.id).await, before);
        assert!(fx.dispatcher.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_checked_before_gig_state() {
        let fx = fixture().await;
        let b1 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 100).await;
        fx.service.hire(fx.owner, fx.gig.id, b1.id).await.unwrap();

        let err = fx.service.hire(Uuid::new_v4(), fx.gig.id, b1.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_, _)));
    }

    #[tokio::test]
    async fn test_missing_or_mismatched_bid_is_not_found() {
        let fx = fixture().await;
        let other_gig = fx
            .store
            .create_gig(fx.owner, "G2".to_string(), "Other".to_string(), BigDecimal::from(80))
            .await
            .unwrap();
        let foreign = bid(&fx.store, other_gig.id, Uuid::new_v4(), 40).await;

        let missing = Uuid::new_v4();
        let err = fx.service.hire(fx.owner, fx.gig.id, missing).await.unwrap_err();
        assert!(matches!(err, ServiceError::BidNotFound(id) if id == missing));

        let err = fx.service.hire(fx.owner, fx.gig.id, foreign.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::BidNotFound(id) if id == foreign.id));

        // bid is checked before the gig
        let err = fx.service.hire(fx.owner, Uuid::new_v4(), missing).await.unwrap_err();
        assert!(matches!(err, ServiceError::BidNotFound(_)));

        assert_eq!(
            fx.store.get_bid(foreign.id).await.unwrap().unwrap().status,
            BidStatus::Pending
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_hires_on_same_gig() {
        for _ in 0..25 {
            let fx = fixture().await;
            let b1 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 100).await;
            let b2 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 120).await;

            let first = {
                let service = fx.service.clone();
                let (owner, gig_id) = (fx.owner, fx.gig.id);
                tokio::spawn(async move { service.hire(owner, gig_id, b1.id).await })
            };
            let second = {
                let service = fx.service.clone();
                let (owner, gig_id) = (fx.owner, fx.gig.id);
                tokio::spawn(async move { service.hire(owner, gig_id, b2.id).await })
            };

            let results = [first.await.unwrap(), second.await.unwrap()];
            let successes = results.iter().filter(|r| r.is_ok()).count();
            let losers = results
                .iter()
                .filter(|r| matches!(r, Err(ServiceError::InvalidState(_, GigStatus::Assigned))))
                .count();
            assert_eq!(successes, 1);
            assert_eq!(losers, 1);

            let (gig_status, stored) = statuses(&fx.store, fx.gig.id).await;
            assert_eq!(gig_status, GigStatus::Assigned);
            assert_eq!(stored.iter().filter(|(_, s)| *s == BidStatus::Hired).count(), 1);
            assert_eq!(stored.iter().filter(|(_, s)| *s == BidStatus::Rejected).count(), 1);
            assert_eq!(fx.dispatcher.events.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_is_transaction_failure() {
        let fx = fixture().await;
        let b1 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 100).await;
        let before = statuses(&fx.store, fx.gig.id).await;

        fx.store.set_unavailable(true);
        let err = fx.service.hire(fx.owner, fx.gig.id, b1.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::TransactionFailure(_)));
        assert!(err.is_retryable());
        assert!(fx.health.is_degraded());

        fx.store.set_unavailable(false);
        assert_eq!(statuses(&fx.store, fx.gig.id).await, before);

        fx.service.hire(fx.owner, fx.gig.id, b1.id).await.unwrap();
        assert!(!fx.health.is_degraded());
    }

    #[tokio::test]
    async fn test_hire_that_cannot_lock_in_time_fails_closed() {
        let fx = fixture_with_timeout(Duration::from_millis(50)).await;
        let b1 = bid(&fx.store, fx.gig.id, Uuid::new_v4(), 100).await;
        let before = statuses(&fx.store, fx.gig.id).await;

        let held = fx.store.begin_hire(fx.gig.id).await.unwrap();
        let err = fx.service.hire(fx.owner, fx.gig.id, b1.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::TransactionFailure(_)));
        drop(held);

        assert_eq!(statuses(&fx.store, fx.gig.id).await, before);
        assert!(fx.dispatcher.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hires_on_different_gigs_do_not_contend() {
        let fx = fixture_with_timeout(Duration::from_millis(200)).await;
        let other = fx
            .store
            .create_gig(fx.owner, "G2".to_string(), "Other".to_string(), BigDecimal::from(90))
            .await
            .unwrap();
        let other_bid = bid(&fx.store, other.id, Uuid::new_v4(), 60).await;

        let _held = fx.store.begin_hire(fx.gig.id).await.unwrap();
        let outcome = fx.service.hire(fx.owner, other.id, other_bid.id).await.unwrap();
        assert_eq!(outcome.gig.id, other.id);
    }

    #[tokio::test]
    async fn test_offline_freelancer_sees_hire_on_next_read() {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(ConnectionHub::new());
        let service = HireService::new(
            store.clone(),
            hub.clone(),
            Arc::new(BackendHealth::new(3)),
            Duration::from_secs(5),
        );
        let owner = Uuid::new_v4();
        let (offline, online) = (Uuid::new_v4(), Uuid::new_v4());

        let gig1 = store
            .create_gig(owner, "G1".to_string(), "one".to_string(), BigDecimal::from(100))
            .await
            .unwrap();
        let gig2 = store
            .create_gig(owner, "G2".to_string(), "two".to_string(), BigDecimal::from(100))
            .await
            .unwrap();
        let offline_bid = bid(&store, gig1.id, offline, 100).await;
        let online_bid = bid(&store, gig2.id, online, 75).await;

        let (_, mut rx) = hub.register_connection(online);

        service.hire(owner, gig1.id, offline_bid.id).await.unwrap();
        service.hire(owner, gig2.id, online_bid.id).await.unwrap();

        let mine = store.list_bids_for_freelancer(offline).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, BidStatus::Hired);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.bid_id, online_bid.id);
        assert_eq!(event.gig_title, "G2");
        assert_eq!(event.price, 75.0);
        assert!(rx.try_recv().is_err());
    }
}
