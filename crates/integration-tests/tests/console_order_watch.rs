//! Integration tests for the console's live order watch.
//!
//! The watch's contract is session-relative: orders that existed when the
//! console opened must never alert, a batch alerts at most once, and a
//! lost subscription is reported exactly once with no reconnect. These
//! scenarios run the real subscription pipeline over the in-memory store.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use warung_console::{OrderDesk, OrderEvent, spawn_order_watch};
use warung_core::OrderId;
use warung_integration_tests::{init_tracing, memory_store, seed_order, seed_product};
use warung_store::{
    ChangeBatch, Document, DocumentStore, SortDirection, StoreError, Subscription, WriteFields,
};

// =============================================================================
// Session-Relative Novelty
// =============================================================================

#[tokio::test]
async fn test_preexisting_orders_never_alert() {
    init_tracing();
    let store = memory_store();
    let bandeng = seed_product(&store, "Bandeng Presto", 45000.0, 50).await;

    // Ten orders already in the book before the console opens.
    let opened_at = Utc::now();
    for minutes in 1..=10 {
        seed_order(
            &store,
            &bandeng,
            1,
            "pending",
            opened_at - Duration::minutes(minutes),
        )
        .await;
    }

    let mut watch = spawn_order_watch(store.clone()).await.expect("watch starts");

    // The initial snapshot refreshes the view and stays silent.
    assert_eq!(
        watch.recv().await.expect("initial delivery"),
        OrderEvent::Updated {
            total: 10,
            pending: 10
        }
    );

    // The next order is genuinely new; the very next events prove nothing
    // alerted for the initial batch.
    seed_order(
        &store,
        &bandeng,
        2,
        "pending",
        Utc::now() + Duration::seconds(5),
    )
    .await;

    assert_eq!(
        watch.recv().await.expect("update for new order"),
        OrderEvent::Updated {
            total: 11,
            pending: 11
        }
    );
    assert_eq!(
        watch.recv().await.expect("alert for new order"),
        OrderEvent::NewOrders { count: 1 }
    );
}

#[tokio::test]
async fn test_order_inside_grace_window_stays_silent() {
    init_tracing();
    let store = memory_store();
    let lumpia = seed_product(&store, "Lumpia", 20000.0, 50).await;

    let mut watch = spawn_order_watch(store.clone()).await.expect("watch starts");
    let session_start = watch.session_start();
    assert_eq!(
        watch.recv().await.expect("initial delivery"),
        OrderEvent::Updated {
            total: 0,
            pending: 0
        }
    );

    // Stamped one second before the session: inside the grace window.
    seed_order(
        &store,
        &lumpia,
        1,
        "pending",
        session_start - Duration::seconds(1),
    )
    .await;
    assert_eq!(
        watch.recv().await.expect("update"),
        OrderEvent::Updated {
            total: 1,
            pending: 1
        }
    );

    // Well past the window: this one alerts, and only this one.
    seed_order(
        &store,
        &lumpia,
        1,
        "pending",
        session_start + Duration::seconds(5),
    )
    .await;
    assert_eq!(
        watch.recv().await.expect("update"),
        OrderEvent::Updated {
            total: 2,
            pending: 2
        }
    );
    assert_eq!(
        watch.recv().await.expect("alert"),
        OrderEvent::NewOrders { count: 1 }
    );
}

// =============================================================================
// Completing Orders Through the Watch
// =============================================================================

#[tokio::test]
async fn test_completion_updates_pending_count_without_alert() {
    init_tracing();
    let store = memory_store();
    let sambal = seed_product(&store, "Sambal Terasi", 25000.0, 50).await;
    let order_id = seed_order(
        &store,
        &sambal,
        1,
        "pending",
        Utc::now() - Duration::minutes(5),
    )
    .await;

    let mut watch = spawn_order_watch(store.clone()).await.expect("watch starts");
    assert_eq!(
        watch.recv().await.expect("initial delivery"),
        OrderEvent::Updated {
            total: 1,
            pending: 1
        }
    );

    OrderDesk::new(store.clone())
        .complete(&OrderId::new(order_id))
        .await
        .expect("complete order");

    // A status flip is a modification: the view refreshes, nothing alerts.
    assert_eq!(
        watch.recv().await.expect("update after completion"),
        OrderEvent::Updated {
            total: 1,
            pending: 0
        }
    );
    assert_eq!(watch.pending(), 0);
    assert_eq!(watch.orders().len(), 1);
}

// =============================================================================
// Subscription Failure
// =============================================================================

/// Store whose order subscription dies right after its initial delivery.
struct DroppingStore;

#[async_trait]
impl DocumentStore for DroppingStore {
    async fn insert(&self, _: &str, _: WriteFields<'_>) -> Result<String, StoreError> {
        Err(unavailable())
    }

    async fn list(
        &self,
        _: &str,
        _: &str,
        _: SortDirection,
    ) -> Result<Vec<Document>, StoreError> {
        Err(unavailable())
    }

    async fn update_fields(&self, _: &str, _: &str, _: WriteFields<'_>) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn remove(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn subscribe(
        &self,
        _: &str,
        _: &str,
        _: SortDirection,
    ) -> Result<Subscription, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Ok(ChangeBatch::default()));
        let _ = sender.send(Err(unavailable()));
        Ok(Subscription::new(receiver))
    }
}

fn unavailable() -> StoreError {
    StoreError::Api {
        status: 503,
        message: "backend unavailable".to_owned(),
    }
}

#[tokio::test]
async fn test_lost_subscription_is_reported_once_then_ends() {
    init_tracing();
    let store: warung_store::SharedStore = std::sync::Arc::new(DroppingStore);

    let mut watch = spawn_order_watch(store).await.expect("subscribe succeeds");

    assert_eq!(
        watch.recv().await.expect("initial delivery"),
        OrderEvent::Updated {
            total: 0,
            pending: 0
        }
    );
    match watch.recv().await.expect("loss event") {
        OrderEvent::SubscriptionLost { reason } => {
            assert!(reason.contains("backend unavailable"));
        }
        other => panic!("expected SubscriptionLost, got {other:?}"),
    }

    // No reconnect: the stream is over.
    assert_eq!(watch.recv().await, None);
}
