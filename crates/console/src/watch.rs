//! Live order watch for the seller console.
//!
//! One continuously-running subscription per console session. Novelty is
//! session-relative: only orders stamped after the session started count as
//! new, and a batch raises at most one alert no matter how many new orders
//! it carries. A lost subscription is reported once and the watch ends; the
//! seller restarts the session to reattach.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warung_core::{Order, collections};
use warung_store::{
    ChangeBatch, Document, DocumentStore, SharedStore, SortDirection, StoreError,
};

/// Orders stamped within this window after session start stay silent.
///
/// The window absorbs clock skew between the client and the backend's
/// server timestamps by suppressing borderline alerts, never duplicating
/// them. An order the seller genuinely receives in the first two seconds
/// of a session is the accepted false negative.
const NEW_ORDER_GRACE_SECS: i64 = 2;

/// What one applied batch changed, as counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchUpdate {
    /// Added orders classified as new to this session.
    pub new_orders: usize,
    /// Orders in the post-change snapshot.
    pub total: usize,
    /// Pending orders in the post-change snapshot.
    pub pending: usize,
}

/// Session-relative order classifier.
///
/// Pure and synchronous: [`apply`](Self::apply) folds one [`ChangeBatch`]
/// into the watch state and reports what changed. [`spawn_order_watch`]
/// drives it from a live subscription; tests drive it directly.
pub struct OrderWatch {
    session_start: DateTime<Utc>,
    orders: Vec<Order>,
}

impl OrderWatch {
    /// Start a watch session. Orders created after `session_start` (plus
    /// the grace window) count as new.
    #[must_use]
    pub const fn new(session_start: DateTime<Utc>) -> Self {
        Self {
            session_start,
            orders: Vec::new(),
        }
    }

    /// Fold one delivery into the watch.
    ///
    /// Added entries are classified against the session start; the order
    /// list is then replaced wholesale from the batch snapshot and the
    /// pending count recomputed. Alerting is per batch: the caller raises
    /// one alert when `new_orders > 0`.
    pub fn apply(&mut self, batch: &ChangeBatch) -> WatchUpdate {
        let new_orders = batch
            .added
            .iter()
            .filter(|doc| self.is_new(doc))
            .count();

        self.orders = parse_orders(&batch.snapshot);

        WatchUpdate {
            new_orders,
            total: self.orders.len(),
            pending: self.pending(),
        }
    }

    /// The last applied snapshot, in query order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Orders in the snapshot still awaiting completion.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.orders.iter().filter(|order| order.is_pending()).count()
    }

    /// When this watch session started.
    #[must_use]
    pub const fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    fn is_new(&self, doc: &Document) -> bool {
        creation_time(doc) > self.session_start + Duration::seconds(NEW_ORDER_GRACE_SECS)
    }
}

/// An added entry's creation time, read from its `createdAt` field.
///
/// Missing or unparseable stamps fall back to "now": a document whose
/// server timestamp has not resolved yet is by definition a fresh write.
fn creation_time(doc: &Document) -> DateTime<Utc> {
    doc.field("createdAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or_else(Utc::now, |at| at.with_timezone(&Utc))
}

/// Decode snapshot documents, skipping any that do not parse.
fn parse_orders(docs: &[Document]) -> Vec<Order> {
    docs.iter()
        .filter_map(|doc| match doc.parse::<Order>() {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping undecodable order");
                None
            }
        })
        .collect()
}

/// Notifications emitted by the spawned watch, in delivery order.
///
/// Every applied batch emits `Updated` first; `NewOrders` follows only
/// when the batch carried session-new orders, once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// The order snapshot changed; refresh the view.
    Updated {
        /// Orders in the snapshot.
        total: usize,
        /// Pending orders in the snapshot.
        pending: usize,
    },
    /// Session-new orders arrived in one batch.
    NewOrders {
        /// How many of the batch's added orders were new.
        count: usize,
    },
    /// The subscription failed; no further events will arrive.
    SubscriptionLost {
        /// Human-readable transport or backend error.
        reason: String,
    },
}

/// Running order watch: an event stream plus shared read access to the
/// latest snapshot. Dropping the handle stops the watch.
pub struct OrderWatchHandle {
    events: mpsc::UnboundedReceiver<OrderEvent>,
    state: Arc<RwLock<OrderWatch>>,
    task: JoinHandle<()>,
}

impl OrderWatchHandle {
    /// Receive the next event. `None` means the watch has ended.
    pub async fn recv(&mut self) -> Option<OrderEvent> {
        self.events.recv().await
    }

    /// Clone of the latest order snapshot, in query order.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state.read().orders().to_vec()
    }

    /// Pending orders in the latest snapshot.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.read().pending()
    }

    /// When this watch session started.
    #[must_use]
    pub fn session_start(&self) -> DateTime<Utc> {
        self.state.read().session_start()
    }
}

impl Drop for OrderWatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the console's order watch over `store`.
///
/// The session start is pinned before the subscription opens, so every
/// order in the initial snapshot predates it and the initial delivery can
/// never alert. There is no automatic reconnect: after
/// [`OrderEvent::SubscriptionLost`] the stream ends.
///
/// # Errors
///
/// Returns a [`StoreError`] when the subscription cannot be established;
/// nothing is spawned in that case.
pub async fn spawn_order_watch(store: SharedStore) -> Result<OrderWatchHandle, StoreError> {
    let session_start = Utc::now();
    let mut subscription = store
        .subscribe(collections::ORDERS, "createdAt", SortDirection::Descending)
        .await?;
    info!(%session_start, "order watch started");

    let state = Arc::new(RwLock::new(OrderWatch::new(session_start)));
    let (sender, events) = mpsc::unbounded_channel();

    let task_state = Arc::clone(&state);
    let task = tokio::spawn(async move {
        while let Some(delivery) = subscription.recv().await {
            match delivery {
                Ok(batch) => {
                    let update = task_state.write().apply(&batch);
                    debug!(
                        total = update.total,
                        pending = update.pending,
                        new = update.new_orders,
                        "order snapshot applied"
                    );
                    if sender
                        .send(OrderEvent::Updated {
                            total: update.total,
                            pending: update.pending,
                        })
                        .is_err()
                    {
                        break;
                    }
                    // One alert per batch, however many orders it carried.
                    if update.new_orders > 0 {
                        info!(count = update.new_orders, "new orders arrived");
                        if sender
                            .send(OrderEvent::NewOrders {
                                count: update.new_orders,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "order subscription lost");
                    let _ = sender.send(OrderEvent::SubscriptionLost {
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
    });

    Ok(OrderWatchHandle {
        events,
        state,
        task,
    })
}
