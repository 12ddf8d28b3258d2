//! Live change delivery: batches, diffing, and subscription handles.
//!
//! Consumers of a subscription get one [`ChangeBatch`] per delivery. The
//! batch-versus-entry distinction is a hard contract: alerting logic runs
//! per batch while view state is replaced from the batch's full snapshot,
//! so a batch always carries both the typed entries and the snapshot they
//! produced.

use tokio::sync::mpsc;

use crate::document::Document;
use crate::error::StoreError;

/// One delivery from a live subscription.
///
/// The first batch of a subscription carries the full existing collection
/// as `added` entries. Every later batch describes one observed change,
/// again with full document content per entry, plus the complete
/// post-change `snapshot` in query order.
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    /// Documents that entered the query results.
    pub added: Vec<Document>,
    /// Documents whose fields changed.
    pub modified: Vec<Document>,
    /// Documents that left the query results.
    pub removed: Vec<Document>,
    /// The full result set after this change, in query order.
    pub snapshot: Vec<Document>,
}

impl ChangeBatch {
    /// Whether this batch contains any typed entries.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty())
    }
}

/// Diff two ordered snapshots of the same query into a batch.
///
/// Documents present only in `next` are `added`, present only in `last`
/// are `removed`, and present in both with different fields are
/// `modified`. Entry order follows `next` (and `last` for removals).
pub(crate) fn diff_snapshots(last: &[Document], next: &[Document]) -> ChangeBatch {
    let mut batch = ChangeBatch {
        snapshot: next.to_vec(),
        ..ChangeBatch::default()
    };

    for doc in next {
        match last.iter().find(|prev| prev.id == doc.id) {
            None => batch.added.push(doc.clone()),
            Some(prev) if prev.fields != doc.fields => batch.modified.push(doc.clone()),
            Some(_) => {}
        }
    }

    for prev in last {
        if !next.iter().any(|doc| doc.id == prev.id) {
            batch.removed.push(prev.clone());
        }
    }

    batch
}

/// Item type flowing through a subscription channel.
pub type Delivery = Result<ChangeBatch, StoreError>;

/// Handle to a live collection subscription.
///
/// Receive deliveries with [`recv`](Self::recv). A delivery is either a
/// [`ChangeBatch`] or, if the backing transport fails, a single
/// [`StoreError`] after which the stream ends; there is no automatic
/// reconnect. Dropping the handle (or calling
/// [`unsubscribe`](Self::unsubscribe)) detaches it from the store.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    /// Wrap a delivery channel as a subscription handle.
    ///
    /// Store implementations keep the sending half and drop it (or observe
    /// the send failing) once the subscriber goes away.
    #[must_use]
    pub const fn new(receiver: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Wait for the next delivery.
    ///
    /// Returns `None` once the subscription has ended: after an error
    /// delivery, after [`unsubscribe`](Self::unsubscribe), or when the
    /// store side shut down.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Detach from the store.
    ///
    /// The store notices the closed channel on its next delivery attempt
    /// and releases the watcher.
    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
