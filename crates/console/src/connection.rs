//! Startup connection probe.

use tracing::info;
use warung_store::{DocumentStore, SharedStore, SortDirection, StoreError, WriteValue};

/// Scratch collection the probe writes to.
const PROBE_COLLECTION: &str = "test";

/// Verify the store is reachable and writable.
///
/// Inserts a marker document into a scratch collection and immediately
/// removes it again, exercising both a write and a delete before the
/// console starts its watches.
///
/// # Errors
///
/// Returns the backend's [`StoreError`] when either the insert or the
/// cleanup delete fails.
pub async fn verify_connection(store: &SharedStore) -> Result<(), StoreError> {
    let id = store
        .insert(
            PROBE_COLLECTION,
            vec![
                ("test", WriteValue::set("connection")),
                ("timestamp", WriteValue::ServerTimestamp),
            ],
        )
        .await?;
    store.remove(PROBE_COLLECTION, &id).await?;
    info!("store connection verified");
    Ok(())
}
