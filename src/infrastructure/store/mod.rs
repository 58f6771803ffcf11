pub mod conversation_store;
pub mod documents;
pub mod memory;
pub mod request_store;

pub use conversation_store::MemoryConversationStore;
pub use memory::{Document, MemoryDocumentStore, Query, SortDir, WriteOp, SERVER_TIMESTAMP};
pub use request_store::MemoryRequestStore;

use crate::application::ports::Snapshots;
use crate::shared::AppError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Bounds one store round trip. Elapsing the limit surfaces as
/// `StoreUnavailable`; status transitions are idempotent and appends are
/// deduplicated by id, so callers may retry.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(AppError::StoreUnavailable(format!(
            "store operation timed out after {limit:?}"
        ))),
    }
}

/// Bridges a raw document subscription into a typed snapshot stream.
///
/// Malformed documents are logged and skipped rather than failing the whole
/// snapshot. The forwarding task exits once every consumer handle is gone,
/// which in turn releases the underlying store subscription.
pub(crate) fn relay_snapshots<T, P, A>(
    mut docs_rx: watch::Receiver<Vec<Document>>,
    parse: P,
    arrange: A,
) -> Snapshots<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    P: Fn(&Document) -> Result<T, AppError> + Send + 'static,
    A: Fn(&mut Vec<T>) + Send + 'static,
{
    let convert = move |docs: &[Document]| -> Vec<T> {
        let mut items: Vec<T> = docs
            .iter()
            .filter_map(|doc| match parse(doc) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(document = %doc.id, error = %err, "skipping malformed document");
                    None
                }
            })
            .collect();
        arrange(&mut items);
        items
    };

    let initial = convert(&docs_rx.borrow());
    let (tx, rx) = watch::channel(initial);
    tokio::spawn(async move {
        while docs_rx.changed().await.is_ok() {
            let next = convert(&docs_rx.borrow());
            if tx.send(next).is_err() {
                break;
            }
        }
    });
    Snapshots::new(rx)
}
