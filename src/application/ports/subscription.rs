use crate::shared::AppError;
use tokio::sync::watch;

/// Handle on a live snapshot stream.
///
/// Each subscription is an independent channel delivering ordered snapshots:
/// the current matching data at subscribe time, then a fresh snapshot after
/// every store commit that touches the query. Consumers only ever observe the
/// latest snapshot, so redelivery of an unchanged snapshot is harmless by
/// construction. Dropping the handle releases the subscription.
#[derive(Debug)]
pub struct Snapshots<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Snapshots<T> {
    pub fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// The most recently delivered snapshot.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot. Fails with `StoreUnavailable` once the
    /// publishing side has gone away for good.
    pub async fn changed(&mut self) -> Result<(), AppError> {
        self.rx
            .changed()
            .await
            .map_err(|_| AppError::StoreUnavailable("subscription channel closed".into()))
    }

    /// Convenience: wait for the next snapshot and return it.
    pub async fn next(&mut self) -> Result<T, AppError> {
        self.changed().await?;
        Ok(self.current())
    }

    /// A secondary receiver over the same stream, for consumers that want to
    /// `await` updates without owning the subscription.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }
}
