// ── Reactive status stream ──
//
// Subscription type for consuming status-table changes.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::StatusSnapshot;

/// A subscription to the status table.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting to a
/// `Stream`.
pub struct StatusStream {
    current: StatusSnapshot,
    receiver: watch::Receiver<StatusSnapshot>,
}

impl StatusStream {
    pub(crate) fn new(receiver: watch::Receiver<StatusSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &StatusSnapshot {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> StatusSnapshot {
        self.receiver.borrow().clone()
    }

    /// Whether a mutation happened that `changed()` has not yet returned.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next mutation, returning the new snapshot.
    /// Returns `None` once the owning table has been dropped.
    pub async fn changed(&mut self) -> Option<StatusSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first, then one item per
    /// observed mutation (intermediate values may be coalesced).
    pub fn into_stream(self) -> StatusWatchStream {
        StatusWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StatusWatchStream {
    inner: WatchStream<StatusSnapshot>,
}

impl Stream for StatusWatchStream {
    type Item = StatusSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use gree_api::StatusValue;

    use crate::store::StatusTable;

    #[tokio::test]
    async fn stream_yields_current_then_updates() {
        let table = StatusTable::new();
        let mut stream = table.subscribe().into_stream();

        let first = stream.next().await.unwrap();
        assert!(first.is_empty());

        let value = StatusValue::Int(1);
        table.apply([("Pow", &value)]);
        let second = stream.next().await.unwrap();
        assert_eq!(second.get("Pow"), Some(&value));
    }

    #[tokio::test]
    async fn latest_tracks_table_without_consuming() {
        let table = StatusTable::new();
        let stream = table.subscribe();

        let value = StatusValue::from("V1.2");
        table.apply([("hid", &value)]);
        assert!(stream.current().is_empty());
        assert_eq!(stream.latest().get("hid"), Some(&value));
        assert!(stream.has_changed());
    }
}
