// ── Status table ──
//
// Last known value of every column the appliance has reported. Keys are
// added or overwritten, never removed. The session task is the only
// writer; readers get immutable snapshots through a `watch` channel, so
// a reader never observes a half-applied message.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gree_api::StatusValue;
use tokio::sync::{broadcast, watch};

use crate::model::StatusCode;
use crate::stream::StatusStream;

/// Immutable view of the status table at one point in time.
pub type StatusSnapshot = Arc<BTreeMap<String, StatusValue>>;

/// The pairs one command acknowledgement wrote, as the appliance sent them.
pub type AckedValues = Arc<BTreeMap<String, StatusValue>>;

const ACK_CAPACITY: usize = 16;

pub struct StatusTable {
    snapshot: watch::Sender<StatusSnapshot>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
    acks: broadcast::Sender<AckedValues>,
}

impl StatusTable {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(BTreeMap::new()));
        let (last_update, _) = watch::channel(None);
        let (acks, _) = broadcast::channel(ACK_CAPACITY);
        Self {
            snapshot,
            last_update,
            acks,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn get(&self, code: &str) -> Option<StatusValue> {
        self.snapshot.borrow().get(code).cloned()
    }

    pub fn get_known(&self, code: StatusCode) -> Option<StatusValue> {
        self.get(code.code())
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    pub fn subscribe(&self) -> StatusStream {
        StatusStream::new(self.snapshot.subscribe())
    }

    /// Receive every command acknowledgement applied after this call.
    pub fn subscribe_acks(&self) -> broadcast::Receiver<AckedValues> {
        self.acks.subscribe()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    /// How long ago the table was last written, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_update().map(|t| Utc::now() - t)
    }

    // ── Writes (session task only) ───────────────────────────────────

    /// Apply the pairs of one inbound message as a single mutation.
    ///
    /// Subscribers are woken exactly once per call, even when `pairs` is
    /// empty. Returns the number of pairs written.
    pub(crate) fn apply<'a, I>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a StatusValue)>,
    {
        let mut written = 0;
        self.snapshot.send_modify(|snap| {
            let table = Arc::make_mut(snap);
            for (code, value) in pairs {
                table.insert(code.to_owned(), value.clone());
                written += 1;
            }
        });
        self.last_update.send_replace(Some(Utc::now()));
        written
    }

    /// Apply a command acknowledgement, then publish its pairs to ack
    /// subscribers. The table is already updated when they wake.
    pub(crate) fn apply_ack<'a, I>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a StatusValue)>,
    {
        let acked: BTreeMap<String, StatusValue> = pairs
            .into_iter()
            .map(|(code, value)| (code.to_owned(), value.clone()))
            .collect();
        let written = self.apply(acked.iter().map(|(c, v)| (c.as_str(), v)));
        // No subscribers is the common case.
        let _ = self.acks.send(Arc::new(acked));
        written
    }
}

impl Default for StatusTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusTable")
            .field("entries", &*self.snapshot.borrow())
            .field("last_update", &self.last_update())
            .finish()
    }
}
