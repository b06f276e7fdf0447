// ── Command API ──
//
// Writes to the appliance are batches of `(code, value)` pairs. A batch
// becomes one `cmd` message with parallel `opt`/`p` arrays, in insertion
// order, so related settings (mode + swing + x-fan) land atomically.

use gree_api::{Request, StatusValue};
use indexmap::IndexMap;

use crate::model::StatusCode;

/// An ordered set of column writes sent as a single command.
///
/// Setting the same code twice keeps its first position and the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBatch {
    entries: IndexMap<String, StatusValue>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style write of a registered column.
    #[must_use]
    pub fn set(mut self, code: StatusCode, value: impl Into<StatusValue>) -> Self {
        self.insert(code.code(), value);
        self
    }

    /// Builder-style write of an arbitrary wire code.
    #[must_use]
    pub fn set_raw(mut self, code: impl Into<String>, value: impl Into<StatusValue>) -> Self {
        self.insert(code, value);
        self
    }

    pub fn insert(&mut self, code: impl Into<String>, value: impl Into<StatusValue>) {
        self.entries.insert(code.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatusValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The `cmd` message for this batch.
    pub fn into_request(self) -> Request {
        let (opt, p) = self.entries.into_iter().unzip();
        Request::Command { opt, p }
    }

    // ── Shorthands ───────────────────────────────────────────────────

    #[must_use]
    pub fn power(self, on: bool) -> Self {
        self.set(StatusCode::Power, i64::from(on))
    }

    #[must_use]
    pub fn mode(self, mode: i64) -> Self {
        self.set(StatusCode::Mode, mode)
    }

    #[must_use]
    pub fn target_temperature(self, celsius: i64) -> Self {
        self.set(StatusCode::TargetTemperature, celsius)
    }

    #[must_use]
    pub fn fan_speed(self, speed: i64) -> Self {
        self.set(StatusCode::FanSpeed, speed)
    }
}

impl From<IndexMap<String, StatusValue>> for CommandBatch {
    fn from(entries: IndexMap<String, StatusValue>) -> Self {
        Self { entries }
    }
}

impl From<IndexMap<&str, StatusValue>> for CommandBatch {
    fn from(map: IndexMap<&str, StatusValue>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<StatusValue>> FromIterator<(K, V)> for CommandBatch {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut batch = Self::new();
        for (code, value) in iter {
            batch.insert(code, value);
        }
        batch
    }
}
