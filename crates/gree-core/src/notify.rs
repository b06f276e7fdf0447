// ── Change notifier ──
//
// Optional callback fired once per status-table mutation, i.e. once per
// inbound `dat` or `res` message. No diffing: a message that repeats the
// current values still fires.

use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ChangeNotifier {
    callback: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ChangeNotifier {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    /// Invoke the callback, if any, on the calling task.
    pub fn notify(&self) {
        if let Some(callback) = &self.callback {
            callback();
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("set", &self.is_set())
            .finish()
    }
}
