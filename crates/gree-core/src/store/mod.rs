// ── Reactive status store ──
//
// The appliance status table with push-based change notification.

mod status_table;

pub use status_table::{AckedValues, StatusSnapshot, StatusTable};
