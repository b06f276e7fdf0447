// ── Domain model ──
//
// Static knowledge about appliance status columns.

pub mod registry;

pub use registry::StatusCode;
