// ── Session engine ──
//
// `SessionMachine` holds all protocol decisions and performs no I/O;
// `crate::device` drives it with a socket and timers.

mod machine;
mod phase;

pub use machine::{Action, SessionMachine};
pub use phase::SessionPhase;
