// gree-core: Session engine between gree-api and consumers (CLI).

pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod notify;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::CommandBatch;
pub use config::{DEFAULT_POLL_INTERVAL, DEFAULT_PORT, DEFAULT_RETRY_INTERVAL, DeviceConfig};
pub use device::Device;
pub use error::CoreError;
pub use model::StatusCode;
pub use notify::ChangeNotifier;
pub use session::{Action, SessionMachine, SessionPhase};
pub use store::{AckedValues, StatusSnapshot, StatusTable};
pub use stream::{StatusStream, StatusWatchStream};

pub use gree_api::StatusValue;
