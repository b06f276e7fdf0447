// gree-api: wire protocol for Gree-family climate appliances (cipher, frames, UDP)

pub mod cipher;
pub mod error;
pub mod frame;
pub mod message;
pub mod transport;

pub use cipher::{AesEcbCipher, GENERIC_KEY, PackCipher, SessionKey};
pub use error::Error;
pub use frame::{DEFAULT_CLIENT_ID, Frame, FrameCodec};
pub use message::{Announcement, BindAck, CommandAck, Request, Response, StatusData, StatusValue};
pub use transport::UdpTransport;
