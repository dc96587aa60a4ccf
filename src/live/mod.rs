//! Live chat push connection.

pub mod model;
pub mod reconnect;
pub mod socket;

pub use model::{LiveEvent, LiveEventKind};
pub use reconnect::{ConnectionEvent, ConnectionState, Directive, Reconnector};
pub use socket::LiveSocket;
