//! L1: the adapter handshake and the typed operation surface built on
//! top of the L0 transport.

pub mod capabilities;
pub mod session;
pub mod state;

pub use capabilities::SessionCapabilities;
pub use session::Session;
pub use state::{SessionState, StopReason};
