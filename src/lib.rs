pub mod breakpoints;
pub mod config;
pub mod debugger;
pub mod entity;
pub mod error;
pub mod session;
pub mod transport;

pub use config::RuntimeConfig;
pub use debugger::Debugger;
pub use error::Error;
pub use session::Session;

pub type Result<T> = std::result::Result<T, Error>;
