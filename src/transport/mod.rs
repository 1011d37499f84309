//! L0: wire types, framing, adapter discovery, and the correlating
//! `Client` built on top of them.

pub mod client;
pub mod framing;
pub mod spec;
pub mod types;

pub use client::Client;
pub use spec::AdapterSpec;
