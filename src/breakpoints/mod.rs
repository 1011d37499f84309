//! L3: the breakpoint engine — user intent, per-session verification,
//! candidate disambiguation, and coalesced re-sync.

pub mod candidate;
pub mod sync;
pub mod user;
pub mod verified;

pub use candidate::{Disambiguator, SmallestColumnAtOrAfter};
pub use sync::SyncCoordinator;
pub use user::{UserBreakpoint, UserBreakpointStore};
pub use verified::{VerifiedBreakpoint, VerifiedBreakpointStore};
