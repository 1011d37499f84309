//! L4: the host-facing `Debugger` — session map, focus context, and
//! cross-session breakpoint coherence.

pub mod debugger;
pub mod focus;
pub mod observable;

pub use debugger::Debugger;
pub use focus::{Focus, FocusContext};
pub use observable::{Slot, Subscription};
