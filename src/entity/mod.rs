//! L2: the entity graph — sources, threads, frames, scopes, and
//! variables — layered over the raw wire types with lazy hydration
//! and stop-scoped memoization.

pub mod frame;
pub mod location;
pub mod scope;
pub mod source;
pub mod thread;
pub mod variable;

pub use frame::Frame;
pub use location::Location;
pub use scope::{Scope, ScopeKind};
pub use source::{Source, SourceKey};
pub use thread::Thread;
pub use variable::{ExpansionGuard, Variable};
