//! `Thread`: a wire `Thread` plus its lazily-fetched, stop-scoped
//! stack trace (spec §4.3 "Entity graph").
//!
//! Memoization discipline follows the wrap-with-cached-children
//! pattern: the frames vector is populated once per stop and
//! invalidated wholesale on the next `continued`/`stopped` event
//! rather than patched incrementally.

use crate::entity::frame::Frame;
use crate::transport::types::Thread as WireThread;

#[derive(Debug, Clone)]
pub struct Thread {
    pub id: i64,
    pub name: String,
    frames: Option<Vec<Frame>>,
}

impl Thread {
    pub fn from_wire(wire: WireThread) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            frames: None,
        }
    }

    pub fn frames(&self) -> Option<&[Frame]> {
        self.frames.as_deref()
    }

    pub fn set_frames(&mut self, frames: Vec<Frame>) {
        self.frames = Some(frames);
    }

    /// Drops the cached stack trace; called whenever this thread
    /// resumes so a stale frame list is never served.
    pub fn invalidate(&mut self) {
        self.frames = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_clears_cached_frames() {
        let mut thread = Thread::from_wire(WireThread {
            id: 1,
            name: "main".to_string(),
        });
        thread.set_frames(Vec::new());
        assert!(thread.frames().is_some());
        thread.invalidate();
        assert!(thread.frames().is_none());
    }
}
