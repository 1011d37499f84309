//! `FocusContext`: which session/thread/frame the host is currently
//! looking at (spec §4.5). Exposed as `Slot`s so a UI can subscribe
//! to focus changes instead of polling.

use uuid::Uuid;

use crate::debugger::observable::Slot;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Focus {
    pub session_id: Option<Uuid>,
    pub thread_id: Option<i64>,
    /// Invariant: `frame_id.is_some()` implies `thread_id.is_some()`
    /// and the frame belongs to that thread's current stack trace —
    /// enforced by always clearing `frame_id` whenever `thread_id` or
    /// `session_id` changes (spec §4.5 "frame != nil ⇒ frame.stack.thread
    /// == ctx.thread ∧ thread.session == ctx.session").
    pub frame_id: Option<i64>,
}

pub struct FocusContext {
    focus: Slot<Focus>,
}

impl Default for FocusContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusContext {
    pub fn new() -> Self {
        Self {
            focus: Slot::new(Focus::default()),
        }
    }

    pub async fn current(&self) -> Focus {
        self.focus.get().await
    }

    pub async fn focus_session(&self, session_id: Uuid) {
        self.focus
            .set(Focus {
                session_id: Some(session_id),
                thread_id: None,
                frame_id: None,
            })
            .await;
    }

    pub async fn focus_thread(&self, session_id: Uuid, thread_id: i64) {
        self.focus
            .set(Focus {
                session_id: Some(session_id),
                thread_id: Some(thread_id),
                frame_id: None,
            })
            .await;
    }

    /// Focuses a frame, but only if it belongs to the already-focused
    /// session and thread — otherwise returns `InvalidState` rather
    /// than silently focusing a frame from an unrelated thread.
    pub async fn focus_frame(
        &self,
        session_id: Uuid,
        thread_id: i64,
        frame_id: i64,
    ) -> Result<(), Error> {
        let current = self.focus.get().await;
        if current.session_id != Some(session_id) || current.thread_id != Some(thread_id) {
            return Err(Error::InvalidState {
                expected: "frame's session and thread already focused".to_string(),
                actual: format!("{current:?}"),
            });
        }
        self.focus
            .set(Focus {
                session_id: Some(session_id),
                thread_id: Some(thread_id),
                frame_id: Some(frame_id),
            })
            .await;
        Ok(())
    }

    pub async fn clear(&self) {
        self.focus.set(Focus::default()).await;
    }

    /// True iff `session_id` is the currently focused session, or no
    /// session is focused yet (spec §4.5 `isInFocusedContext`).
    pub async fn is_in_focused_context(&self, session_id: Uuid) -> bool {
        let current = self.focus.get().await;
        match current.session_id {
            Some(focused) => focused == session_id,
            None => true,
        }
    }

    pub async fn each<F>(&self, callback: F) -> crate::debugger::observable::Subscription
    where
        F: Fn(&Focus) + Send + Sync + 'static,
    {
        self.focus.each(callback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn focusing_a_thread_clears_any_prior_frame() {
        let ctx = FocusContext::new();
        let session = Uuid::new_v4();
        ctx.focus_thread(session, 1).await;
        ctx.focus_frame(session, 1, 7).await.unwrap();
        assert_eq!(ctx.current().await.frame_id, Some(7));

        ctx.focus_thread(session, 2).await;
        assert_eq!(ctx.current().await.frame_id, None);
    }

    #[tokio::test]
    async fn focus_frame_rejects_mismatched_thread() {
        let ctx = FocusContext::new();
        let session = Uuid::new_v4();
        ctx.focus_thread(session, 1).await;
        let err = ctx.focus_frame(session, 2, 7).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test]
    async fn is_in_focused_context_checks_the_focused_session() {
        let ctx = FocusContext::new();
        let session = Uuid::new_v4();
        let other = Uuid::new_v4();
        ctx.focus_session(session).await;
        assert!(ctx.is_in_focused_context(session).await);
        assert!(!ctx.is_in_focused_context(other).await);
    }

    #[tokio::test]
    async fn no_session_focused_is_in_every_context() {
        let ctx = FocusContext::new();
        assert!(ctx.is_in_focused_context(Uuid::new_v4()).await);
    }
}
