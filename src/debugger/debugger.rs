//! `Debugger`: the top-level L4 object a host constructs — owns every
//! `Session`, the session-independent `UserBreakpointStore`, and the
//! shared `FocusContext`, and keeps breakpoints coherent across
//! sessions (spec §4.4 "Cross-session coherence").

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::breakpoints::candidate::{resolve, Disambiguator, SmallestColumnAtOrAfter};
use crate::breakpoints::{
    SyncCoordinator, UserBreakpointStore, VerifiedBreakpoint, VerifiedBreakpointStore,
};
use crate::debugger::focus::FocusContext;
use crate::entity::Location;
use crate::error::Error;
use crate::session::Session;
use crate::transport::types::{Source as WireSource, SourceBreakpoint};

pub struct Debugger {
    sessions: tokio::sync::RwLock<HashMap<Uuid, Arc<Session>>>,
    breakpoints: UserBreakpointStore,
    verified: VerifiedBreakpointStore,
    focus: FocusContext,
    sync_coordinators: tokio::sync::RwLock<HashMap<(Uuid, String), Arc<SyncCoordinator>>>,
    disambiguator: Box<dyn Disambiguator>,
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Debugger {
    pub fn new() -> Self {
        Self {
            sessions: tokio::sync::RwLock::new(HashMap::new()),
            breakpoints: UserBreakpointStore::new(),
            verified: VerifiedBreakpointStore::new(),
            focus: FocusContext::new(),
            sync_coordinators: tokio::sync::RwLock::new(HashMap::new()),
            disambiguator: Box::new(SmallestColumnAtOrAfter),
        }
    }

    pub fn breakpoints(&self) -> &UserBreakpointStore {
        &self.breakpoints
    }

    pub fn verified_breakpoints(&self) -> &VerifiedBreakpointStore {
        &self.verified
    }

    pub fn focus(&self) -> &FocusContext {
        &self.focus
    }

    pub async fn register_session(&self, session: Session) -> Uuid {
        let id = session.id;
        self.sessions.write().await.insert(id, Arc::new(session));
        self.focus.focus_session(id).await;
        id
    }

    pub async fn session(&self, id: Uuid) -> Result<Arc<Session>, Error> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    pub async fn list_sessions(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }

    pub async fn remove_session(&self, id: Uuid) -> Option<Arc<Session>> {
        let removed = self.sessions.write().await.remove(&id);
        self.sync_coordinators
            .write()
            .await
            .retain(|(session_id, _), _| *session_id != id);
        self.verified.remove_session(id).await;
        removed
    }

    /// Adds a breakpoint to the session-independent store and syncs it
    /// into every live session that currently has a source at
    /// `location.path`.
    pub async fn add_breakpoint(&self, location: Location) -> Result<Uuid, Error> {
        let bp = self.breakpoints.add(location.clone()).await;
        self.sync_all_sessions_for_path(&location.path).await?;
        Ok(bp.id)
    }

    pub async fn remove_breakpoint(&self, id: Uuid, path: &str) -> Result<(), Error> {
        self.breakpoints.remove(id).await;
        self.sync_all_sessions_for_path(path).await
    }

    /// Removes the `UserBreakpoint` at `location` if one exists, else
    /// adds a fresh one there (spec §4.4 `toggle(loc)`), and re-syncs
    /// every live session for that source. Returns `true` if a
    /// breakpoint now exists at `location`.
    pub async fn toggle_breakpoint(&self, location: Location) -> Result<bool, Error> {
        let present = self.breakpoints.toggle(location.clone()).await;
        self.sync_all_sessions_for_path(&location.path).await?;
        Ok(present)
    }

    async fn sync_all_sessions_for_path(&self, path: &str) -> Result<(), Error> {
        let sessions: Vec<(Uuid, Arc<Session>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, s)| (*id, s.clone()))
            .collect();
        for (id, session) in sessions {
            if let Err(e) = self.sync_source(id, &session, path).await {
                warn!(session_id = %id, path, error = %e, "breakpoint re-sync failed for session");
            }
        }
        Ok(())
    }

    async fn coordinator_for(&self, session_id: Uuid, path: &str) -> Arc<SyncCoordinator> {
        let key = (session_id, path.to_string());
        if let Some(existing) = self.sync_coordinators.read().await.get(&key) {
            return existing.clone();
        }
        let mut guard = self.sync_coordinators.write().await;
        guard
            .entry(key)
            .or_insert_with(|| Arc::new(SyncCoordinator::new()))
            .clone()
    }

    /// Re-derives the `setBreakpoints` request for one `(session, path)`
    /// pair from the current `UserBreakpointStore` contents and sends
    /// it, serialized and coalesced against concurrent callers via the
    /// per-`(session, path)` `SyncCoordinator`.
    pub async fn sync_source(
        &self,
        session_id: Uuid,
        session: &Arc<Session>,
        path: &str,
    ) -> Result<(), Error> {
        if !session.state().await.accepts_breakpoint_mutation() {
            return Ok(());
        }
        let coordinator = self.coordinator_for(session_id, path).await;
        let session = session.clone();
        let path = path.to_string();
        let breakpoints = &self.breakpoints;
        let verified_store = &self.verified;
        let disambiguator = self.disambiguator.as_ref();

        coordinator
            .run_coalesced(|| {
                let session = session.clone();
                let path = path.clone();
                async move {
                    let user_breakpoints = breakpoints.for_path(&path).await;
                    let enabled: Vec<_> =
                        user_breakpoints.iter().filter(|bp| bp.enabled).collect();

                    let mut source_breakpoints = Vec::with_capacity(enabled.len());
                    for bp in &enabled {
                        let candidates = session
                            .breakpoint_locations(
                                WireSource {
                                    name: None,
                                    path: Some(path.clone()),
                                    source_reference: None,
                                },
                                bp.location.line,
                                bp.location.column,
                            )
                            .await
                            .unwrap_or_default();
                        let (line, column) =
                            resolve(&bp.location, &candidates, disambiguator);
                        source_breakpoints.push(SourceBreakpoint {
                            line,
                            column,
                            condition: bp.condition.clone(),
                            hit_condition: bp.hit_condition.clone(),
                            log_message: bp.log_message.clone(),
                        });
                    }

                    let wire_breakpoints = session
                        .set_breakpoints(
                            WireSource {
                                name: None,
                                path: Some(path.clone()),
                                source_reference: None,
                            },
                            source_breakpoints,
                        )
                        .await?;

                    let verified: Vec<VerifiedBreakpoint> = enabled
                        .iter()
                        .zip(wire_breakpoints.iter())
                        .map(|(bp, wire)| {
                            VerifiedBreakpoint::from_wire(bp.id, bp.location.clone(), wire)
                        })
                        .collect();
                    verified_store.replace(session_id, &path, verified).await;
                    Ok(())
                }
            })
            .await
    }
}
