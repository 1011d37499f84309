//! `VerifiedBreakpoint`: a per-session, per-source record of what the
//! adapter actually accepted for a `UserBreakpoint` (spec §4.4
//! "Adjustment").

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entity::Location;
use crate::transport::types::Breakpoint as WireBreakpoint;

#[derive(Debug, Clone)]
pub struct VerifiedBreakpoint {
    pub user_breakpoint_id: Uuid,
    pub adapter_id: Option<i64>,
    pub verified: bool,
    pub message: Option<String>,
    /// The location sent to the adapter in `setBreakpoints`.
    pub requested_location: Location,
    /// The location the adapter actually bound to, when it differs
    /// from `requested_location` (e.g. the adapter moved the
    /// breakpoint to the next executable line).
    pub actual_location: Option<Location>,
}

impl VerifiedBreakpoint {
    pub fn from_wire(
        user_breakpoint_id: Uuid,
        requested_location: Location,
        wire: &WireBreakpoint,
    ) -> Self {
        let actual_location = match (wire.line, &wire.source) {
            (Some(line), Some(source)) => source
                .path
                .clone()
                .map(|path| Location::new(path, line, wire.column)),
            (Some(line), None) => Some(Location::new(
                requested_location.path.clone(),
                line,
                wire.column,
            )),
            _ => None,
        };
        Self {
            user_breakpoint_id,
            adapter_id: wire.id,
            verified: wire.verified,
            message: wire.message.clone(),
            requested_location,
            actual_location,
        }
    }

    /// A lookup by location should match either the requested or the
    /// adapter-adjusted location (spec §9 Open Question resolution:
    /// store both rather than assuming exclusivity).
    pub fn matches_location(&self, location: &Location) -> bool {
        &self.requested_location == location
            || self.actual_location.as_ref() == Some(location)
    }
}

/// The adapter's current verified set for every `(Session, Source)`
/// pair, replaced atomically on each `setBreakpoints` re-sync (spec
/// §4.4 "Per-source sync": "replacing any previous set atomically").
#[derive(Default)]
pub struct VerifiedBreakpointStore {
    by_source: RwLock<HashMap<(Uuid, String), Vec<VerifiedBreakpoint>>>,
}

impl VerifiedBreakpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, session_id: Uuid, path: &str, verified: Vec<VerifiedBreakpoint>) {
        self.by_source
            .write()
            .await
            .insert((session_id, path.to_string()), verified);
    }

    pub async fn for_source(&self, session_id: Uuid, path: &str) -> Vec<VerifiedBreakpoint> {
        self.by_source
            .read()
            .await
            .get(&(session_id, path.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn remove_session(&self, session_id: Uuid) {
        self.by_source
            .write()
            .await
            .retain(|(id, _), _| *id != session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::types::Source as WireSource;

    #[test]
    fn adjusted_line_becomes_actual_location() {
        let requested = Location::new("/a.rs", 10, None);
        let wire = WireBreakpoint {
            id: Some(1),
            verified: true,
            message: None,
            source: Some(WireSource {
                name: None,
                path: Some("/a.rs".to_string()),
                source_reference: None,
            }),
            line: Some(12),
            column: None,
        };
        let verified = VerifiedBreakpoint::from_wire(Uuid::new_v4(), requested.clone(), &wire);
        assert_eq!(verified.actual_location, Some(Location::new("/a.rs", 12, None)));
        assert!(verified.matches_location(&requested));
        assert!(verified.matches_location(&Location::new("/a.rs", 12, None)));
    }

    #[test]
    fn unverified_breakpoint_has_no_actual_location_without_line() {
        let requested = Location::new("/a.rs", 10, None);
        let wire = WireBreakpoint {
            id: None,
            verified: false,
            message: Some("no code on this line".to_string()),
            source: None,
            line: None,
            column: None,
        };
        let verified = VerifiedBreakpoint::from_wire(Uuid::new_v4(), requested, &wire);
        assert!(!verified.verified);
        assert!(verified.actual_location.is_none());
    }

    #[tokio::test]
    async fn replace_is_atomic_and_scoped_per_session_and_path() {
        let store = VerifiedBreakpointStore::new();
        let session = Uuid::new_v4();
        let wire = WireBreakpoint {
            id: Some(1),
            verified: true,
            message: None,
            source: None,
            line: Some(10),
            column: None,
        };
        let first = VerifiedBreakpoint::from_wire(Uuid::new_v4(), Location::new("/a.rs", 10, None), &wire);
        store.replace(session, "/a.rs", vec![first]).await;
        assert_eq!(store.for_source(session, "/a.rs").await.len(), 1);
        assert!(store.for_source(session, "/b.rs").await.is_empty());

        store.replace(session, "/a.rs", Vec::new()).await;
        assert!(store.for_source(session, "/a.rs").await.is_empty());
    }
}
