//! `UserBreakpoint`: the user's intent, independent of any adapter
//! session — persists across session restarts (spec §4.4).

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entity::Location;

#[derive(Debug, Clone)]
pub struct UserBreakpoint {
    pub id: Uuid,
    pub location: Location,
    pub enabled: bool,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
    pub log_message: Option<String>,
}

impl UserBreakpoint {
    pub fn new(location: Location) -> Self {
        Self {
            id: Uuid::new_v4(),
            location,
            enabled: true,
            condition: None,
            hit_condition: None,
            log_message: None,
        }
    }
}

/// All user breakpoints, keyed by id, independent of any session.
/// `Debugger` re-derives per-source `SourceBreakpoint` requests from
/// this store every time a session needs (re-)syncing.
#[derive(Default)]
pub struct UserBreakpointStore {
    breakpoints: RwLock<HashMap<Uuid, UserBreakpoint>>,
}

impl UserBreakpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find-or-create by `Location`: a second `add` at the same
    /// location returns the existing breakpoint rather than inserting
    /// a duplicate (spec §8 round-trip: `add(L,a); add(L,a) == add(L,a)`).
    pub async fn add(&self, location: Location) -> UserBreakpoint {
        let mut guard = self.breakpoints.write().await;
        if let Some(existing) = guard.values().find(|bp| bp.location == location) {
            return existing.clone();
        }
        let bp = UserBreakpoint::new(location);
        guard.insert(bp.id, bp.clone());
        bp
    }

    pub async fn remove(&self, id: Uuid) -> Option<UserBreakpoint> {
        self.breakpoints.write().await.remove(&id)
    }

    /// Removes the `Location` if a `UserBreakpoint` matches it, else
    /// adds a fresh enabled one there (spec §4.4 `toggle(loc)`) —
    /// presence/absence of the whole breakpoint, distinct from
    /// `set_enabled` flipping an existing one's `enabled` flag.
    /// Returns `true` if a breakpoint now exists at `location`, `false`
    /// if it was just removed.
    pub async fn toggle(&self, location: Location) -> bool {
        let mut guard = self.breakpoints.write().await;
        let existing_id = guard
            .values()
            .find(|bp| bp.location == location)
            .map(|bp| bp.id);
        match existing_id {
            Some(id) => {
                guard.remove(&id);
                false
            }
            None => {
                let bp = UserBreakpoint::new(location);
                guard.insert(bp.id, bp);
                true
            }
        }
    }

    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> Option<()> {
        let mut guard = self.breakpoints.write().await;
        let bp = guard.get_mut(&id)?;
        bp.enabled = enabled;
        Some(())
    }

    pub async fn set_condition(&self, id: Uuid, condition: Option<String>) -> Option<()> {
        let mut guard = self.breakpoints.write().await;
        let bp = guard.get_mut(&id)?;
        bp.condition = condition;
        Some(())
    }

    pub async fn clear(&self) {
        self.breakpoints.write().await.clear();
    }

    pub async fn all(&self) -> Vec<UserBreakpoint> {
        self.breakpoints.read().await.values().cloned().collect()
    }

    pub async fn for_path(&self, path: &str) -> Vec<UserBreakpoint> {
        self.breakpoints
            .read()
            .await
            .values()
            .filter(|bp| bp.location.path == path)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn toggle_adds_then_removes_at_the_same_location() {
        let store = UserBreakpointStore::new();
        let location = Location::new("/a.rs", 1, None);
        assert!(store.toggle(location.clone()).await);
        assert_eq!(store.all().await.len(), 1);
        assert!(!store.toggle(location).await);
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn add_is_idempotent_by_location() {
        let store = UserBreakpointStore::new();
        let location = Location::new("/a.rs", 1, None);
        let first = store.add(location.clone()).await;
        let second = store.add(location).await;
        assert_eq!(first.id, second.id);
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn for_path_filters_by_location_path() {
        let store = UserBreakpointStore::new();
        store.add(Location::new("/a.rs", 1, None)).await;
        store.add(Location::new("/b.rs", 1, None)).await;
        let for_a = store.for_path("/a.rs").await;
        assert_eq!(for_a.len(), 1);
    }

    #[tokio::test]
    async fn remove_drops_the_breakpoint() {
        let store = UserBreakpointStore::new();
        let bp = store.add(Location::new("/a.rs", 1, None)).await;
        assert!(store.remove(bp.id).await.is_some());
        assert!(store.all().await.is_empty());
    }
}
