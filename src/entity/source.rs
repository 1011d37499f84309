//! `Source`: a debuggable source file, identified either by path or
//! by an adapter-assigned `sourceReference` (spec §3 "Source identity").

use std::collections::HashSet;

use crate::transport::types::Source as WireSource;

/// Identity key for a `Source`. A `sourceReference > 0` is a distinct
/// identity from any path — it names adapter-synthesized content
/// (e.g. decompiled or disassembled text) that has no on-disk file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Path(String),
    Reference(i64),
}

impl SourceKey {
    pub fn from_wire(source: &WireSource) -> Option<Self> {
        if let Some(reference) = source.source_reference {
            if reference > 0 {
                return Some(SourceKey::Reference(reference));
            }
        }
        source.path.clone().map(SourceKey::Path)
    }
}

#[derive(Debug, Clone)]
pub struct Source {
    pub key: SourceKey,
    pub name: Option<String>,
    pub path: Option<String>,
    pub source_reference: Option<i64>,
    /// IDs of verified breakpoints the adapter currently reports for
    /// this source, used to detect breakpoints the adapter silently
    /// dropped across a `setBreakpoints` re-sync.
    verified_breakpoint_ids: HashSet<i64>,
}

impl Source {
    pub fn from_wire(source: WireSource) -> Option<Self> {
        let key = SourceKey::from_wire(&source)?;
        Some(Self {
            key,
            name: source.name,
            path: source.path,
            source_reference: source.source_reference,
            verified_breakpoint_ids: HashSet::new(),
        })
    }

    pub fn to_wire(&self) -> WireSource {
        WireSource {
            name: self.name.clone(),
            path: self.path.clone(),
            source_reference: self.source_reference,
        }
    }

    pub fn record_verified_ids(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.verified_breakpoint_ids = ids.into_iter().collect();
    }

    pub fn is_verified(&self, id: i64) -> bool {
        self.verified_breakpoint_ids.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_reference_takes_priority_over_path() {
        let wire = WireSource {
            name: Some("decompiled".to_string()),
            path: Some("/tmp/whatever".to_string()),
            source_reference: Some(7),
        };
        assert_eq!(SourceKey::from_wire(&wire), Some(SourceKey::Reference(7)));
    }

    #[test]
    fn zero_source_reference_falls_back_to_path() {
        let wire = WireSource {
            name: None,
            path: Some("/src/a.rs".to_string()),
            source_reference: Some(0),
        };
        assert_eq!(
            SourceKey::from_wire(&wire),
            Some(SourceKey::Path("/src/a.rs".to_string()))
        );
    }

    #[test]
    fn neither_path_nor_reference_has_no_identity() {
        let wire = WireSource {
            name: Some("anonymous".to_string()),
            path: None,
            source_reference: None,
        };
        assert_eq!(SourceKey::from_wire(&wire), None);
    }
}
