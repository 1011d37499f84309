//! `Frame`: a wire `StackFrame` plus its lazily-fetched scopes.

use crate::entity::location::Location;
use crate::entity::scope::Scope;
use crate::transport::types::StackFrame as WireStackFrame;

#[derive(Debug, Clone)]
pub struct Frame {
    pub id: i64,
    pub name: String,
    pub location: Option<Location>,
    scopes: Option<Vec<Scope>>,
}

impl Frame {
    pub fn from_wire(wire: WireStackFrame) -> Self {
        let location = wire
            .source
            .as_ref()
            .and_then(|s| s.path.clone())
            .map(|path| Location::new(path, wire.line, Some(wire.column)));
        Self {
            id: wire.id,
            name: wire.name,
            location,
            scopes: None,
        }
    }

    pub fn scopes(&self) -> Option<&[Scope]> {
        self.scopes.as_deref()
    }

    pub fn set_scopes(&mut self, scopes: Vec<Scope>) {
        self.scopes = Some(scopes);
    }
}
