//! `Scope`: a named variable container within a frame, plus its
//! lazily-fetched variables.

use crate::entity::variable::Variable;
use crate::transport::types::Scope as WireScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Arguments,
    Locals,
    Registers,
    Globals,
    Closure,
    ReturnValue,
    Exception,
    Generic,
}

impl ScopeKind {
    fn from_name(name: &str) -> Self {
        match name {
            "Arguments" => ScopeKind::Arguments,
            "Locals" => ScopeKind::Locals,
            "Registers" => ScopeKind::Registers,
            "Globals" => ScopeKind::Globals,
            "Closure" => ScopeKind::Closure,
            "Return Value" | "Return Values" => ScopeKind::ReturnValue,
            "Exception" => ScopeKind::Exception,
            _ => ScopeKind::Generic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    pub variables_reference: i64,
    pub expensive: bool,
    variables: Option<Vec<Variable>>,
}

impl Scope {
    pub fn from_wire(wire: WireScope) -> Self {
        Self {
            kind: ScopeKind::from_name(&wire.name),
            name: wire.name,
            variables_reference: wire.variables_reference,
            expensive: wire.expensive,
            variables: None,
        }
    }

    pub fn variables(&self) -> Option<&[Variable]> {
        self.variables.as_deref()
    }

    pub fn set_variables(&mut self, variables: Vec<Variable>) {
        self.variables = Some(variables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_standard_scope_names() {
        let wire = WireScope {
            name: "Locals".to_string(),
            variables_reference: 3,
            expensive: false,
            presentation_hint: None,
        };
        assert_eq!(Scope::from_wire(wire).kind, ScopeKind::Locals);
    }

    #[test]
    fn unrecognized_name_is_generic() {
        let wire = WireScope {
            name: "Upvalues".to_string(),
            variables_reference: 3,
            expensive: false,
            presentation_hint: None,
        };
        assert_eq!(Scope::from_wire(wire).kind, ScopeKind::Generic);
    }
}
