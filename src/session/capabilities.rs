//! Adapter capabilities learned at handshake time, cached for the
//! life of the session (spec §4.2 "Handshake").

use crate::transport::types::{Capabilities, ExceptionBreakpointsFilter};

#[derive(Debug, Clone, Default)]
pub struct SessionCapabilities {
    inner: Capabilities,
}

impl SessionCapabilities {
    pub fn new(inner: Capabilities) -> Self {
        Self { inner }
    }

    pub fn supports_configuration_done(&self) -> bool {
        self.inner.supports_configuration_done_request.unwrap_or(false)
    }

    pub fn supports_conditional_breakpoints(&self) -> bool {
        self.inner.supports_conditional_breakpoints.unwrap_or(false)
    }

    pub fn supports_hit_conditional_breakpoints(&self) -> bool {
        self.inner
            .supports_hit_conditional_breakpoints
            .unwrap_or(false)
    }

    pub fn supports_breakpoint_locations(&self) -> bool {
        self.inner
            .supports_breakpoint_locations_request
            .unwrap_or(false)
    }

    pub fn exception_breakpoint_filters(&self) -> &[ExceptionBreakpointsFilter] {
        self.inner
            .exception_breakpoint_filters
            .as_deref()
            .unwrap_or(&[])
    }

    /// Filter IDs marked `default: true` by the adapter — what the
    /// runtime enables on `setExceptionBreakpoints` if the host hasn't
    /// expressed a preference (SPEC_FULL §10).
    pub fn default_exception_filters(&self) -> Vec<String> {
        self.exception_breakpoint_filters()
            .iter()
            .filter(|f| f.default.unwrap_or(false))
            .map(|f| f.filter.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_exception_filters_picks_only_marked_defaults() {
        let caps = SessionCapabilities::new(Capabilities {
            exception_breakpoint_filters: Some(vec![
                ExceptionBreakpointsFilter {
                    filter: "uncaught".to_string(),
                    label: "Uncaught Exceptions".to_string(),
                    default: Some(true),
                },
                ExceptionBreakpointsFilter {
                    filter: "caught".to_string(),
                    label: "Caught Exceptions".to_string(),
                    default: Some(false),
                },
            ]),
            ..Default::default()
        });
        assert_eq!(caps.default_exception_filters(), vec!["uncaught"]);
    }

    #[test]
    fn missing_capabilities_default_to_unsupported() {
        let caps = SessionCapabilities::default();
        assert!(!caps.supports_conditional_breakpoints());
        assert!(caps.exception_breakpoint_filters().is_empty());
    }
}
