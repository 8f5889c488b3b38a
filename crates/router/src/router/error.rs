use thiserror::Error;

/// A route that cannot be registered.
///
/// Registration errors are raised while the router is built and are never recovered from at
/// request time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route '{pattern}' conflicts with the existing route '{existing}'")]
    Conflict { pattern: String, existing: String },

    #[error("route '{pattern}': wildcard '*{name}' must be the last segment")]
    NonTerminalWildcard { pattern: String, name: String },

    #[error("route '{pattern}': parameter '{name}' is captured more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("route '{pattern}' is invalid: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}

impl RouteError {
    pub(crate) fn conflict<S: ToString, E: ToString>(pattern: S, existing: E) -> Self {
        Self::Conflict { pattern: pattern.to_string(), existing: existing.to_string() }
    }

    pub(crate) fn invalid_pattern<S: ToString>(pattern: S, reason: &'static str) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason }
    }
}
