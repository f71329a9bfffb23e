//! Error types for netstate

use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum NetstateError {
    /// IO error
    Io(io::Error),
    /// Invalid desired or current state (dangling base-iface, duplicate name,
    /// malformed type-specific config)
    InvalidConfig(String),
    /// The base-iface graph contains a cycle
    CyclicDependency { cycle: Vec<String> },
    /// A backend call failed mid-changeset; already-applied operations are
    /// left on the system, the remainder was not executed
    ApplyFailure {
        index: usize,
        operation: String,
        reason: String,
        remaining: Vec<String>,
    },
    /// Desired state never matched the queried state within the timeout
    VerificationTimeout { elapsed: Duration, mismatches: Vec<String> },
    /// A backend call failed outside of apply (query, refresh)
    Backend { operation: String, reason: String },
    /// Parse error
    ParseError(String),
}

impl fmt::Display for NetstateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetstateError::Io(e) => write!(f, "IO error: {}", e),
            NetstateError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            NetstateError::CyclicDependency { cycle } => {
                write!(f, "Cyclic base-iface dependency: {}", cycle.join(" -> "))
            }
            NetstateError::ApplyFailure { index, operation, reason, remaining } => {
                write!(
                    f,
                    "Apply failed at operation {} ({}): {}; {} operation(s) not executed",
                    index,
                    operation,
                    reason,
                    remaining.len()
                )
            }
            NetstateError::VerificationTimeout { elapsed, mismatches } => {
                write!(
                    f,
                    "State did not converge within {:.1}s: {}",
                    elapsed.as_secs_f64(),
                    mismatches.join("; ")
                )
            }
            NetstateError::Backend { operation, reason } => {
                write!(f, "Backend call '{}' failed: {}", operation, reason)
            }
            NetstateError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for NetstateError {}

impl From<io::Error> for NetstateError {
    fn from(error: io::Error) -> Self {
        NetstateError::Io(error)
    }
}

impl From<serde_json::Error> for NetstateError {
    fn from(error: serde_json::Error) -> Self {
        NetstateError::ParseError(error.to_string())
    }
}

impl From<toml::de::Error> for NetstateError {
    fn from(error: toml::de::Error) -> Self {
        NetstateError::ParseError(error.to_string())
    }
}

pub type NetstateResult<T> = Result<T, NetstateError>;
