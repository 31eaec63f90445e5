//! Error types for the harness.
//!
//! Three classes are kept apart: configuration errors (bad trial setup,
//! reported before anything is invoked), harness faults (the call could not
//! be dispatched, or a timed call raised) and target outcomes that escape
//! matching (an unexpected failure or a failed verdict).

use crate::expect::Mismatch;
use crate::failure::Failure;
use crate::handle::DispatchError;
use thiserror::Error;

/// Malformed trial setup. Always raised before any invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("trial has neither an expected value nor a failure predicate")]
    MissingExpectation,

    #[error("trial has both an expected value and a failure predicate")]
    AmbiguousExpectation,

    #[error("batch mixes value and failure expectations")]
    MixedBatch,

    #[error("{args} argument sets but {expectations} expectations")]
    LengthMismatch { args: usize, expectations: usize },

    #[error("{target} takes {expected} argument(s), got {got}")]
    ArityMismatch {
        target: String,
        expected: usize,
        got: usize,
    },

    #[error("repeat count must be positive")]
    NonPositiveRepeat,

    #[error("no target named {owner}.{name} is registered")]
    UnresolvedTarget { owner: String, name: String },

    #[error("invalid target path {0:?}, expected Owner.name")]
    InvalidTargetPath(String),
}

/// The harness itself failed; never a verdict about the target.
#[derive(Debug, Error)]
pub enum HarnessFault {
    #[error("could not dispatch {call}: {error}")]
    Dispatch {
        call: String,
        #[source]
        error: DispatchError,
    },

    #[error("{call} raised while being timed: {failure}")]
    TargetRaised {
        call: String,
        #[source]
        failure: Failure,
    },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("harness fault: {0}")]
    Harness(#[from] HarnessFault),

    /// The target raised during a trial that expected a value.
    #[error("{call} raised unexpectedly: {failure}")]
    Unexpected {
        call: String,
        #[source]
        failure: Failure,
    },

    #[error("trial {trial} failed: {mismatch}")]
    Verdict { trial: usize, mismatch: Mismatch },
}

impl ProbeError {
    pub fn is_config(&self) -> bool {
        matches!(self, ProbeError::Config(_))
    }

    pub fn is_harness_fault(&self) -> bool {
        matches!(self, ProbeError::Harness(_))
    }

    /// The target's own failure, when this error carries one.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ProbeError::Unexpected { failure, .. } => Some(failure),
            ProbeError::Harness(HarnessFault::TargetRaised { failure, .. }) => Some(failure),
            _ => None,
        }
    }
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;
