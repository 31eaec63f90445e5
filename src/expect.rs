//! Expectations and verdicts.

use crate::error::ConfigError;
use crate::failure::Failure;
use crate::Value;
use serde::Serialize;
use std::error::Error;
use std::fmt;

/// Predicate over a raised failure.
pub type FailurePredicate = Box<dyn Fn(&Failure) -> bool + Send + Sync>;

/// Box a predicate for use in a failure batch.
pub fn predicate<P>(p: P) -> FailurePredicate
where
    P: Fn(&Failure) -> bool + Send + Sync + 'static,
{
    Box::new(p)
}

/// What a trial expects: a value, or a failure matching a predicate.
///
/// Exactly one of the two must be set when the trial runs. The builder does
/// not prevent setting both (or neither); the tester rejects such
/// expectations as configuration errors before invoking anything.
#[derive(Default)]
pub struct Expectation {
    value: Option<Value>,
    predicate: Option<FailurePredicate>,
    description: Option<String>,
}

impl Expectation {
    /// Expect a normal return equal to `value`.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::default().with_value(value)
    }

    /// Expect a failure for which `predicate` holds.
    pub fn failure<P>(predicate: P) -> Self
    where
        P: Fn(&Failure) -> bool + Send + Sync + 'static,
    {
        Self::default().with_predicate(predicate)
    }

    /// Expect a failure carrying exactly `message`.
    pub fn failure_with_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let description = format!("failure with message {:?}", message);
        Self::failure(move |f| f.message() == message).described(description)
    }

    /// Expect a failure of the given kind label.
    pub fn failure_of_kind(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        let description = format!("failure of kind {}", kind);
        Self::failure(move |f| f.kind() == kind).described(description)
    }

    /// Expect a failure whose original typed error is an `E`.
    pub fn failure_of<E: Error + 'static>() -> Self {
        let description = format!("failure of type {}", std::any::type_name::<E>());
        Self::failure(|f| f.is::<E>()).described(description)
    }

    /// Expect a failure for which an already boxed predicate holds.
    pub fn from_predicate(predicate: FailurePredicate) -> Self {
        Self {
            predicate: Some(predicate),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Failure) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Human-readable description of the failure predicate, used in traces.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn expects_failure(&self) -> bool {
        self.predicate.is_some()
    }

    pub(crate) fn resolve(&self) -> Result<Expected<'_>, ConfigError> {
        match (&self.value, &self.predicate) {
            (Some(value), None) => Ok(Expected::Value(value)),
            (None, Some(predicate)) => Ok(Expected::Failure {
                predicate,
                description: self
                    .description
                    .as_deref()
                    .unwrap_or("a failure matching the predicate"),
            }),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousExpectation),
            (None, None) => Err(ConfigError::MissingExpectation),
        }
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("value", &self.value)
            .field("predicate", &self.predicate.is_some())
            .field("description", &self.description)
            .finish()
    }
}

/// A validated expectation.
pub(crate) enum Expected<'a> {
    Value(&'a Value),
    Failure {
        predicate: &'a FailurePredicate,
        description: &'a str,
    },
}

impl Expected<'_> {
    pub(crate) fn is_failure(&self) -> bool {
        matches!(self, Expected::Failure { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Returned a value other than the expected one.
    ValueDiffers,
    /// Raised, but the predicate rejected the failure.
    PredicateRejected,
    /// Returned normally where a failure was expected.
    UnexpectedSuccess,
}

/// Rendered diagnostic of a failed trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MismatchKind::ValueDiffers => write!(f, "{} != {}", self.expected, self.actual),
            MismatchKind::PredicateRejected => write!(
                f,
                "thrown condition did not satisfy predicate (expected {}, got {})",
                self.expected, self.actual
            ),
            MismatchKind::UnexpectedSuccess => write!(
                f,
                "expected a failure but invocation succeeded (expected {}, got {})",
                self.expected, self.actual
            ),
        }
    }
}

/// Result of comparing one outcome to one expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Mismatch),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(m) => Some(m),
        }
    }
}
