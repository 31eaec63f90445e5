//! Classification of invocation attempts.

use crate::error::{HarnessFault, ProbeError};
use crate::failure::Failure;
use crate::handle::{Callable, InvokeError};
use crate::Value;
use std::panic::{self, AssertUnwindSafe};

/// What the target did on one invocation.
#[derive(Debug)]
pub enum Outcome {
    /// Returned normally. `Value::Null` for unit-returning targets.
    Success(Value),
    /// Raised. Always the target's own failure.
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Success(v) => Some(v),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(f) => Some(f),
        }
    }
}

/// Invoke `handle` once and classify what happened.
///
/// A failure returned by the target and a panic unwinding out of it are both
/// target failures and come back as `Ok(Outcome::Failure)`. A handle that
/// could not dispatch the call is a harness fault and comes back as `Err`.
pub fn classify<C: Callable + ?Sized>(handle: &C, args: &[Value]) -> Result<Outcome, ProbeError> {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| handle.invoke(args)));

    match attempt {
        Ok(Ok(value)) => Ok(Outcome::Success(value)),
        Ok(Err(InvokeError::Target(failure))) => {
            tracing::debug!(target_fn = %handle.qualified_name(), %failure, "target raised");
            Ok(Outcome::Failure(failure))
        }
        Err(payload) => {
            let failure = Failure::from_panic(payload);
            tracing::debug!(target_fn = %handle.qualified_name(), %failure, "target panicked");
            Ok(Outcome::Failure(failure))
        }
        Ok(Err(InvokeError::Dispatch(error))) => Err(HarnessFault::Dispatch {
            call: handle.qualified_name(),
            error,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{CallableHandle, DispatchError};
    use serde_json::json;

    /// Handle whose access check always fails.
    struct Sealed;

    impl Callable for Sealed {
        fn owner(&self) -> &str {
            "Vault"
        }

        fn name(&self) -> &str {
            "open"
        }

        fn params(&self) -> &[String] {
            &[]
        }

        fn invoke(&self, _args: &[Value]) -> Result<Value, InvokeError> {
            Err(DispatchError::AccessDenied("Vault.open".to_string()).into())
        }
    }

    #[test]
    fn should_classify_normal_return_as_success() {
        let handle = CallableHandle::function("Fixture", "answer", |_: &[Value]| Ok(json!(42)));
        let outcome = classify(&handle, &[]).unwrap();
        assert_eq!(outcome.value(), Some(&json!(42)));
    }

    #[test]
    fn should_classify_unit_return_as_null_success() {
        let handle = CallableHandle::function("Fixture", "noop", |_: &[Value]| Ok(Value::Null));
        let outcome = classify(&handle, &[]).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.value(), Some(&Value::Null));
    }

    #[test]
    fn should_unwrap_target_failure() {
        let handle = CallableHandle::function("Fixture", "explode", |_: &[Value]| {
            Err(Failure::new("Exception", "crac"))
        });
        let outcome = classify(&handle, &[]).unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind(), "Exception");
        assert_eq!(failure.message(), "crac");
    }

    #[test]
    fn should_unwrap_panic_into_failure() {
        let handle = CallableHandle::function("Fixture", "panics", |_: &[Value]| -> Result<Value, Failure> {
            panic!("boom")
        });
        let outcome = classify(&handle, &[]).unwrap();
        let failure = outcome.failure().unwrap();
        assert!(failure.is_panic());
        assert_eq!(failure.message(), "boom");
    }

    #[test]
    fn should_report_dispatch_error_as_harness_fault() {
        let err = classify(&Sealed, &[]).unwrap_err();
        assert!(err.is_harness_fault());
        assert!(err.failure().is_none());
        assert!(err.to_string().contains("Vault.open"));
    }
}
