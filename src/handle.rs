//! Invocable handles to target operations.

use crate::error::ConfigError;
use crate::failure::{short_type_name, Failure};
use crate::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Why a handle could not dispatch a call. These are harness faults, never
/// failures of the target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("access to {0} denied")]
    AccessDenied(String),

    #[error("bound receiver is no longer available")]
    ReceiverUnavailable,

    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: usize, got: usize },
}

/// Result of an invocation attempt as seen by the invocation layer.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The call never reached the target.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The target ran and raised; the failure is wrapped here by the
    /// invocation layer and unwrapped again by the classifier.
    #[error("target raised: {0}")]
    Target(#[from] Failure),
}

/// Contract every invocable target fulfils.
///
/// Implementations must not change observable state of the handle when
/// invoked.
pub trait Callable {
    /// Name of the type or module that owns the operation.
    fn owner(&self) -> &str;

    /// Name of the operation.
    fn name(&self) -> &str;

    /// Declared parameter type names, one per argument.
    fn params(&self) -> &[String];

    /// Whether the operation is bound to a receiving instance.
    fn is_bound(&self) -> bool {
        false
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, InvokeError>;

    fn arity(&self) -> usize {
        self.params().len()
    }

    /// `Owner.name`
    fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner(), self.name())
    }
}

type Body = dyn Fn(&[Value]) -> Result<Value, InvokeError> + Send + Sync;

/// Closure-backed [`Callable`].
///
/// Cloning shares the function body; a handle is never mutated after it is
/// built.
///
/// # Example
///
/// ```rust
/// use cntryl_probe::{Callable, CallableHandle, Failure, Value};
///
/// let add = CallableHandle::function("Math", "add", |args: &[Value]| {
///     let a = args[0].as_i64().ok_or_else(|| Failure::new("TypeError", "a"))?;
///     let b = args[1].as_i64().ok_or_else(|| Failure::new("TypeError", "b"))?;
///     Ok(Value::from(a + b))
/// })
/// .with_params(["i64", "i64"]);
///
/// assert_eq!(add.arity(), 2);
/// ```
#[derive(Clone)]
pub struct CallableHandle {
    owner: String,
    name: String,
    params: Vec<String>,
    bound: bool,
    body: Arc<Body>,
}

impl CallableHandle {
    /// Handle to a free (unbound) operation.
    pub fn function<F>(owner: impl Into<String>, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self {
            owner: owner.into(),
            name: name.into(),
            params: Vec::new(),
            bound: false,
            body: Arc::new(move |args: &[Value]| f(args).map_err(InvokeError::Target)),
        }
    }

    /// Handle to an operation bound to `receiver`.
    ///
    /// The owner name defaults to the receiver's type name.
    pub fn method<T, F>(receiver: T, name: impl Into<String>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self {
            owner: short_type_name::<T>().to_string(),
            name: name.into(),
            params: Vec::new(),
            bound: true,
            body: Arc::new(move |args: &[Value]| f(&receiver, args).map_err(InvokeError::Target)),
        }
    }

    /// Like [`CallableHandle::method`] but without keeping the receiver
    /// alive. Invoking after the receiver is dropped is a dispatch error.
    pub fn weak_method<T, F>(receiver: &Arc<T>, name: impl Into<String>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(receiver);
        Self {
            owner: short_type_name::<T>().to_string(),
            name: name.into(),
            params: Vec::new(),
            bound: true,
            body: Arc::new(move |args: &[Value]| {
                let receiver = weak.upgrade().ok_or(DispatchError::ReceiverUnavailable)?;
                f(receiver.as_ref(), args).map_err(InvokeError::Target)
            }),
        }
    }

    /// Declare parameter type names. Their count is the handle's arity.
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Override the owner name.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

impl Callable for CallableHandle {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[String] {
        &self.params
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, InvokeError> {
        if args.len() != self.params.len() {
            return Err(DispatchError::Arity {
                expected: self.params.len(),
                got: args.len(),
            }
            .into());
        }
        (self.body)(args)
    }
}

/// Reject an argument list whose length is not the handle's arity.
pub(crate) fn check_arity<C: Callable + ?Sized>(handle: &C, args: &[Value]) -> Result<(), ConfigError> {
    if args.len() == handle.arity() {
        return Ok(());
    }
    Err(ConfigError::ArityMismatch {
        target: handle.qualified_name(),
        expected: handle.arity(),
        got: args.len(),
    })
}

impl fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableHandle")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("bound", &self.bound)
            .finish()
    }
}

impl<C: Callable + ?Sized> Callable for Box<C> {
    fn owner(&self) -> &str {
        (**self).owner()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> &[String] {
        (**self).params()
    }

    fn is_bound(&self) -> bool {
        (**self).is_bound()
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, InvokeError> {
        (**self).invoke(args)
    }
}
