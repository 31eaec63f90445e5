//! # cntryl-probe
//!
//! A small harness for exercising a callable: invoke it with arguments,
//! classify the outcome as a value or a failure, check it against what a test
//! expects, and time it.
//!
//! Targets are reached through a [`Callable`] handle. Closures become handles
//! with [`CallableHandle`]; plain functions can also be registered at link time
//! with `#[probe_target]` and resolved by owner and name through [`registry`].
//!
//! ## Quick Start
//!
//! ```rust
//! use cntryl_probe::{
//!     CallableHandle, Expectation, Failure, InvocationTester, ProbeConfig, Resolution, Timer,
//!     Value,
//! };
//!
//! let div = CallableHandle::function("Math", "div", |args: &[Value]| {
//!     let a = args[0].as_i64().unwrap_or_default();
//!     match args[1].as_i64().unwrap_or_default() {
//!         0 => Err(Failure::new("ArithmeticError", "division by zero")),
//!         b => Ok(Value::from(a / b)),
//!     }
//! })
//! .with_params(["i64", "i64"]);
//!
//! let mut tester = InvocationTester::with_config(div.clone(), ProbeConfig::new().quiet());
//! let report = tester.batch_test(
//!     &[vec![Value::from(84), Value::from(2)], vec![Value::from(1), Value::from(0)]],
//!     &[
//!         Expectation::value(42),
//!         Expectation::failure_with_message("division by zero"),
//!     ],
//! );
//! assert!(report.is_err()); // mixed value/failure batches are rejected
//!
//! assert!(tester
//!     .single_test(&[Value::from(84), Value::from(2)], &Expectation::value(42))?
//!     .is_pass());
//!
//! let mut timer = Timer::with_config(div, ProbeConfig::new().quiet());
//! let mean = timer.mean_time(&[Value::from(84), Value::from(2)], 10, Resolution::Fine)?;
//! assert_eq!(mean.count, 10);
//! # Ok::<(), cntryl_probe::ProbeError>(())
//! ```
//!
//! ## Environment
//!
//! [`ProbeConfig::from_env`] reads `PROBE_TRACE`, `PROBE_SUMMARY`,
//! `PROBE_RESOLUTION` and `PROBE_TIMES`.

// Lets `#[probe_target]` expansions name `::cntryl_probe` inside this crate too.
extern crate self as cntryl_probe;

mod config;
mod error;
mod expect;
mod failure;
mod handle;
mod outcome;
mod present;
mod result;
mod tester;
mod timer;

pub mod registry;

pub use serde_json::{json, Value};

pub use config::ProbeConfig;
pub use error::{ConfigError, HarnessFault, ProbeError, Result};
pub use expect::{predicate, Expectation, FailurePredicate, Mismatch, MismatchKind, Verdict};
pub use failure::Failure;
pub use handle::{Callable, CallableHandle, DispatchError, InvokeError};
pub use outcome::{classify, Outcome};
pub use present::{PlainPresenter, Presenter};
pub use result::{BatchReport, MeanTiming, ParseResolutionError, Resolution, TimingSample};
pub use tester::InvocationTester;
pub use timer::Timer;

pub use cntryl_probe_macros::probe_target;

// Used by the `#[probe_target]` expansion.
#[doc(hidden)]
pub mod __private {
    pub use crate::registry::{linkme, TargetEntry, PROBE_TARGETS};
}
