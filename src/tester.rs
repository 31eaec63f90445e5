//! Trials: invoke a handle and compare the outcome to an expectation.

use crate::config::ProbeConfig;
use crate::error::{ConfigError, ProbeError, Result};
use crate::expect::{Expectation, Expected, FailurePredicate, Mismatch, MismatchKind, Verdict};
use crate::handle::{check_arity, Callable};
use crate::outcome::{classify, Outcome};
use crate::present::{emit, render_invocation, PlainPresenter, Presenter};
use crate::result::BatchReport;
use crate::Value;
use std::io::{Stderr, Write};

/// Runs single and batched trials against one handle.
///
/// Trace output goes to the tester's own sink (stderr unless replaced with
/// [`InvocationTester::with_output`]).
///
/// # Example
///
/// ```rust
/// use cntryl_probe::{CallableHandle, Expectation, InvocationTester, ProbeConfig, Value};
///
/// let answer = CallableHandle::function("Fixture", "answer", |_: &[Value]| Ok(Value::from(42)));
/// let mut tester = InvocationTester::with_config(answer, ProbeConfig::new().quiet());
///
/// assert!(tester.single_test(&[], &Expectation::value(42))?.is_pass());
/// assert!(!tester.single_test(&[], &Expectation::value(43))?.is_pass());
/// # Ok::<(), cntryl_probe::ProbeError>(())
/// ```
pub struct InvocationTester<W = Stderr> {
    handle: Box<dyn Callable>,
    presenter: Box<dyn Presenter>,
    config: ProbeConfig,
    out: W,
}

impl InvocationTester<Stderr> {
    /// Create a tester with config from environment, writing to stderr.
    pub fn new(handle: impl Callable + 'static) -> Self {
        Self::with_config(handle, ProbeConfig::from_env())
    }

    /// Create a tester with explicit config, writing to stderr.
    pub fn with_config(handle: impl Callable + 'static, config: ProbeConfig) -> Self {
        Self {
            handle: Box::new(handle),
            presenter: Box::new(PlainPresenter),
            config,
            out: std::io::stderr(),
        }
    }
}

impl<W: Write> InvocationTester<W> {
    /// Redirect trace output.
    pub fn with_output<O: Write>(self, out: O) -> InvocationTester<O> {
        InvocationTester {
            handle: self.handle,
            presenter: self.presenter,
            config: self.config,
            out,
        }
    }

    /// Replace the presenter.
    pub fn presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    pub fn handle(&self) -> &dyn Callable {
        self.handle.as_ref()
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run one trial.
    ///
    /// The expectation and arity are validated before the handle is invoked.
    /// A failure raised where a value was expected is returned as
    /// [`ProbeError::Unexpected`] rather than as a failed verdict.
    pub fn single_test(&mut self, args: &[Value], expectation: &Expectation) -> Result<Verdict> {
        let expected = expectation.resolve()?;
        check_arity(self.handle.as_ref(), args)?;
        self.run_trial(args, &expected)
    }

    /// Run trials in order, pairing `arg_sets[i]` with `expectations[i]`.
    ///
    /// Every pair is validated before the first invocation. The batch stops
    /// at the first failing or erroring trial; later trials are never
    /// invoked. All expectations must be of the same kind.
    pub fn batch_test(
        &mut self,
        arg_sets: &[Vec<Value>],
        expectations: &[Expectation],
    ) -> Result<BatchReport> {
        if arg_sets.len() != expectations.len() {
            return Err(ConfigError::LengthMismatch {
                args: arg_sets.len(),
                expectations: expectations.len(),
            }
            .into());
        }

        let resolved = expectations
            .iter()
            .map(Expectation::resolve)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let failures = resolved.iter().filter(|e| e.is_failure()).count();
        if failures != 0 && failures != resolved.len() {
            return Err(ConfigError::MixedBatch.into());
        }

        for args in arg_sets {
            check_arity(self.handle.as_ref(), args)?;
        }

        if self.config.print_summary {
            let header = self.presenter.render_header(
                self.handle.owner(),
                self.handle.name(),
                self.handle.params(),
            );
            emit(&mut self.out, &header);
        }

        let mut report = BatchReport {
            trials: 0,
            passed: 0,
        };

        for (trial, (args, expected)) in arg_sets.iter().zip(&resolved).enumerate() {
            report.trials += 1;
            match self.run_trial(args, expected)? {
                Verdict::Pass => report.passed += 1,
                Verdict::Fail(mismatch) => {
                    if self.config.print_summary {
                        let line = format!(
                            "Stopped at trial {} of {}: {}",
                            trial + 1,
                            arg_sets.len(),
                            mismatch
                        );
                        emit(&mut self.out, &line);
                    }
                    return Err(ProbeError::Verdict { trial, mismatch });
                }
            }
        }

        if self.config.print_summary {
            let line = format!("{}/{} trial(s) passed", report.passed, report.trials);
            emit(&mut self.out, &line);
        }

        Ok(report)
    }

    /// Batch in which every trial expects a value.
    pub fn test_success<I, V>(&mut self, arg_sets: &[Vec<Value>], expected: I) -> Result<BatchReport>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let expectations: Vec<Expectation> = expected.into_iter().map(Expectation::value).collect();
        self.batch_test(arg_sets, &expectations)
    }

    /// Batch in which every trial expects a failure.
    pub fn test_failure<I>(&mut self, arg_sets: &[Vec<Value>], predicates: I) -> Result<BatchReport>
    where
        I: IntoIterator<Item = FailurePredicate>,
    {
        let expectations: Vec<Expectation> = predicates
            .into_iter()
            .map(Expectation::from_predicate)
            .collect();
        self.batch_test(arg_sets, &expectations)
    }

    fn run_trial(&mut self, args: &[Value], expected: &Expected<'_>) -> Result<Verdict> {
        let call = render_invocation(self.presenter.as_ref(), self.handle.as_ref(), args);
        let trace = self.config.print_each;

        if trace {
            let expected_str = match expected {
                Expected::Value(v) => self.presenter.render_value(v),
                Expected::Failure { description, .. } => description.to_string(),
            };
            emit(&mut self.out, &call);
            emit(&mut self.out, &format!("Expected: {}", expected_str));
        }

        let outcome = classify(self.handle.as_ref(), args)?;

        let verdict = match (expected, outcome) {
            (Expected::Value(want), Outcome::Success(got)) => {
                let got_str = self.presenter.render_value(&got);
                if trace {
                    emit(&mut self.out, &format!("Got     : {}", got_str));
                }
                if **want == got {
                    Verdict::Pass
                } else {
                    Verdict::Fail(Mismatch {
                        kind: MismatchKind::ValueDiffers,
                        expected: self.presenter.render_value(want),
                        actual: got_str,
                    })
                }
            }
            (Expected::Value(_), Outcome::Failure(failure)) => {
                if trace {
                    emit(&mut self.out, &format!("Raised  : {}", failure));
                    emit(&mut self.out, "");
                }
                return Err(ProbeError::Unexpected { call, failure });
            }
            (Expected::Failure { predicate, description }, Outcome::Failure(failure)) => {
                if trace {
                    emit(&mut self.out, &format!("Got     : {}", failure));
                }
                if predicate(&failure) {
                    Verdict::Pass
                } else {
                    Verdict::Fail(Mismatch {
                        kind: MismatchKind::PredicateRejected,
                        expected: description.to_string(),
                        actual: failure.to_string(),
                    })
                }
            }
            (Expected::Failure { description, .. }, Outcome::Success(got)) => {
                let got_str = self.presenter.render_value(&got);
                if trace {
                    emit(&mut self.out, &format!("Got     : {}", got_str));
                }
                Verdict::Fail(Mismatch {
                    kind: MismatchKind::UnexpectedSuccess,
                    expected: description.to_string(),
                    actual: got_str,
                })
            }
        };

        tracing::debug!(call = %call, pass = verdict.is_pass(), "trial finished");

        if trace {
            match &verdict {
                Verdict::Pass => emit(&mut self.out, "OK"),
                Verdict::Fail(m) => emit(&mut self.out, &format!("FAILED: {}", m)),
            }
            emit(&mut self.out, "");
        }

        Ok(verdict)
    }
}
