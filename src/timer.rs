//! Latency of single and repeated invocations.

use crate::config::ProbeConfig;
use crate::error::{ConfigError, HarnessFault, Result};
use crate::handle::{check_arity, Callable};
use crate::outcome::{classify, Outcome};
use crate::present::{emit, render_invocation, PlainPresenter, Presenter};
use crate::result::{MeanTiming, Resolution, TimingSample};
use crate::Value;
use std::hint::black_box;
use std::io::{Stderr, Write};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Times calls of one handle.
///
/// Calls run sequentially on the caller's thread. A timed call that raises
/// is a harness fault, never a measurement.
///
/// # Example
///
/// ```rust
/// use cntryl_probe::{CallableHandle, ProbeConfig, Resolution, Timer, Value};
///
/// let sum = CallableHandle::function("Fixture", "sum", |_: &[Value]| {
///     Ok(Value::from((0..1_000u64).sum::<u64>()))
/// });
/// let mut timer = Timer::with_config(sum, ProbeConfig::new().quiet());
///
/// let mean = timer.mean_time(&[], 10, Resolution::Fine)?;
/// assert_eq!(mean.count, 10);
/// # Ok::<(), cntryl_probe::ProbeError>(())
/// ```
pub struct Timer<W = Stderr> {
    handle: Box<dyn Callable>,
    presenter: Box<dyn Presenter>,
    config: ProbeConfig,
    out: W,
}

impl Timer<Stderr> {
    /// Create a timer with config from environment, writing to stderr.
    pub fn new(handle: impl Callable + 'static) -> Self {
        Self::with_config(handle, ProbeConfig::from_env())
    }

    /// Create a timer with explicit config, writing to stderr.
    pub fn with_config(handle: impl Callable + 'static, config: ProbeConfig) -> Self {
        Self {
            handle: Box::new(handle),
            presenter: Box::new(PlainPresenter),
            config,
            out: std::io::stderr(),
        }
    }
}

impl<W: Write> Timer<W> {
    /// Redirect output.
    pub fn with_output<O: Write>(self, out: O) -> Timer<O> {
        Timer {
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

    /// Invoke once and report the elapsed time.
    pub fn time_once(&mut self, args: &[Value], resolution: Resolution) -> Result<TimingSample> {
        check_arity(self.handle.as_ref(), args)?;
        let call = render_invocation(self.presenter.as_ref(), self.handle.as_ref(), args);

        let sample = self.sample(&call, args, resolution)?;
        if self.config.print_each {
            let line = self.presenter.render_sample(&call, &sample);
            emit(&mut self.out, &line);
        }
        Ok(sample)
    }

    /// Invoke `times` times with the same arguments and report the mean.
    ///
    /// `times` must be positive; zero is rejected before the first call.
    pub fn mean_time(
        &mut self,
        args: &[Value],
        times: usize,
        resolution: Resolution,
    ) -> Result<MeanTiming> {
        if times == 0 {
            return Err(ConfigError::NonPositiveRepeat.into());
        }
        check_arity(self.handle.as_ref(), args)?;
        let call = render_invocation(self.presenter.as_ref(), self.handle.as_ref(), args);

        let mut samples = Vec::with_capacity(times);
        for _ in 0..times {
            let sample = self.sample(&call, args, resolution)?;
            if self.config.print_each {
                let line = self.presenter.render_sample(&call, &sample);
                emit(&mut self.out, &line);
            }
            samples.push(sample.elapsed);
        }

        let mean = MeanTiming::from_samples(resolution, samples).ok_or(ConfigError::NonPositiveRepeat)?;
        tracing::debug!(call = %call, count = mean.count, mean = mean.mean, unit = resolution.unit(), "mean timing");

        if self.config.print_summary {
            let line = self.presenter.render_mean(&call, &mean);
            emit(&mut self.out, &line);
        }
        Ok(mean)
    }

    /// [`Timer::mean_time`] with the configured repeat count and resolution.
    pub fn mean_time_default(&mut self, args: &[Value]) -> Result<MeanTiming> {
        let (times, resolution) = (self.config.times, self.config.resolution);
        self.mean_time(args, times, resolution)
    }

    fn sample(&self, call: &str, args: &[Value], resolution: Resolution) -> Result<TimingSample> {
        let handle = self.handle.as_ref();
        let (outcome, elapsed) = match resolution {
            Resolution::Fine => {
                let start = Instant::now();
                let outcome = classify(handle, black_box(args))?;
                let nanos = start.elapsed().as_nanos();
                (outcome, u64::try_from(nanos).unwrap_or(u64::MAX))
            }
            Resolution::Coarse => {
                let start = wall_millis();
                let outcome = classify(handle, black_box(args))?;
                (outcome, wall_millis().saturating_sub(start))
            }
        };

        match outcome {
            Outcome::Success(value) => {
                black_box(value);
                Ok(TimingSample {
                    resolution,
                    elapsed,
                })
            }
            Outcome::Failure(failure) => Err(HarnessFault::TargetRaised {
                call: call.to_string(),
                failure,
            }
            .into()),
        }
    }
}

/// Milliseconds since the Unix epoch. A clock before the epoch reads as 0.
fn wall_millis() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::failure::Failure;
    use crate::handle::CallableHandle;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counted(calls: Arc<AtomicUsize>) -> CallableHandle {
        CallableHandle::function("Fixture", "answer", move |_: &[Value]| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(42))
        })
    }

    fn quiet() -> ProbeConfig {
        ProbeConfig::new().quiet()
    }

    #[test]
    fn should_invoke_exactly_times_and_average_samples() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::with_config(counted(calls.clone()), quiet());

        let mean = timer.mean_time(&[], 100, Resolution::Fine).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 100);
        assert_eq!(mean.count, 100);
        assert_eq!(mean.samples.len(), 100);
        assert_eq!(mean.total, mean.samples.iter().sum::<u64>());
        assert_eq!(mean.mean, mean.total as f64 / 100.0);
        assert_eq!(mean.resolution, Resolution::Fine);
    }

    #[test]
    fn should_reject_zero_times_without_invoking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::with_config(counted(calls.clone()), quiet());

        let err = timer.mean_time(&[], 0, Resolution::Fine).unwrap_err();
        assert!(matches!(err, ProbeError::Config(ConfigError::NonPositiveRepeat)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_measure_sleep_at_fine_resolution() {
        let handle = CallableHandle::function("Fixture", "nap", |_: &[Value]| {
            std::thread::sleep(Duration::from_millis(5));
            Ok(Value::Null)
        });
        let mut timer = Timer::with_config(handle, quiet());

        let sample = timer.time_once(&[], Resolution::Fine).unwrap();
        assert!(sample.as_duration() >= Duration::from_millis(5));
        assert!(sample.as_duration() < Duration::from_secs(1));
    }

    #[test]
    fn should_measure_sleep_at_coarse_resolution() {
        let handle = CallableHandle::function("Fixture", "nap", |_: &[Value]| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(Value::Null)
        });
        let mut timer = Timer::with_config(handle, quiet());

        let sample = timer.time_once(&[], Resolution::Coarse).unwrap();
        assert_eq!(sample.resolution, Resolution::Coarse);
        assert!(sample.elapsed >= 19);
        assert!(sample.elapsed < 1_000);
    }

    #[test]
    fn should_escalate_target_failure_as_harness_fault() {
        let handle = CallableHandle::function("Fixture", "explode", |_: &[Value]| {
            Err(Failure::new("Exception", "crac"))
        });
        let mut timer = Timer::with_config(handle, quiet());

        let err = timer.time_once(&[], Resolution::Fine).unwrap_err();
        assert!(err.is_harness_fault());
        assert_eq!(err.failure().map(|f| f.message()), Some("crac"));
    }

    #[test]
    fn should_stop_mean_timing_at_first_raise() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = CallableHandle::function("Fixture", "flaky", move |_: &[Value]| {
            if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                return Err(Failure::new("Exception", "third call"));
            }
            Ok(Value::Null)
        });
        let mut timer = Timer::with_config(handle, quiet());

        let err = timer.mean_time(&[], 10, Resolution::Fine).unwrap_err();
        assert!(err.is_harness_fault());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn should_reject_wrong_arity_before_timing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::with_config(counted(calls.clone()), quiet());

        let err = timer.time_once(&[json!(1)], Resolution::Fine).unwrap_err();
        assert!(err.is_config());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_toggle_per_call_and_summary_output_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = ProbeConfig::new().print_each(false).print_summary(true);
        let mut timer = Timer::with_config(counted(calls.clone()), config).with_output(Vec::new());
        timer.mean_time(&[], 3, Resolution::Fine).unwrap();
        let out = String::from_utf8(timer.into_output()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("Fixture.answer(): mean "));
        assert!(out.contains("over 3 run(s)"));

        let config = ProbeConfig::new().print_each(true).print_summary(false);
        let mut timer = Timer::with_config(counted(calls), config).with_output(Vec::new());
        timer.mean_time(&[], 3, Resolution::Coarse).unwrap();
        let out = String::from_utf8(timer.into_output()).unwrap();
        assert_eq!(out.lines().count(), 3);
        assert!(out.lines().all(|l| l.starts_with("Fixture.answer(): ") && l.ends_with(" ms")));
    }

    #[test]
    fn should_use_configured_defaults() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = quiet().times(7).resolution(Resolution::Coarse);
        let mut timer = Timer::with_config(counted(calls.clone()), config);

        let mean = timer.mean_time_default(&[]).unwrap();
        assert_eq!(mean.count, 7);
        assert_eq!(mean.resolution, Resolution::Coarse);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }
}
