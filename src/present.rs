//! Rendering of call traces and values.
//!
//! The tester and timer never format anything themselves: every line they
//! emit is produced by a [`Presenter`] and written whole to their sink.

use crate::handle::Callable;
use crate::result::{MeanTiming, TimingSample};
use crate::Value;
use std::io::Write;

/// Renders calls, values and timings for diagnostic output.
pub trait Presenter: Send + Sync {
    /// `Owner.name(a, b)`
    fn render_call(&self, owner: &str, name: &str, args: &[String]) -> String {
        format!("{}.{}({})", owner, name, args.join(", "))
    }

    /// Strings are quoted, `Null` renders as `null`, everything else in its
    /// natural form.
    fn render_value(&self, value: &Value) -> String {
        value.to_string()
    }

    /// Heading printed once before a batch, underlined to its own width.
    fn render_header(&self, owner: &str, name: &str, params: &[String]) -> String {
        let title = format!("Testing {}", self.render_call(owner, name, params));
        let rule = "-".repeat(title.chars().count());
        format!("{}\n{}", title, rule)
    }

    fn render_sample(&self, call: &str, sample: &TimingSample) -> String {
        format!("{}: {} {}", call, sample.elapsed, sample.resolution.unit())
    }

    fn render_mean(&self, call: &str, mean: &MeanTiming) -> String {
        format!(
            "{}: mean {:.2} {unit} over {} run(s) (total {} {unit})",
            call,
            mean.mean,
            mean.count,
            mean.total,
            unit = mean.resolution.unit()
        )
    }
}

/// Plain-text presenter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPresenter;

impl Presenter for PlainPresenter {}

/// Render every argument of a call with `presenter`.
pub(crate) fn render_args(presenter: &dyn Presenter, args: &[Value]) -> Vec<String> {
    args.iter().map(|a| presenter.render_value(a)).collect()
}

/// Render a call of `handle` with concrete `args`.
pub(crate) fn render_invocation<C: Callable + ?Sized>(
    presenter: &dyn Presenter,
    handle: &C,
    args: &[Value],
) -> String {
    presenter.render_call(handle.owner(), handle.name(), &render_args(presenter, args))
}

/// Write a complete message followed by a newline. Never panics; a failed
/// write is logged and dropped.
pub(crate) fn emit<W: Write>(out: &mut W, message: &str) {
    if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
        tracing::warn!(error = %e, "failed to write probe output");
    }
}
