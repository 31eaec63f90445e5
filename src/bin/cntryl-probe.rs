//! cntryl-probe: list, test and time registered targets from the command line.
//!
//! Targets are functions annotated with `#[probe_target]` that are linked
//! into this binary. Arguments and expected values are JSON:
//!
//! ```text
//! cntryl-probe list --filter 'BatchTests*'
//! cntryl-probe test BatchTests.returnTrue --expect true
//! cntryl-probe test BatchTests.throwStatic --expect-kind NullDeref
//! cntryl-probe time BatchTests.returnTrue --times 1000 --resolution ns --json
//! cntryl-probe demo
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cntryl_probe::{
    probe_target, registry, Callable, CallableHandle, Expectation, Failure, InvocationTester,
    ProbeConfig, Resolution, Timer, Value,
};
use std::fmt;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "cntryl-probe",
    about = "Invoke registered targets, check their outcome and time them",
    long_about = "
cntryl-probe resolves targets registered with #[probe_target] by their
qualified name (Owner.name), invokes them with JSON arguments, and either
checks the outcome against expectations or reports latency.

Example:
    cntryl-probe list                                   # List all targets
    cntryl-probe test Math.add --args '[40, 2]' --expect 42
    cntryl-probe time Math.add --args '[40, 2]' --times 500
    cntryl-probe demo                                   # Run the built-in fixtures
"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List registered targets
    List(ListArgs),
    /// Run a batch of trials against one target
    Test(TestArgs),
    /// Time repeated calls of one target
    Time(TimeArgs),
    /// Run the built-in fixture batch
    Demo,
}

#[derive(Debug, Parser)]
struct ListArgs {
    /// Filter targets by glob pattern (e.g., "Math*", "*add*")
    #[arg(long)]
    filter: Option<String>,
}

#[derive(Debug, Parser)]
struct TestArgs {
    /// Target as Owner.name
    target: String,

    /// One JSON array of arguments per trial (default: a single call with no arguments)
    #[arg(long = "args", value_parser = parse_arg_set)]
    arg_sets: Vec<ArgSet>,

    /// Expected JSON return value, one per trial
    #[arg(long, value_parser = parse_json, conflicts_with_all = ["expect_kind", "expect_message"])]
    expect: Vec<Value>,

    /// Expected failure kind, one per trial
    #[arg(long, conflicts_with = "expect_message")]
    expect_kind: Vec<String>,

    /// Expected failure message, one per trial
    #[arg(long)]
    expect_message: Vec<String>,

    /// Only print the verdict
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Debug, Parser)]
struct TimeArgs {
    /// Target as Owner.name
    target: String,

    /// JSON array of arguments passed to every call
    #[arg(long = "args", value_parser = parse_arg_set)]
    arg_set: Option<ArgSet>,

    /// Number of calls (default: PROBE_TIMES or 100)
    #[arg(long)]
    times: Option<usize>,

    /// Clock resolution: ms or ns (default: PROBE_RESOLUTION or ns)
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Suppress per-call lines
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Print the mean timing as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Arguments of one call, parsed from a JSON array.
#[derive(Debug, Clone)]
struct ArgSet(Vec<Value>);

fn parse_json(s: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}

fn parse_arg_set(s: &str) -> std::result::Result<ArgSet, String> {
    match parse_json(s)? {
        Value::Array(values) => Ok(ArgSet(values)),
        other => Err(format!("expected a JSON array of arguments, got {}", other)),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::List(args) => run_list(args),
        Commands::Test(args) => run_test(args),
        Commands::Time(args) => run_time(args),
        Commands::Demo => run_demo(),
    }
}

fn run_list(args: ListArgs) -> Result<()> {
    let targets = registry::list_targets(args.filter.as_deref());
    if targets.is_empty() {
        eprintln!("No targets registered");
        return Ok(());
    }
    for target in targets {
        println!("{}({})", target.qualified_name(), target.param_list().join(", "));
    }
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    let handle = registry::resolve_path(&args.target)?;

    let arg_sets: Vec<Vec<Value>> = if args.arg_sets.is_empty() {
        vec![Vec::new()]
    } else {
        args.arg_sets.into_iter().map(|a| a.0).collect()
    };

    let expectations: Vec<Expectation> = if !args.expect.is_empty() {
        args.expect.into_iter().map(Expectation::value).collect()
    } else if !args.expect_kind.is_empty() {
        args.expect_kind
            .into_iter()
            .map(Expectation::failure_of_kind)
            .collect()
    } else if !args.expect_message.is_empty() {
        args.expect_message
            .into_iter()
            .map(Expectation::failure_with_message)
            .collect()
    } else {
        bail!("one of --expect, --expect-kind or --expect-message is required");
    };

    let mut config = ProbeConfig::from_env();
    if args.quiet {
        config = config.quiet();
    }

    let mut tester = InvocationTester::with_config(handle, config);
    let report = tester
        .batch_test(&arg_sets, &expectations)
        .with_context(|| format!("testing {}", args.target))?;

    println!("{}: {}/{} trial(s) passed", args.target, report.passed, report.trials);
    Ok(())
}

fn run_time(args: TimeArgs) -> Result<()> {
    let handle = registry::resolve_path(&args.target)?;

    let mut config = ProbeConfig::from_env();
    if let Some(times) = args.times {
        config = config.times(times);
    }
    if let Some(resolution) = args.resolution {
        config = config.resolution(resolution);
    }
    if args.quiet {
        config = config.print_each(false);
    }
    if args.json {
        config = config.print_summary(false);
    }

    let call_args = args.arg_set.map(|a| a.0).unwrap_or_default();
    let mut timer = Timer::with_config(handle, config);
    let mean = timer
        .mean_time_default(&call_args)
        .with_context(|| format!("timing {}", args.target))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mean)?);
    }
    Ok(())
}

// ============================================================================
// Demo Fixtures
// ============================================================================

/// Raised by [`throw_static`] in place of dereferencing a missing value.
#[derive(Debug)]
struct NullDeref;

impl fmt::Display for NullDeref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dereferenced a null value")
    }
}

impl std::error::Error for NullDeref {}

struct BatchTests {
    value: i64,
}

impl BatchTests {
    fn new() -> Self {
        Self { value: 42 }
    }

    fn get_value(&self) -> i64 {
        self.value
    }

    fn throw_exception(&self) -> Result<(), Failure> {
        Err(Failure::new("Exception", "crac"))
    }
}

#[probe_target(owner = "BatchTests", name = "returnTrue")]
fn return_true(_args: &[Value]) -> Result<Value, Failure> {
    Ok(Value::Bool(true))
}

#[probe_target(owner = "BatchTests", name = "throwStatic")]
fn throw_static(_args: &[Value]) -> Result<Value, Failure> {
    Err(Failure::from_error(NullDeref))
}

fn run_demo() -> Result<()> {
    let config = ProbeConfig::from_env();
    let batch = BatchTests::new();
    let no_args: [Vec<Value>; 1] = [Vec::new()];

    let get_value = CallableHandle::method(batch, "getValue", |b: &BatchTests, _: &[Value]| {
        Ok(Value::from(b.get_value()))
    });
    InvocationTester::with_config(get_value, config.clone()).test_success(&no_args, [42])?;

    let throw_exception = CallableHandle::method(
        BatchTests::new(),
        "throwException",
        |b: &BatchTests, _: &[Value]| b.throw_exception().map(|()| Value::Null),
    );
    InvocationTester::with_config(throw_exception, config.clone())
        .batch_test(&no_args, &[Expectation::failure_with_message("crac")])?;

    let return_true = registry::resolve("BatchTests", "returnTrue")?;
    InvocationTester::with_config(return_true.clone(), config.clone())
        .test_success(&no_args, [true])?;

    let throw_static = registry::resolve("BatchTests", "throwStatic")?;
    InvocationTester::with_config(throw_static, config.clone())
        .batch_test(&no_args, &[Expectation::failure_of::<NullDeref>()])?;

    let mean = Timer::with_config(return_true.clone(), config.print_each(false))
        .mean_time_default(&[])?;
    tracing::info!(target_name = %return_true.qualified_name(), mean = mean.mean, "demo timing");

    Ok(())
}
