//! Configuration for testers and timers.

use crate::result::Resolution;

/// Output and timing defaults shared by [`InvocationTester`](crate::InvocationTester)
/// and [`Timer`](crate::Timer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Print a trace line per trial / per timed call.
    pub print_each: bool,
    /// Print the batch header/summary and the mean timing summary.
    pub print_summary: bool,
    /// Clock used when a caller does not pick one.
    pub resolution: Resolution,
    /// Default repeat count for mean timings.
    pub times: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            print_each: true,
            print_summary: true,
            resolution: Resolution::Fine,
            times: 100,
        }
    }
}

impl ProbeConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `PROBE_TRACE`: per-trial / per-call output (default: true)
    /// - `PROBE_SUMMARY`: summary output (default: true)
    /// - `PROBE_RESOLUTION`: `ms`/`coarse` or `ns`/`fine` (default: fine)
    /// - `PROBE_TIMES`: default repeat count (default: 100)
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("PROBE_TRACE") {
            cfg.print_each = parse_flag(&v);
        }
        if let Some(v) = lookup("PROBE_SUMMARY") {
            cfg.print_summary = parse_flag(&v);
        }
        if let Some(v) = lookup("PROBE_RESOLUTION") {
            match v.parse() {
                Ok(r) => cfg.resolution = r,
                Err(e) => tracing::warn!(error = %e, "ignoring PROBE_RESOLUTION"),
            }
        }
        if let Some(v) = lookup("PROBE_TIMES") {
            if let Ok(n) = v.parse() {
                cfg.times = n;
            }
        }

        cfg
    }

    /// Toggle per-trial / per-call output.
    pub fn print_each(mut self, v: bool) -> Self {
        self.print_each = v;
        self
    }

    /// Toggle summary output.
    pub fn print_summary(mut self, v: bool) -> Self {
        self.print_summary = v;
        self
    }

    /// Silence all output.
    pub fn quiet(self) -> Self {
        self.print_each(false).print_summary(false)
    }

    pub fn resolution(mut self, r: Resolution) -> Self {
        self.resolution = r;
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.times = n;
        self
    }
}

fn parse_flag(v: &str) -> bool {
    v != "0" && !v.eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn should_use_defaults_when_env_not_set() {
        let cfg = ProbeConfig::from_lookup(|_| None);
        assert_eq!(cfg, ProbeConfig::default());
        assert!(cfg.print_each);
        assert!(cfg.print_summary);
        assert_eq!(cfg.resolution, Resolution::Fine);
        assert_eq!(cfg.times, 100);
    }

    #[test]
    fn should_read_overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("PROBE_TRACE", "false"),
            ("PROBE_SUMMARY", "0"),
            ("PROBE_RESOLUTION", "ms"),
            ("PROBE_TIMES", "7"),
        ]
        .into_iter()
        .collect();
        let cfg = ProbeConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert!(!cfg.print_each);
        assert!(!cfg.print_summary);
        assert_eq!(cfg.resolution, Resolution::Coarse);
        assert_eq!(cfg.times, 7);
    }

    #[test]
    fn should_keep_defaults_for_garbage_values() {
        let cfg = ProbeConfig::from_lookup(|k| match k {
            "PROBE_RESOLUTION" => Some("hours".to_string()),
            "PROBE_TIMES" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(cfg.resolution, Resolution::Fine);
        assert_eq!(cfg.times, 100);
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = ProbeConfig::new()
            .resolution(Resolution::Coarse)
            .times(5)
            .quiet();

        assert!(!cfg.print_each);
        assert!(!cfg.print_summary);
        assert_eq!(cfg.resolution, Resolution::Coarse);
        assert_eq!(cfg.times, 5);
    }
}
