//! Measurement and batch result types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Clock used to time a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Wall clock, whole milliseconds. Undercounts sub-millisecond work.
    Coarse,
    /// Monotonic clock, nanoseconds.
    #[default]
    Fine,
}

impl Resolution {
    /// Unit suffix for samples at this resolution.
    pub fn unit(self) -> &'static str {
        match self {
            Resolution::Coarse => "ms",
            Resolution::Fine => "ns",
        }
    }

    /// Convert a number of units at this resolution into a duration.
    pub fn to_duration(self, units: u64) -> Duration {
        match self {
            Resolution::Coarse => Duration::from_millis(units),
            Resolution::Fine => Duration::from_nanos(units),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resolution {0:?}, expected one of: ms, coarse, ns, fine")]
pub struct ParseResolutionError(String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "coarse" | "millis" => Ok(Resolution::Coarse),
            "ns" | "fine" | "nanos" => Ok(Resolution::Fine),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}

/// Elapsed time of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSample {
    pub resolution: Resolution,
    /// Elapsed units (`ms` or `ns` depending on `resolution`).
    pub elapsed: u64,
}

impl TimingSample {
    pub fn as_duration(&self) -> Duration {
        self.resolution.to_duration(self.elapsed)
    }
}

/// Arithmetic mean of repeated timings of the same call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanTiming {
    pub resolution: Resolution,
    /// Number of samples.
    pub count: usize,
    /// Sum of all samples, in units.
    pub total: u64,
    /// `total / count`, in units.
    pub mean: f64,
    /// Individual samples in run order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<u64>,
}

impl MeanTiming {
    /// Aggregate samples taken at `resolution`. Returns `None` when empty.
    pub fn from_samples(resolution: Resolution, samples: Vec<u64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let total = samples.iter().fold(0u64, |acc, s| acc.saturating_add(*s));
        let count = samples.len();
        Some(Self {
            resolution,
            count,
            total,
            mean: total as f64 / count as f64,
            samples,
        })
    }

    pub fn mean_duration(&self) -> Duration {
        let nanos = match self.resolution {
            Resolution::Coarse => self.mean * 1_000_000.0,
            Resolution::Fine => self.mean,
        };
        Duration::from_nanos(nanos.round() as u64)
    }

    pub fn min(&self) -> Option<u64> {
        self.samples.iter().copied().min()
    }

    pub fn max(&self) -> Option<u64> {
        self.samples.iter().copied().max()
    }
}

/// Summary of a batch that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Trials run.
    pub trials: usize,
    /// Trials that passed. Equal to `trials` for a completed batch.
    pub passed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_resolution_aliases() {
        assert_eq!("ms".parse::<Resolution>().unwrap(), Resolution::Coarse);
        assert_eq!("Coarse".parse::<Resolution>().unwrap(), Resolution::Coarse);
        assert_eq!("ns".parse::<Resolution>().unwrap(), Resolution::Fine);
        assert_eq!(" fine ".parse::<Resolution>().unwrap(), Resolution::Fine);
        assert!("seconds".parse::<Resolution>().is_err());
    }

    #[test]
    fn should_compute_mean_from_sum_and_count() {
        let mean = MeanTiming::from_samples(Resolution::Fine, vec![10, 20, 30, 41]).unwrap();
        assert_eq!(mean.count, 4);
        assert_eq!(mean.total, 101);
        assert_eq!(mean.mean, 25.25);
        assert_eq!(mean.min(), Some(10));
        assert_eq!(mean.max(), Some(41));
    }

    #[test]
    fn should_not_aggregate_empty_samples() {
        assert!(MeanTiming::from_samples(Resolution::Coarse, Vec::new()).is_none());
    }

    #[test]
    fn should_convert_units_to_duration() {
        let sample = TimingSample {
            resolution: Resolution::Coarse,
            elapsed: 3,
        };
        assert_eq!(sample.as_duration(), Duration::from_millis(3));

        let mean = MeanTiming::from_samples(Resolution::Coarse, vec![2, 4]).unwrap();
        assert_eq!(mean.mean_duration(), Duration::from_millis(3));
    }

    #[test]
    fn should_serialize_resolution_in_lowercase() {
        let sample = TimingSample {
            resolution: Resolution::Fine,
            elapsed: 7,
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"resolution":"fine","elapsed":7}"#);
    }
}
