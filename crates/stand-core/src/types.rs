//! Metric definitions, readings and batches

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named metric with the query used to fetch it and its ceiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Unique name within a run
    pub name: String,

    /// Opaque query handed to the metric source
    pub query: String,

    /// Maximum acceptable value (inclusive)
    pub ceiling: f64,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, query: impl Into<String>, ceiling: f64) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            ceiling,
        }
    }
}

/// Outcome of fetching one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sample {
    /// The backend produced a value. Non-finite values serialize as the
    /// strings `"NaN"`, `"+Inf"` and `"-Inf"`.
    Value(#[serde(with = "float_repr")] f64),
    /// The fetch failed; the reason is kept for the report
    Failed(String),
}

impl Sample {
    pub fn is_failed(&self) -> bool {
        matches!(self, Sample::Failed(_))
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Value(v) => write!(f, "{}", v),
            Sample::Failed(reason) => write!(f, "FAILED({})", reason),
        }
    }
}

/// JSON has no NaN or infinity, so those go through as Prometheus-style strings
mod float_repr {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("+Inf")
        } else {
            serializer.serialize_str("-Inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "+Inf" => Ok(f64::INFINITY),
                "-Inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, NaN, +Inf or -Inf",
                )),
            },
        }
    }
}

/// One metric's sample within a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub name: String,
    pub ceiling: f64,
    pub sample: Sample,
}

impl MetricReading {
    /// Failed fetches and NaN never count as within ceiling.
    pub fn within_ceiling(&self) -> bool {
        match self.sample {
            Sample::Value(v) => v <= self.ceiling,
            Sample::Failed(_) => false,
        }
    }
}

impl fmt::Display for MetricReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.sample)
    }
}

/// Readings gathered in one tick, in configuration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub timestamp: DateTime<Utc>,
    pub readings: Vec<MetricReading>,
}

impl Batch {
    pub fn within_ceiling(&self) -> bool {
        self.readings.iter().all(MetricReading::within_ceiling)
    }

    /// Names of readings above their ceiling, in configuration order
    pub fn breaches(&self) -> Vec<String> {
        self.readings
            .iter()
            .filter(|r| !r.within_ceiling())
            .map(|r| r.name.clone())
            .collect()
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        for (i, reading) in self.readings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", reading)?;
        }
        write!(f, "]")
    }
}

/// Why a run stopped ticking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StopReason {
    /// The test duration elapsed
    Deadline,
    /// One or more metrics exceeded their ceiling (or could not be fetched)
    Breach { metrics: Vec<String> },
    /// The operator interrupted the run
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Deadline => write!(f, "deadline reached"),
            StopReason::Breach { metrics } => {
                write!(f, "ceiling breached by {}", metrics.join(", "))
            }
            StopReason::Interrupted => write!(f, "interrupted"),
        }
    }
}
