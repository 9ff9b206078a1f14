//! KPI scalars over one numeric column.

use serde::Serialize;

use crate::domain::{CanonicalField, CanonicalRecord, Metric, Unavailable};
use crate::math;

/// Mean/min/max/volatility for one field over a record set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub field: CanonicalField,
    /// Non-null values seen.
    pub count: usize,
    pub mean: Metric,
    pub min: Metric,
    pub max: Metric,
    /// Sample standard deviation.
    pub stddev: Metric,
    /// Coefficient of variation in percent: `stddev / mean × 100`.
    pub volatility: Metric,
}

impl SeriesSummary {
    /// Every scalar unavailable for the same reason.
    pub fn unavailable(field: CanonicalField, reason: Unavailable) -> Self {
        Self {
            field,
            count: 0,
            mean: Err(reason),
            min: Err(reason),
            max: Err(reason),
            stddev: Err(reason),
            volatility: Err(reason),
        }
    }
}

/// Non-null values of a numeric field, in record order.
pub fn values(records: &[CanonicalRecord], field: CanonicalField) -> Vec<f64> {
    records.iter().filter_map(|r| r.numeric(field)).collect()
}

pub fn summarize(records: &[CanonicalRecord], field: CanonicalField) -> SeriesSummary {
    let xs = values(records, field);
    if xs.is_empty() {
        return SeriesSummary::unavailable(field, Unavailable::NoValues(field));
    }

    let too_few = Unavailable::TooFewValues {
        needed: 2,
        found: xs.len(),
    };
    let no_values = Unavailable::NoValues(field);

    SeriesSummary {
        field,
        count: xs.len(),
        mean: math::mean(&xs).ok_or(no_values),
        min: math::min(&xs).ok_or(no_values),
        max: math::max(&xs).ok_or(no_values),
        stddev: math::sample_std(&xs).ok_or(too_few),
        volatility: volatility(&xs),
    }
}

/// `stddev / mean × 100`; unavailable for a zero mean or fewer than two values.
pub fn volatility(xs: &[f64]) -> Metric {
    let mean = math::mean(xs).ok_or(Unavailable::TooFewValues {
        needed: 2,
        found: 0,
    })?;
    if mean == 0.0 {
        return Err(Unavailable::ZeroMean);
    }
    let sd = math::sample_std(xs).ok_or(Unavailable::TooFewValues {
        needed: 2,
        found: xs.len(),
    })?;
    Ok(sd / mean * 100.0)
}

/// Serializable mirror of a `Metric`: a plain number or `null` plus a reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCell {
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl From<&Metric> for MetricCell {
    fn from(metric: &Metric) -> Self {
        match metric {
            Ok(v) => Self {
                value: Some(*v),
                unavailable: None,
            },
            Err(reason) => Self {
                value: None,
                unavailable: Some(reason.to_string()),
            },
        }
    }
}
