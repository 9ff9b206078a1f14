//! Reporting: rule-based insights, terminal text, markdown report.

use serde::Serialize;

use crate::domain::{CanonicalField, Metric};
use crate::metrics::SeriesSummary;
use crate::normalize::NormalizeReport;

pub mod format;
pub mod markdown;

pub use format::*;
pub use markdown::write_markdown_report;

/// Coefficient of variation (percent) above which prices count as volatile.
pub const HIGH_VOLATILITY_PCT: f64 = 10.0;
/// Pearson r above which feed cost is said to drive market price.
pub const STRONG_POSITIVE_R: f64 = 0.5;
/// Pearson r below which the relationship is called negative.
pub const NEGATIVE_R: f64 = -0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub level: InsightLevel,
    pub message: String,
}

impl Insight {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: InsightLevel::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: InsightLevel::Warning,
            message: message.into(),
        }
    }
}

/// Threshold rules over the headline KPIs, plus one data-quality note per
/// substituted field.
pub fn build_insights(actual: &SeriesSummary, correlation: &Metric, report: &NormalizeReport) -> Vec<Insight> {
    let mut out = Vec::new();

    if let Ok(vol) = actual.volatility {
        if vol > HIGH_VOLATILITY_PCT {
            out.push(Insight::warning(format!(
                "High price volatility ({vol:.2}% CV > {HIGH_VOLATILITY_PCT:.0}%): watch pricing and stock levels."
            )));
        } else {
            out.push(Insight::info(format!("Low price volatility ({vol:.2}% CV): prices are stable.")));
        }
    }

    if let Ok(r) = *correlation {
        if r > STRONG_POSITIVE_R {
            out.push(Insight::info(format!(
                "Feed price moves strongly with market price (r = {r:.3})."
            )));
        } else if r < NEGATIVE_R {
            out.push(Insight::info(format!("Feed price moves against market price (r = {r:.3}).")));
        } else {
            out.push(Insight::info(format!(
                "No clear relationship between feed and market price (r = {r:.3})."
            )));
        }
    }

    for field in report.substituted_fields() {
        let note = match field {
            CanonicalField::ActualPrice => " Actual-price KPIs and accuracy describe the forecast, not the market.",
            CanonicalField::Province => " Province breakdowns are not real geography.",
            _ => "",
        };
        out.push(Insight::warning(format!(
            "`{field}` is {}.{note}",
            report.provenance(field)
        )));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::{Provenance, Unavailable};

    fn summary(volatility: Metric) -> SeriesSummary {
        SeriesSummary {
            volatility,
            ..SeriesSummary::unavailable(CanonicalField::ActualPrice, Unavailable::ZeroMean)
        }
    }

    fn report(provenance: &[(CanonicalField, Provenance)]) -> NormalizeReport {
        NormalizeReport {
            rows: 0,
            provenance: provenance.iter().cloned().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn volatility_threshold_picks_warning() {
        let high = build_insights(&summary(Ok(12.5)), &Err(Unavailable::ZeroVariance), &report(&[]));
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].level, InsightLevel::Warning);

        let low = build_insights(&summary(Ok(10.0)), &Err(Unavailable::ZeroVariance), &report(&[]));
        assert_eq!(low[0].level, InsightLevel::Info);
        assert!(low[0].message.contains("stable"));
    }

    #[test]
    fn correlation_bands() {
        let none = Err(Unavailable::ZeroMean);
        let text = |r: f64| build_insights(&summary(none), &Ok(r), &report(&[]))[0].message.clone();
        assert!(text(0.8).contains("strongly"));
        assert!(text(-0.5).contains("against"));
        assert!(text(0.5).contains("No clear"));
        assert!(text(-0.3).contains("No clear"));
    }

    #[test]
    fn unavailable_metrics_produce_no_threshold_insight() {
        let out = build_insights(&summary(Err(Unavailable::ZeroMean)), &Err(Unavailable::ZeroMean), &report(&[]));
        assert!(out.is_empty());
    }

    #[test]
    fn substituted_fields_are_called_out() {
        let rep = report(&[(
            CanonicalField::ActualPrice,
            Provenance::Backfilled {
                rule: "predicted_price × 0.98".to_string(),
            },
        )]);
        let out = build_insights(&summary(Err(Unavailable::ZeroMean)), &Err(Unavailable::ZeroMean), &rep);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].level, InsightLevel::Warning);
        assert!(out[0].message.contains("BACKFILLED"));
        assert!(out[0].message.contains("actual_price"));
    }
}
