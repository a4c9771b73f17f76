//! Results aggregator
//!
//! Compares a baseline snapshot with an optimized one and rolls the
//! differences up into categorized metrics and financial results.
//!
//! # Conventions
//!
//! - `improvement_percent = (optimized - baseline) / baseline * 100`, sign
//!   preserved. A lower-is-better metric that went down has a negative
//!   improvement; the metric's [`MetricDirection`] says how to read it.
//! - A zero baseline leaves the improvement undefined (`None`) and is
//!   reported as a [`ResultsError::DivisionByZeroMetric`] issue rather than
//!   failing the aggregation.
//! - Non-finite values are reported as [`ResultsError::NonFiniteMetric`].
//! - Annual values are business inputs, not derived. They are credited only
//!   to metrics that moved in their good direction; an unchanged or worse
//!   metric carries none.

use crate::config::ResultsConfig;
use crate::orchestrator::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ResultsError {
    #[error("Metric {metric} has a zero baseline; improvement is undefined")]
    DivisionByZeroMetric { metric: String },

    #[error("Metric {metric} has a non-finite value; improvement is undefined")]
    NonFiniteMetric { metric: String },

    #[error("Snapshots belong to different scenarios ({baseline} vs {current})")]
    ScenarioMismatch { baseline: String, current: String },

    #[error("Total investment must be non-negative, got {0}")]
    NegativeInvestment(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Operational,
    Financial,
    Passenger,
    Efficiency,
    Safety,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
}

/// A baseline/optimized pair before aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPair {
    pub key: String,
    pub metric_name: String,
    pub category: MetricCategory,
    pub unit: String,
    pub direction: MetricDirection,
    pub baseline_value: f64,
    pub optimized_value: f64,
}

impl MetricPair {
    pub fn new(
        key: impl Into<String>,
        metric_name: impl Into<String>,
        category: MetricCategory,
        unit: impl Into<String>,
        direction: MetricDirection,
        baseline_value: f64,
        optimized_value: f64,
    ) -> Self {
        Self {
            key: key.into(),
            metric_name: metric_name.into(),
            category,
            unit: unit.into(),
            direction,
            baseline_value,
            optimized_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetric {
    pub key: String,
    pub category: MetricCategory,
    pub metric_name: String,
    pub baseline_value: f64,
    pub optimized_value: f64,
    pub improvement_percent: Option<f64>,
    pub unit: String,
    pub direction: MetricDirection,
    pub impact_level: ImpactLevel,
    pub annual_value: Option<f64>,
}

impl ResultMetric {
    /// Whether the change moved the metric in its good direction
    pub fn is_improvement(&self) -> bool {
        match self.direction {
            MetricDirection::HigherIsBetter => self.optimized_value > self.baseline_value,
            MetricDirection::LowerIsBetter => self.optimized_value < self.baseline_value,
        }
    }
}

/// Financial assumptions supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialInputs {
    pub total_investment: f64,

    /// Annual value per metric key
    #[serde(default)]
    pub annual_values: BTreeMap<String, f64>,

    /// Pairs the engine cannot derive from snapshots (financial, safety, ...)
    #[serde(default)]
    pub additional_metrics: Vec<MetricPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: MetricCategory,
    pub metric_count: usize,
    pub average_improvement_percent: Option<f64>,
    pub annual_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    pub metrics: Vec<ResultMetric>,
    pub total_annual_value: f64,
    /// Mean of |improvement %| over metrics with a defined improvement
    pub average_improvement_percent: Option<f64>,
    /// `None` when there is no positive annual value to pay anything back
    pub payback_months: Option<f64>,
    pub first_year_roi_percent: Option<f64>,
    pub categories: Vec<CategorySummary>,
    /// Non-fatal problems found while aggregating
    pub issues: Vec<ResultsError>,
}

impl ResultsReport {
    pub fn metric(&self, key: &str) -> Option<&ResultMetric> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

/// Signed percent change, `None` when the baseline is zero.
///
/// # Example
/// ```
/// use journey_sim_core::results::improvement_percent;
///
/// assert_eq!(improvement_percent(40.0, 30.0), Some(-25.0));
/// assert_eq!(improvement_percent(0.0, 30.0), None);
/// ```
pub fn improvement_percent(baseline: f64, optimized: f64) -> Option<f64> {
    if baseline == 0.0 || !baseline.is_finite() || !optimized.is_finite() {
        return None;
    }
    Some((optimized - baseline) / baseline * 100.0)
}

/// `investment / (annual / 12)`, `None` unless the annual value is positive
pub fn payback_months(total_investment: f64, total_annual_value: f64) -> Option<f64> {
    if total_annual_value > 0.0 {
        Some(total_investment / (total_annual_value / 12.0))
    } else {
        None
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsAggregator {
    config: ResultsConfig,
}

impl ResultsAggregator {
    pub fn new(config: ResultsConfig) -> Self {
        Self { config }
    }

    fn impact_level(&self, improvement: Option<f64>) -> ImpactLevel {
        match improvement.map(f64::abs) {
            Some(x) if x >= self.config.high_impact_threshold_percent => ImpactLevel::High,
            Some(x) if x >= self.config.medium_impact_threshold_percent => ImpactLevel::Medium,
            _ => ImpactLevel::Low,
        }
    }

    /// Compare two snapshots of the same scenario.
    ///
    /// Snapshot-derived pairs come first, followed by
    /// `inputs.additional_metrics`.
    pub fn compare(
        &self,
        baseline: &Snapshot,
        current: &Snapshot,
        inputs: &FinancialInputs,
    ) -> Result<ResultsReport, ResultsError> {
        let mut pairs = pairs_from_snapshots(baseline, current)?;
        pairs.extend(inputs.additional_metrics.iter().cloned());
        self.aggregate(&pairs, inputs)
    }

    /// Aggregate explicit pairs.
    pub fn aggregate(
        &self,
        pairs: &[MetricPair],
        inputs: &FinancialInputs,
    ) -> Result<ResultsReport, ResultsError> {
        if !(inputs.total_investment >= 0.0) {
            return Err(ResultsError::NegativeInvestment(inputs.total_investment));
        }

        let mut issues = Vec::new();
        let metrics: Vec<ResultMetric> = pairs
            .iter()
            .map(|pair| {
                let improvement = improvement_percent(pair.baseline_value, pair.optimized_value);
                let finite = pair.baseline_value.is_finite() && pair.optimized_value.is_finite();
                if !finite {
                    warn!(metric = %pair.key, "non-finite metric value, improvement undefined");
                    issues.push(ResultsError::NonFiniteMetric {
                        metric: pair.key.clone(),
                    });
                } else if improvement.is_none() {
                    warn!(metric = %pair.key, "zero baseline, improvement undefined");
                    issues.push(ResultsError::DivisionByZeroMetric {
                        metric: pair.key.clone(),
                    });
                }
                let mut metric = ResultMetric {
                    key: pair.key.clone(),
                    category: pair.category,
                    metric_name: pair.metric_name.clone(),
                    baseline_value: pair.baseline_value,
                    optimized_value: pair.optimized_value,
                    improvement_percent: improvement,
                    unit: pair.unit.clone(),
                    direction: pair.direction,
                    impact_level: self.impact_level(improvement),
                    annual_value: None,
                };
                if finite && metric.is_improvement() {
                    metric.annual_value = inputs.annual_values.get(&pair.key).copied();
                }
                metric
            })
            .collect();

        let total_annual_value: f64 = metrics.iter().filter_map(|m| m.annual_value).sum();
        let defined: Vec<f64> = metrics
            .iter()
            .filter_map(|m| m.improvement_percent.map(f64::abs))
            .collect();

        let first_year_roi_percent = if inputs.total_investment > 0.0 {
            Some(total_annual_value / inputs.total_investment * 100.0)
        } else {
            None
        };

        Ok(ResultsReport {
            categories: summarize_categories(&metrics),
            average_improvement_percent: mean(&defined),
            payback_months: payback_months(inputs.total_investment, total_annual_value),
            first_year_roi_percent,
            total_annual_value,
            metrics,
            issues,
        })
    }
}

fn summarize_categories(metrics: &[ResultMetric]) -> Vec<CategorySummary> {
    let mut grouped: BTreeMap<MetricCategory, Vec<&ResultMetric>> = BTreeMap::new();
    for metric in metrics {
        grouped.entry(metric.category).or_default().push(metric);
    }
    grouped
        .into_iter()
        .map(|(category, members)| {
            let defined: Vec<f64> = members
                .iter()
                .filter_map(|m| m.improvement_percent.map(f64::abs))
                .collect();
            CategorySummary {
                category,
                metric_count: members.len(),
                average_improvement_percent: mean(&defined),
                annual_value: members.iter().filter_map(|m| m.annual_value).sum(),
            }
        })
        .collect()
}

/// Metric pairs derived from two snapshots of the same scenario.
///
/// Per stage: wait time, throughput and efficiency. Journey-wide: total
/// wait, mean efficiency and bottleneck (minimum) throughput.
pub fn pairs_from_snapshots(
    baseline: &Snapshot,
    current: &Snapshot,
) -> Result<Vec<MetricPair>, ResultsError> {
    if baseline.scenario_fingerprint != current.scenario_fingerprint {
        return Err(ResultsError::ScenarioMismatch {
            baseline: baseline.scenario_fingerprint.clone(),
            current: current.scenario_fingerprint.clone(),
        });
    }

    use MetricCategory::*;
    use MetricDirection::*;

    let mut pairs = Vec::with_capacity(baseline.stages.len() * 3 + 3);
    for (before, after) in baseline.stages.iter().zip(current.stages.iter()) {
        let (b, a) = (&before.metrics, &after.metrics);
        pairs.push(MetricPair::new(
            format!("{}.wait_time", before.id),
            format!("{} wait time", before.name),
            Passenger,
            "min",
            LowerIsBetter,
            b.wait_time_minutes,
            a.wait_time_minutes,
        ));
        pairs.push(MetricPair::new(
            format!("{}.throughput", before.id),
            format!("{} throughput", before.name),
            Operational,
            "pax/h",
            HigherIsBetter,
            b.throughput_per_hour,
            a.throughput_per_hour,
        ));
        pairs.push(MetricPair::new(
            format!("{}.efficiency", before.id),
            format!("{} efficiency", before.name),
            Efficiency,
            "%",
            HigherIsBetter,
            b.efficiency_percent,
            a.efficiency_percent,
        ));
    }

    let total_wait = |s: &Snapshot| s.stages.iter().map(|st| st.metrics.wait_time_minutes).sum::<f64>();
    let mean_efficiency = |s: &Snapshot| {
        mean(&s.stages.iter().map(|st| st.metrics.efficiency_percent).collect::<Vec<_>>())
            .unwrap_or(0.0)
    };
    let bottleneck = |s: &Snapshot| {
        s.stages
            .iter()
            .map(|st| st.metrics.throughput_per_hour)
            .fold(f64::INFINITY, f64::min)
    };

    if !baseline.stages.is_empty() {
        pairs.push(MetricPair::new(
            "journey.total_wait_time",
            "Total journey wait time",
            Passenger,
            "min",
            LowerIsBetter,
            total_wait(baseline),
            total_wait(current),
        ));
        pairs.push(MetricPair::new(
            "journey.average_efficiency",
            "Average stage efficiency",
            Efficiency,
            "%",
            HigherIsBetter,
            mean_efficiency(baseline),
            mean_efficiency(current),
        ));
        pairs.push(MetricPair::new(
            "journey.bottleneck_throughput",
            "Bottleneck throughput",
            Operational,
            "pax/h",
            HigherIsBetter,
            bottleneck(baseline),
            bottleneck(current),
        ));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, category: MetricCategory, baseline: f64, optimized: f64) -> MetricPair {
        MetricPair::new(
            key,
            key,
            category,
            "unit",
            MetricDirection::HigherIsBetter,
            baseline,
            optimized,
        )
    }

    #[test]
    fn test_impact_levels() {
        let agg = ResultsAggregator::default();
        let report = agg
            .aggregate(
                &[
                    pair("a", MetricCategory::Operational, 100.0, 130.0),
                    pair("b", MetricCategory::Operational, 100.0, 85.0),
                    pair("c", MetricCategory::Operational, 100.0, 105.0),
                ],
                &FinancialInputs::default(),
            )
            .unwrap();
        let levels: Vec<ImpactLevel> = report.metrics.iter().map(|m| m.impact_level).collect();
        assert_eq!(
            levels,
            vec![ImpactLevel::High, ImpactLevel::Medium, ImpactLevel::Low]
        );
    }

    #[test]
    fn test_zero_baseline_is_surfaced() {
        let agg = ResultsAggregator::default();
        let report = agg
            .aggregate(
                &[
                    pair("incidents", MetricCategory::Safety, 0.0, 2.0),
                    pair("flow", MetricCategory::Operational, 50.0, 60.0),
                ],
                &FinancialInputs::default(),
            )
            .unwrap();

        assert_eq!(report.metric("incidents").unwrap().improvement_percent, None);
        assert_eq!(
            report.issues,
            vec![ResultsError::DivisionByZeroMetric {
                metric: "incidents".to_string()
            }]
        );
        // Only the defined metric counts toward the average
        assert_eq!(report.average_improvement_percent, Some(20.0));
    }

    #[test]
    fn test_no_payback_without_annual_value() {
        let agg = ResultsAggregator::default();
        let inputs = FinancialInputs {
            total_investment: 1_000.0,
            ..Default::default()
        };
        let report = agg
            .aggregate(&[pair("a", MetricCategory::Operational, 1.0, 2.0)], &inputs)
            .unwrap();
        assert_eq!(report.payback_months, None);
        assert_eq!(report.first_year_roi_percent, Some(0.0));
    }

    #[test]
    fn test_negative_investment_rejected() {
        let agg = ResultsAggregator::default();
        let inputs = FinancialInputs {
            total_investment: -1.0,
            ..Default::default()
        };
        assert_eq!(
            agg.aggregate(&[], &inputs),
            Err(ResultsError::NegativeInvestment(-1.0))
        );
    }

    #[test]
    fn test_category_summaries() {
        let agg = ResultsAggregator::default();
        let mut inputs = FinancialInputs::default();
        inputs.annual_values.insert("a".to_string(), 100.0);
        inputs.annual_values.insert("b".to_string(), 50.0);
        let report = agg
            .aggregate(
                &[
                    pair("a", MetricCategory::Financial, 10.0, 12.0),
                    pair("b", MetricCategory::Financial, 10.0, 8.0),
                    pair("c", MetricCategory::Safety, 4.0, 5.0),
                ],
                &inputs,
            )
            .unwrap();

        assert_eq!(report.categories.len(), 2);
        let financial = &report.categories[0];
        assert_eq!(financial.category, MetricCategory::Financial);
        assert_eq!(financial.metric_count, 2);
        // "b" got worse, so its annual value is not credited
        assert_eq!(financial.annual_value, 100.0);
        assert_eq!(financial.average_improvement_percent, Some(20.0));
    }

    #[test]
    fn test_non_finite_values_reported_separately() {
        let mut inputs = FinancialInputs::default();
        inputs.annual_values.insert("broken".to_string(), 100.0);
        let report = ResultsAggregator::default()
            .aggregate(
                &[
                    pair("broken", MetricCategory::Operational, 10.0, f64::INFINITY),
                    pair("nan", MetricCategory::Operational, f64::NAN, 4.0),
                ],
                &inputs,
            )
            .unwrap();

        assert_eq!(
            report.issues,
            vec![
                ResultsError::NonFiniteMetric {
                    metric: "broken".to_string()
                },
                ResultsError::NonFiniteMetric {
                    metric: "nan".to_string()
                },
            ]
        );
        assert_eq!(report.metric("broken").unwrap().annual_value, None);
        assert_eq!(report.total_annual_value, 0.0);
    }
}
