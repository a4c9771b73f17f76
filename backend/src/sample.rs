//! Built-in sample data
//!
//! An airport departure journey with a small intervention catalog and a
//! seeded passenger population, plus matching financial assumptions. Used
//! by the CLI when no scenario file is given, and by tests.

use crate::models::entity::{EntitySpec, PopulationConfig, ProfileMix};
use crate::models::intervention::{CatalogEntry, InterventionEffect, InterventionType};
use crate::models::scenario::Scenario;
use crate::models::stage::{Stage, StageMetrics};
use crate::results::{FinancialInputs, MetricCategory, MetricDirection, MetricPair};
use std::collections::BTreeMap;

fn metrics(throughput_per_hour: f64, wait_time_minutes: f64, efficiency_percent: f64) -> StageMetrics {
    StageMetrics {
        throughput_per_hour,
        wait_time_minutes,
        efficiency_percent,
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    stage_id: &str,
    intervention_type: InterventionType,
    description: &str,
    impact_description: &str,
    confidence_percent: f64,
    efficiency_delta_points: f64,
    wait_time_delta_minutes: f64,
    throughput_delta_percent: f64,
) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        stage_id: stage_id.to_string(),
        intervention_type,
        description: description.to_string(),
        impact_description: impact_description.to_string(),
        confidence_percent,
        effect: InterventionEffect {
            efficiency_delta_points,
            wait_time_delta_minutes,
            throughput_delta_percent,
        },
    }
}

/// Departure journey: check-in, security, passport control, lounge, boarding
pub fn airport_departure_scenario() -> Scenario {
    use InterventionType::*;

    Scenario {
        id: "airport-departure".to_string(),
        name: "Terminal 2 departure journey".to_string(),
        stages: vec![
            Stage::new("checkin", "Check-in & bag drop", 12.0, metrics(360.0, 9.0, 78.0)),
            Stage::new("security", "Security screening", 18.0, metrics(420.0, 14.0, 72.0)),
            Stage::new("immigration", "Passport control", 10.0, metrics(510.0, 8.0, 81.0)),
            Stage::new("lounge", "Airside dwell", 25.0, metrics(900.0, 2.0, 90.0)),
            Stage::new("boarding", "Gate boarding", 15.0, metrics(240.0, 11.0, 74.0)),
        ],
        total_duration_minutes: 80.0,
        available_speed_multipliers: vec![0.5, 1.0, 2.0, 4.0],
        interventions: vec![
            entry(
                "self-service-kiosks",
                "checkin",
                Automation,
                "Switch idle desks to self-service bag drop",
                "-4 min wait, +20% throughput",
                88.0,
                8.0,
                -4.0,
                20.0,
            ),
            entry(
                "open-fast-track",
                "security",
                Optimization,
                "Open fast-track lane 5 and rebalance staff",
                "-6 min wait, +25% throughput",
                92.0,
                12.0,
                -6.0,
                25.0,
            ),
            entry(
                "queue-alert",
                "security",
                Alert,
                "Alert duty manager about queue build-up",
                "-2 min wait",
                75.0,
                2.0,
                -2.0,
                0.0,
            ),
            entry(
                "egate-redeploy",
                "immigration",
                Automation,
                "Redeploy e-gates from arrivals hall",
                "-5 min wait, +30% throughput",
                85.0,
                10.0,
                -5.0,
                30.0,
            ),
            entry(
                "predictive-boarding",
                "boarding",
                Prediction,
                "Call boarding groups from predicted gate arrival",
                "-3 min wait, +6 pts efficiency",
                81.0,
                6.0,
                -3.0,
                10.0,
            ),
        ],
        entities: vec![EntitySpec::new("pax-lead", "standard")],
        population: Some(PopulationConfig {
            count: 12,
            seed: 2024,
            max_start_offset_minutes: 30.0,
            profiles: vec![
                ProfileMix {
                    profile: "business".to_string(),
                    weight: 3.0,
                    pace_range: (0.85, 1.0),
                },
                ProfileMix {
                    profile: "leisure".to_string(),
                    weight: 4.0,
                    pace_range: (0.95, 1.15),
                },
                ProfileMix {
                    profile: "family".to_string(),
                    weight: 2.0,
                    pace_range: (1.1, 1.35),
                },
                ProfileMix {
                    profile: "assisted".to_string(),
                    weight: 1.0,
                    pace_range: (1.3, 1.7),
                },
            ],
        }),
    }
}

/// Financial assumptions for the sample scenario.
///
/// Annual values total 20.1M against a 5M investment once every listed
/// metric has changed.
pub fn airport_financial_inputs() -> FinancialInputs {
    let annual_values: BTreeMap<String, f64> = [
        ("security.wait_time", 6_500_000.0),
        ("checkin.throughput", 2_400_000.0),
        ("immigration.wait_time", 3_200_000.0),
        ("boarding.efficiency", 1_600_000.0),
        ("finance.operating_cost", 4_200_000.0),
        ("safety.crowding_incidents", 2_200_000.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    FinancialInputs {
        total_investment: 5_000_000.0,
        annual_values,
        additional_metrics: vec![
            MetricPair::new(
                "finance.operating_cost",
                "Annual terminal operating cost",
                MetricCategory::Financial,
                "EUR M",
                MetricDirection::LowerIsBetter,
                12.4,
                10.1,
            ),
            MetricPair::new(
                "safety.crowding_incidents",
                "Crowding incidents per month",
                MetricCategory::Safety,
                "count",
                MetricDirection::LowerIsBetter,
                9.0,
                4.0,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_scenario_is_valid() {
        let scenario = airport_departure_scenario();
        assert_eq!(scenario.validate(), Ok(()));
        assert_eq!(scenario.entity_specs().len(), 13);
        assert_eq!(scenario.entity_specs()[0].id, "pax-lead");
    }

    #[test]
    fn test_every_stage_but_lounge_has_interventions() {
        let catalog = airport_departure_scenario().catalog();
        assert!(catalog.interventions_for("lounge").is_empty());
        assert_eq!(catalog.interventions_for("security").len(), 2);
    }
}
