//! Tracked entities (passengers)
//!
//! An entity is described by an [`EntitySpec`] in the scenario and turned
//! into a live [`Entity`] when a session starts. Position and status fields
//! are derived by the tracker on every tick and are never set directly.

use crate::rng::SampleRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    OnTrack,
    Delayed,
    Critical,
}

fn default_pace() -> f64 {
    1.0
}

/// Static description of an entity, as provided by the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub id: String,
    pub profile: String,

    /// Timeline minute at which this entity enters the first stage
    #[serde(default)]
    pub start_offset_minutes: f64,

    /// Multiplier on nominal time; 1.0 moves exactly at baseline pace
    #[serde(default = "default_pace")]
    pub pace_factor: f64,
}

impl EntitySpec {
    pub fn new(id: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile: profile.into(),
            start_offset_minutes: 0.0,
            pace_factor: 1.0,
        }
    }

    pub fn with_offset(mut self, start_offset_minutes: f64) -> Self {
        self.start_offset_minutes = start_offset_minutes;
        self
    }

    pub fn with_pace(mut self, pace_factor: f64) -> Self {
        self.pace_factor = pace_factor;
        self
    }
}

/// Live entity state within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub profile: String,
    pub start_offset_minutes: f64,
    pub pace_factor: f64,
    pub current_stage_index: usize,
    pub elapsed_minutes_in_stage: f64,
    pub total_elapsed_minutes: f64,
    pub status: EntityStatus,
}

impl Entity {
    /// Fresh entity at stage 0, on track
    pub fn from_spec(spec: &EntitySpec) -> Self {
        Self {
            id: spec.id.clone(),
            profile: spec.profile.clone(),
            start_offset_minutes: spec.start_offset_minutes,
            pace_factor: spec.pace_factor,
            current_stage_index: 0,
            elapsed_minutes_in_stage: 0.0,
            total_elapsed_minutes: 0.0,
            status: EntityStatus::OnTrack,
        }
    }

    pub fn reset(&mut self) {
        self.current_stage_index = 0;
        self.elapsed_minutes_in_stage = 0.0;
        self.total_elapsed_minutes = 0.0;
        self.status = EntityStatus::OnTrack;
    }
}

/// One traveller profile in a generated population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMix {
    pub profile: String,
    pub weight: f64,
    /// Pace factors are drawn uniformly from this range
    pub pace_range: (f64, f64),
}

/// Seeded description of a sample population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub count: usize,
    pub seed: u64,
    /// Start offsets are drawn uniformly from [0, max_start_offset_minutes)
    #[serde(default)]
    pub max_start_offset_minutes: f64,
    pub profiles: Vec<ProfileMix>,
}

impl PopulationConfig {
    /// Generate entity specs. Deterministic for a given config.
    ///
    /// Ids are `{prefix}-{n}` with `n` starting at 1. Profiles with no
    /// positive weight are never drawn; with no usable profile at all, every
    /// entity gets the `"standard"` profile at nominal pace.
    pub fn generate(&self, prefix: &str) -> Vec<EntitySpec> {
        let mut rng = SampleRng::new(self.seed);
        let weights: Vec<f64> = self.profiles.iter().map(|p| p.weight).collect();

        (0..self.count)
            .map(|n| {
                let offset = rng.uniform(0.0, self.max_start_offset_minutes);
                let (profile, pace) = match rng.weighted_index(&weights) {
                    Some(i) => {
                        let mix = &self.profiles[i];
                        (mix.profile.clone(), rng.uniform(mix.pace_range.0, mix.pace_range.1))
                    }
                    None => ("standard".to_string(), 1.0),
                };
                EntitySpec::new(format!("{}-{}", prefix, n + 1), profile)
                    .with_offset(offset)
                    .with_pace(pace)
            })
            .collect()
    }
}
