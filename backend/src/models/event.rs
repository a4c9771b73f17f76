//! Session event log
//!
//! Every significant state change in a session is recorded as an [`Event`]
//! so the presentation layer can show an audit trail (which interventions
//! were applied, when entities changed stage, when the timeline looped).
//!
//! The log lives only as long as the session and is bounded: once it holds
//! `capacity` events, the oldest are discarded.
//!
//! # Example
//!
//! ```rust
//! use journey_sim_core::models::{Event, EventLog};
//!
//! let mut log = EventLog::with_capacity(2);
//! log.log(Event::ClockStarted { time_minutes: 0.0, speed: 1.0 });
//! log.log(Event::ClockPaused { time_minutes: 3.0 });
//! log.log(Event::ClockReset { time_minutes: 3.0 });
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.events_of_type("ClockStarted").len(), 0);
//! assert_eq!(log.dropped(), 1);
//! ```

use crate::models::entity::EntityStatus;
use crate::models::stage::StageStatus;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// State change recorded during a session.
///
/// Every event carries the timeline minute at which it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ClockStarted {
        time_minutes: f64,
        speed: f64,
    },

    ClockPaused {
        time_minutes: f64,
    },

    /// Carries the time the clock was at before it went back to 0
    ClockReset {
        time_minutes: f64,
    },

    SpeedChanged {
        time_minutes: f64,
        from: f64,
        to: f64,
    },

    /// Timeline passed the scenario end and restarted at 0
    TimelineWrapped {
        time_minutes: f64,
    },

    /// Timeline reached the end in stop-at-end mode
    TimelineFinished {
        time_minutes: f64,
    },

    EntityStageChanged {
        time_minutes: f64,
        entity_id: String,
        from_stage: usize,
        to_stage: usize,
    },

    EntityStatusChanged {
        time_minutes: f64,
        entity_id: String,
        from: EntityStatus,
        to: EntityStatus,
    },

    StageStatusChanged {
        time_minutes: f64,
        stage_id: String,
        from: StageStatus,
        to: StageStatus,
    },

    InterventionApplied {
        time_minutes: f64,
        stage_id: String,
        intervention_id: String,
        confidence_percent: f64,
    },
}

impl Event {
    pub fn time_minutes(&self) -> f64 {
        match self {
            Event::ClockStarted { time_minutes, .. }
            | Event::ClockPaused { time_minutes }
            | Event::ClockReset { time_minutes }
            | Event::SpeedChanged { time_minutes, .. }
            | Event::TimelineWrapped { time_minutes }
            | Event::TimelineFinished { time_minutes }
            | Event::EntityStageChanged { time_minutes, .. }
            | Event::EntityStatusChanged { time_minutes, .. }
            | Event::StageStatusChanged { time_minutes, .. }
            | Event::InterventionApplied { time_minutes, .. } => *time_minutes,
        }
    }

    /// Short name of the event variant
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ClockStarted { .. } => "ClockStarted",
            Event::ClockPaused { .. } => "ClockPaused",
            Event::ClockReset { .. } => "ClockReset",
            Event::SpeedChanged { .. } => "SpeedChanged",
            Event::TimelineWrapped { .. } => "TimelineWrapped",
            Event::TimelineFinished { .. } => "TimelineFinished",
            Event::EntityStageChanged { .. } => "EntityStageChanged",
            Event::EntityStatusChanged { .. } => "EntityStatusChanged",
            Event::StageStatusChanged { .. } => "StageStatusChanged",
            Event::InterventionApplied { .. } => "InterventionApplied",
        }
    }

    /// Entity this event concerns, if any
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Event::EntityStageChanged { entity_id, .. }
            | Event::EntityStatusChanged { entity_id, .. } => Some(entity_id),
            _ => None,
        }
    }

    /// Stage this event concerns, if any
    pub fn stage_id(&self) -> Option<&str> {
        match self {
            Event::StageStatusChanged { stage_id, .. }
            | Event::InterventionApplied { stage_id, .. } => Some(stage_id),
            _ => None,
        }
    }
}

pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Bounded, ordered log of session events
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
    dropped: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    pub fn log(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events discarded because the log was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Owned copy of all retained events, oldest first
    pub fn to_vec(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_entity(&self, entity_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.entity_id() == Some(entity_id))
            .collect()
    }

    pub fn events_for_stage(&self, stage_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.stage_id() == Some(stage_id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}
