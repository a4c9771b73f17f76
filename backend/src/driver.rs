//! Real-time playback driver
//!
//! Runs a [`Session`] inside a tokio task. User commands arrive on a single
//! mpsc queue and are processed one at a time between ticks, so an
//! intervention is never applied in the middle of a tick.
//!
//! The interval timer exists only while playback is running: it is created
//! on `start`, dropped on `pause`, `reset`, when the timeline finishes, and
//! when the task ends. Every tick presents the lease it was created with; a
//! tick carrying a lease from before a pause or reset changes nothing.
//!
//! Dropping a [`PlaybackDriver`] without calling `shutdown` aborts the task.

use crate::core::time::{ClockState, TimerLease};
use crate::models::event::Event;
use crate::models::stage::Stage;
use crate::orchestrator::session::{Session, SimulationError};
use crate::orchestrator::snapshot::Snapshot;
use crate::results::{FinancialInputs, ResultsReport};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

const COMMAND_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Start(Reply<()>),
    Pause(Reply<()>),
    Reset(Reply<()>),
    SetSpeed(f64, Reply<Result<(), SimulationError>>),
    ApplyIntervention {
        stage_id: String,
        intervention_id: String,
        reply: Reply<Result<Stage, SimulationError>>,
    },
    Snapshot(Reply<Snapshot>),
    Results(FinancialInputs, Reply<Result<ResultsReport, SimulationError>>),
    Events(Reply<Vec<Event>>),
    Shutdown,
}

/// Handle to a session playing in the background
pub struct PlaybackDriver {
    commands: mpsc::Sender<Command>,
    task: Option<JoinHandle<Session>>,
}

impl PlaybackDriver {
    /// Spawn the driver task on the current tokio runtime.
    ///
    /// Each tick advances the session by `tick_interval` seconds of
    /// interval, i.e. `tick_interval.as_secs_f64() * speed` minutes.
    pub fn spawn(session: Session, tick_interval: Duration) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let task = tokio::spawn(run(session, rx, tick_interval));
        Self {
            commands,
            task: Some(task),
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SimulationError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SimulationError::DriverClosed)?;
        response.await.map_err(|_| SimulationError::DriverClosed)
    }

    pub async fn start(&self) -> Result<(), SimulationError> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<(), SimulationError> {
        self.request(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<(), SimulationError> {
        self.request(Command::Reset).await
    }

    pub async fn set_speed(&self, multiplier: f64) -> Result<(), SimulationError> {
        self.request(|reply| Command::SetSpeed(multiplier, reply))
            .await?
    }

    pub async fn apply_intervention(
        &self,
        stage_id: &str,
        intervention_id: &str,
    ) -> Result<Stage, SimulationError> {
        self.request(|reply| Command::ApplyIntervention {
            stage_id: stage_id.to_string(),
            intervention_id: intervention_id.to_string(),
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<Snapshot, SimulationError> {
        self.request(Command::Snapshot).await
    }

    /// Results of the current state against the load-time baseline
    pub async fn results(&self, inputs: FinancialInputs) -> Result<ResultsReport, SimulationError> {
        self.request(|reply| Command::Results(inputs, reply))
            .await?
    }

    pub async fn events(&self) -> Result<Vec<Event>, SimulationError> {
        self.request(Command::Events).await
    }

    /// Stop the task and hand the session back.
    pub async fn shutdown(mut self) -> Result<Session, SimulationError> {
        let task = self.task.take().ok_or(SimulationError::DriverClosed)?;
        // The task may already be gone; joining reports that.
        let _ = self.commands.send(Command::Shutdown).await;
        task.await.map_err(|_| SimulationError::DriverClosed)
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Timer that only exists while playing
struct Ticker {
    interval: Interval,
    lease: TimerLease,
}

impl Ticker {
    fn new(period: Duration, lease: TimerLease) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, lease }
    }
}

async fn next_tick(ticker: &mut Option<Ticker>) -> TimerLease {
    match ticker {
        Some(t) => {
            t.interval.tick().await;
            t.lease
        }
        None => std::future::pending().await,
    }
}

async fn run(mut session: Session, mut rx: mpsc::Receiver<Command>, period: Duration) -> Session {
    let interval_seconds = period.as_secs_f64();
    let mut ticker: Option<Ticker> = None;
    info!(?period, "playback driver running");

    loop {
        tokio::select! {
            biased;

            command = rx.recv() => {
                let Some(command) = command else { break };
                if !handle(&mut session, command, &mut ticker, period) {
                    break;
                }
            }

            lease = next_tick(&mut ticker) => {
                match session.tick_with_lease(lease, interval_seconds) {
                    Ok(result) if result.finished => ticker = None,
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "tick failed, stopping timer");
                        session.pause();
                        ticker = None;
                    }
                }
            }
        }
    }

    debug!("playback driver stopped");
    session
}

/// Process one command. Returns false on shutdown.
fn handle(session: &mut Session, command: Command, ticker: &mut Option<Ticker>, period: Duration) -> bool {
    match command {
        Command::Start(reply) => {
            let lease = session.start();
            if session.clock_state() == ClockState::Running
                && ticker.as_ref().map(|t| t.lease) != Some(lease)
            {
                *ticker = Some(Ticker::new(period, lease));
            }
            let _ = reply.send(());
        }
        Command::Pause(reply) => {
            session.pause();
            *ticker = None;
            let _ = reply.send(());
        }
        Command::Reset(reply) => {
            session.reset();
            *ticker = None;
            let _ = reply.send(());
        }
        Command::SetSpeed(multiplier, reply) => {
            let _ = reply.send(session.set_speed(multiplier));
        }
        Command::ApplyIntervention {
            stage_id,
            intervention_id,
            reply,
        } => {
            let _ = reply.send(session.apply_intervention(&stage_id, &intervention_id));
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(session.snapshot());
        }
        Command::Results(inputs, reply) => {
            let _ = reply.send(session.results_against_baseline(&inputs));
        }
        Command::Events(reply) => {
            let _ = reply.send(session.events().to_vec());
        }
        Command::Shutdown => return false,
    }
    true
}
