//! Real-time playback driver tests
//!
//! Run on a paused tokio clock, so timer ticks are deterministic: the
//! runtime jumps straight to the next timer deadline whenever every task is
//! idle.

use journey_sim_core::sample::airport_departure_scenario;
use journey_sim_core::{
    ClockState, EngineConfig, FinancialInputs, PlaybackDriver, PlaybackMode, Session,
    SimulationError,
};
use std::time::Duration;
use tokio::time::sleep;

const SECOND: Duration = Duration::from_secs(1);

fn driver_with(config: EngineConfig) -> PlaybackDriver {
    let session = Session::new(airport_departure_scenario(), config).unwrap();
    PlaybackDriver::spawn(session, SECOND)
}

fn driver() -> PlaybackDriver {
    driver_with(EngineConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_timer_advances_only_while_playing() {
    let driver = driver();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(driver.snapshot().await.unwrap().time_minutes, 0.0);

    driver.start().await.unwrap();
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(driver.snapshot().await.unwrap().time_minutes, 5.0);

    driver.pause().await.unwrap();
    sleep(Duration::from_secs(10)).await;
    let paused = driver.snapshot().await.unwrap();
    assert_eq!(paused.time_minutes, 5.0);
    assert_eq!(paused.clock_state, ClockState::Stopped);

    driver.start().await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(driver.snapshot().await.unwrap().time_minutes, 7.0);
}

#[tokio::test(start_paused = true)]
async fn test_double_start_does_not_double_tick() {
    let driver = driver();
    driver.start().await.unwrap();
    driver.start().await.unwrap();
    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(driver.snapshot().await.unwrap().time_minutes, 3.0);
}

#[tokio::test(start_paused = true)]
async fn test_speed_multiplies_each_tick() {
    let driver = driver();
    driver.set_speed(4.0).await.unwrap();
    assert!(matches!(
        driver.set_speed(3.0).await,
        Err(SimulationError::Clock(_))
    ));

    driver.start().await.unwrap();
    sleep(Duration::from_millis(3_500)).await;
    let snapshot = driver.snapshot().await.unwrap();
    assert_eq!(snapshot.speed, 4.0);
    assert_eq!(snapshot.time_minutes, 12.0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_the_timer() {
    let driver = driver();
    driver.start().await.unwrap();
    sleep(Duration::from_millis(3_500)).await;
    driver.reset().await.unwrap();
    sleep(Duration::from_secs(5)).await;

    let snapshot = driver.snapshot().await.unwrap();
    assert_eq!(snapshot.time_minutes, 0.0);
    assert_eq!(snapshot.clock_state, ClockState::Stopped);
    assert!(snapshot.entities.iter().all(|e| e.current_stage_index == 0));
}

#[tokio::test(start_paused = true)]
async fn test_intervention_between_ticks() {
    let driver = driver();
    driver.start().await.unwrap();
    sleep(Duration::from_millis(2_500)).await;

    let stage = driver
        .apply_intervention("security", "open-fast-track")
        .await
        .unwrap();
    assert_eq!(stage.metrics.wait_time_minutes, 8.0);
    assert_eq!(stage.intervention.unwrap().applied_at_minutes, 2.0);

    let report = driver.results(FinancialInputs::default()).await.unwrap();
    assert_eq!(
        report.metric("security.wait_time").unwrap().optimized_value,
        8.0
    );

    let events = driver.events().await.unwrap();
    assert!(events.iter().any(|e| e.event_type() == "InterventionApplied"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_at_end_releases_timer() {
    let driver = driver_with(EngineConfig {
        playback_mode: PlaybackMode::StopAtEnd,
        ..Default::default()
    });
    driver.set_speed(4.0).await.unwrap();
    driver.start().await.unwrap();
    sleep(Duration::from_secs(30)).await;

    let snapshot = driver.snapshot().await.unwrap();
    assert_eq!(snapshot.time_minutes, 80.0);
    assert_eq!(snapshot.clock_state, ClockState::Finished);

    // Starting again is a no-op until reset
    driver.start().await.unwrap();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(driver.snapshot().await.unwrap().time_minutes, 80.0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_hands_back_session() {
    let driver = driver();
    driver.start().await.unwrap();
    sleep(Duration::from_millis(4_500)).await;

    let session = driver.shutdown().await.unwrap();
    assert_eq!(session.time_minutes(), 4.0);
    assert_eq!(session.clock_state(), ClockState::Running);
}
