//! End-to-end run scenarios for the run controller.
//!
//! All tests run on a paused Tokio clock, so speed-scaled waits resolve
//! deterministically and wall-clock assertions are exact to the poll.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aquaflow_core::config::AquaflowConfig;
use aquaflow_core::controller::{RunController, RunOutcome};
use aquaflow_core::sink::FrameSink;
use aquaflow_types::{
    ConcentrationSample, EngineFrame, LogEntry, LogLevel, RunId, RunPhase, SpeedMultiplier,
    Verdict,
};
use rust_decimal::Decimal;
use tokio::time::Instant;

/// Sink that keeps everything it receives.
#[derive(Default)]
struct RecordingSink {
    frames: Mutex<Vec<EngineFrame>>,
    samples: Mutex<Vec<(RunId, ConcentrationSample)>>,
    logs: Mutex<Vec<LogEntry>>,
}

impl RecordingSink {
    fn sample_count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    fn warnings(&self) -> Vec<String> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == LogLevel::Warning)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl FrameSink for RecordingSink {
    fn on_frame(&self, frame: &EngineFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }

    fn on_sample(&self, run_id: RunId, sample: &ConcentrationSample) {
        self.samples.lock().unwrap().push((run_id, *sample));
    }

    fn on_log(&self, entry: &LogEntry) {
        self.logs.lock().unwrap().push(entry.clone());
    }
}

fn make_controller() -> (RunController, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let controller =
        RunController::from_config(&AquaflowConfig::default(), Arc::clone(&sink) as Arc<dyn FrameSink>)
            .unwrap();
    (controller, sink)
}

async fn run_once(controller: &RunController) -> RunOutcome {
    controller.start().await.unwrap().outcome().await
}

#[tokio::test(start_paused = true)]
async fn full_run_at_speed_one_reaches_fresh_target() {
    let (controller, sink) = make_controller();
    let started = Instant::now();

    let outcome = run_once(&controller).await;

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            verdict: Verdict::Approved,
            final_ppm: 0.82
        }
    );
    let wall = started.elapsed();
    assert!(wall >= Duration::from_secs(10) && wall < Duration::from_millis(10_200), "{wall:?}");

    let samples = controller.samples().await;
    let last = samples.last().unwrap();
    assert_eq!(last.ppm, 0.82);
    assert_eq!(last.seconds, 10.0);
    assert_eq!(samples.first().map(|s| s.ppm), Some(50.0));
    assert!(samples.windows(2).all(|w| w[0].seconds <= w[1].seconds));
    assert_eq!(sink.sample_count(), samples.len());

    let frame = controller.snapshot().await;
    assert_eq!(frame.phase, RunPhase::Completed);
    assert_eq!(frame.readings.remaining_seconds, 0);
    assert_eq!(frame.readings.progress, 1.0);
    assert_eq!(frame.readings.verdict, Some(Verdict::Approved));
    assert_eq!(frame.readings.ph, 6.0);
    assert_eq!(frame.filter.uses_since_regeneration, 1);
    assert_eq!(frame.stats.total_volume_liters, 1000);
    assert_eq!(frame.stats.total_cost, Decimal::new(1250, 2));
    assert_eq!(frame.stats.completed_runs, 1);

    let newest = controller.log_entries(1).await;
    assert_eq!(newest.first().map(|e| e.level), Some(LogLevel::Success));
}

#[tokio::test(start_paused = true)]
async fn filter_degrades_after_three_runs_and_regenerates() {
    let (controller, sink) = make_controller();

    for expected_uses in 1..=3 {
        let outcome = run_once(&controller).await;
        assert!(matches!(
            outcome,
            RunOutcome::Completed { final_ppm, .. } if final_ppm == 0.82
        ));
        let frame = controller.snapshot().await;
        assert_eq!(frame.filter.uses_since_regeneration, expected_uses);
    }
    assert!(controller.snapshot().await.filter.degraded);
    assert!(sink.warnings().is_empty());

    let outcome = run_once(&controller).await;
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            verdict: Verdict::Rejected,
            final_ppm: 1.8
        }
    );
    assert_eq!(controller.samples().await.last().map(|s| s.ppm), Some(1.8));
    let warnings = sink.warnings();
    assert!(warnings.iter().any(|m| m.contains("worn")), "{warnings:?}");
    assert_eq!(controller.snapshot().await.filter.uses_since_regeneration, 4);

    controller.regenerate_filter().await;
    let frame = controller.snapshot().await;
    assert_eq!(frame.filter.uses_since_regeneration, 0);
    assert!(!frame.filter.degraded);

    let outcome = run_once(&controller).await;
    assert!(matches!(
        outcome,
        RunOutcome::Completed { verdict: Verdict::Approved, final_ppm } if final_ppm == 0.82
    ));
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_run_freezes_samples_and_keeps_totals() {
    let (controller, sink) = make_controller();
    let handle = controller.start().await.unwrap();
    let run_id = handle.run_id;

    tokio::time::sleep(Duration::from_millis(3050)).await;
    assert!(controller.phase().await.is_running());
    assert!(!controller.samples().await.is_empty());

    let newer = controller.cancel().await;
    assert!(newer > run_id);
    let frozen = sink.sample_count();

    assert_eq!(handle.outcome().await, RunOutcome::Cancelled);
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(sink.sample_count(), frozen);
    assert!(controller.samples().await.is_empty());

    let frame = controller.snapshot().await;
    assert_eq!(frame.phase, RunPhase::Idle);
    assert_eq!(frame.run_id, newer);
    assert_eq!(frame.readings.concentration_ppm, 50.0);
    assert_eq!(frame.readings.remaining_seconds, 10);
    assert!(frame.readings.stage.is_none());
    assert_eq!(frame.filter.uses_since_regeneration, 0);
    assert_eq!(frame.stats.completed_runs, 0);
}

#[tokio::test(start_paused = true)]
async fn reset_after_completion_preserves_cumulative_stats() {
    let (controller, _sink) = make_controller();
    run_once(&controller).await;

    controller.reset().await;

    let frame = controller.snapshot().await;
    assert_eq!(frame.phase, RunPhase::Idle);
    assert_eq!(frame.stats.completed_runs, 1);
    assert_eq!(frame.stats.total_volume_liters, 1000);
    assert_eq!(frame.filter.uses_since_regeneration, 1);
    assert!(controller.samples().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn double_start_mints_one_identity() {
    let (controller, _sink) = make_controller();
    let before = controller.current_run().await;

    let first = controller.start().await;
    let second = controller.start().await;

    assert!(second.is_none());
    let first = first.unwrap();
    assert!(first.run_id > before);
    assert_eq!(controller.current_run().await, first.run_id);

    first.outcome().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.snapshot().await.stats.completed_runs, 1);
}

#[tokio::test(start_paused = true)]
async fn identities_strictly_increase_across_commands() {
    let (controller, _sink) = make_controller();
    let a = controller.start().await.unwrap().run_id;
    let b = controller.cancel().await;
    let c = controller.start().await.unwrap().run_id;
    let d = controller.reset().await;
    assert!(a < b && b < c && c < d);
}

#[tokio::test(start_paused = true)]
async fn speed_change_mid_stage_keeps_simulated_budget() {
    let (controller, _sink) = make_controller();
    let started = Instant::now();
    let handle = controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(550)).await;
    controller.set_speed(SpeedMultiplier::X100).await;

    let outcome = handle.outcome().await;
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    // The 9.5 s left at 1x would take 9.5 s of wall clock. At 100x one
    // 10 s quantum covers it, spilling across every remaining stage.
    let wall = started.elapsed();
    assert!(wall >= Duration::from_millis(600) && wall < Duration::from_millis(700), "{wall:?}");

    let samples = controller.samples().await;
    assert_eq!(samples.last().map(|s| s.seconds), Some(10.0));
    assert_eq!(controller.stages().total_nominal(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn fastest_speed_finishes_a_run_in_one_poll() {
    let (controller, _sink) = make_controller();
    controller.set_speed(SpeedMultiplier::X1000).await;
    let started = Instant::now();

    let outcome = run_once(&controller).await;

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            verdict: Verdict::Approved,
            final_ppm: 0.82
        }
    );
    let wall = started.elapsed();
    assert!(wall >= Duration::from_millis(100) && wall < Duration::from_millis(110), "{wall:?}");

    // Every stage still lands on its end value.
    let samples = controller.samples().await;
    assert_eq!(samples.len(), 6);
    assert_eq!(
        samples.iter().map(|s| s.seconds).collect::<Vec<_>>(),
        vec![1.5, 2.5, 4.5, 5.5, 8.0, 10.0]
    );
    assert_eq!(controller.snapshot().await.readings.ph, 6.0);
}

#[tokio::test(start_paused = true)]
async fn speed_change_rescales_pending_transition() {
    let (controller, _sink) = make_controller();
    let _handle = controller.start().await.unwrap();

    // Intake is 1500 ms; after five polls a third of it has elapsed.
    tokio::time::sleep(Duration::from_millis(550)).await;
    let before = controller.snapshot().await.readings.transition.unwrap();
    assert!((before.fraction - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(before.remaining_wall_ms, 1000);

    let speed = controller.cycle_speed().await;
    assert_eq!(speed, SpeedMultiplier::X10);

    let after = controller.snapshot().await.readings.transition.unwrap();
    assert!((95..=100).contains(&after.remaining_wall_ms), "{after:?}");
    assert_eq!(after.fraction, before.fraction);
}

#[tokio::test(start_paused = true)]
async fn regenerate_is_valid_while_running() {
    let (controller, _sink) = make_controller();
    for _ in 0..3 {
        run_once(&controller).await;
    }
    let handle = controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    controller.regenerate_filter().await;

    // Adsorption has not started yet, so it sees the fresh filter.
    let outcome = handle.outcome().await;
    assert!(matches!(
        outcome,
        RunOutcome::Completed { verdict: Verdict::Approved, final_ppm } if final_ppm == 0.82
    ));
    assert_eq!(controller.snapshot().await.filter.uses_since_regeneration, 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_reaches_zero_with_final_stage() {
    let (controller, sink) = make_controller();
    run_once(&controller).await;

    let frames = sink.frames.lock().unwrap().clone();
    assert!(frames
        .iter()
        .filter(|f| f.readings.remaining_seconds == 0)
        .all(|f| f.phase == RunPhase::Completed));
    assert_eq!(frames.last().map(|f| f.readings.remaining_seconds), Some(0));
    let counted: Vec<u64> = frames.iter().map(|f| f.readings.remaining_seconds).collect();
    assert!(counted.windows(2).all(|w| w[1] <= w[0]), "{counted:?}");
}

/// Snapshot `(phase, remaining_seconds)` halfway between polls until the
/// run completes.
async fn countdown_trace(controller: &RunController) -> Vec<(RunPhase, u64)> {
    let _handle = controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut trace = Vec::new();
    loop {
        let frame = controller.snapshot().await;
        trace.push((frame.phase, frame.readings.remaining_seconds));
        if frame.phase == RunPhase::Completed {
            return trace;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn assert_zero_only_on_completion(trace: &[(RunPhase, u64)]) {
    for (phase, remaining) in trace {
        assert_eq!(*remaining == 0, *phase == RunPhase::Completed, "{trace:?}");
    }
    assert!(trace.windows(2).all(|w| w[1].1 <= w[0].1), "{trace:?}");
}

#[tokio::test(start_paused = true)]
async fn countdown_at_ten_times_holds_one_until_completion() {
    let (controller, _sink) = make_controller();
    controller.set_speed(SpeedMultiplier::X10).await;

    let trace = countdown_trace(&controller).await;

    assert_zero_only_on_completion(&trace);
    // Polls every 100 ms credit one simulated second; the run ends at 1 s.
    assert_eq!(trace.len(), 11);
    assert_eq!(trace.first().map(|t| t.1), Some(10));
    assert_eq!(trace.get(9), Some(&(RunPhase::Running { stage_index: 5 }, 1)));
    assert_eq!(trace.last(), Some(&(RunPhase::Completed, 0)));
}

#[tokio::test(start_paused = true)]
async fn countdown_at_fastest_speed_reaches_zero_with_the_run() {
    let (controller, sink) = make_controller();
    controller.set_speed(SpeedMultiplier::X1000).await;

    let trace = countdown_trace(&controller).await;

    assert_zero_only_on_completion(&trace);
    assert_eq!(
        trace,
        vec![
            (RunPhase::Running { stage_index: 0 }, 10),
            (RunPhase::Completed, 0)
        ]
    );
    assert!(sink
        .frames
        .lock()
        .unwrap()
        .iter()
        .filter(|f| f.phase.is_running())
        .all(|f| f.readings.remaining_seconds >= 1));
}
