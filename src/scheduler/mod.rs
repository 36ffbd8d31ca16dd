//! Fixed-cadence cycle driver
//!
//! Runs one immediate cycle at startup, then fires on absolute interval
//! boundaries until the stop signal flips. Cycles are serialized: a cycle
//! (including its notification delivery) completes before the next one
//! starts, and an overrunning cycle skips the ticks it missed instead of
//! bursting to catch up.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// One unit of work per tick.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self, seq: u64);
}

/// Phase of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    RunningCycle,
    Sleeping,
}

/// Drives a `CycleRunner` on a fixed wall-clock cadence.
pub struct Scheduler {
    interval: Duration,
    stop: watch::Receiver<bool>,
    phase: CyclePhase,
}

impl Scheduler {
    pub fn new(interval: Duration, stop: watch::Receiver<bool>) -> Self {
        Self {
            interval,
            stop,
            phase: CyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Run until the stop signal flips. The first tick fires immediately;
    /// an in-flight cycle is always allowed to finish.
    pub async fn run(&mut self, runner: &dyn CycleRunner) {
        let mut ticks = interval_at(Instant::now(), self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq = 0u64;

        loop {
            self.phase = CyclePhase::Sleeping;
            tokio::select! {
                _ = ticks.tick() => {}
                _ = stopped(&mut self.stop) => break,
            }
            if *self.stop.borrow() {
                break;
            }

            self.phase = CyclePhase::RunningCycle;
            tracing::debug!(seq, "cycle start");
            runner.run_cycle(seq).await;
            tracing::debug!(seq, "cycle complete");
            seq += 1;
        }

        self.phase = CyclePhase::Idle;
        tracing::info!(cycles = seq, "scheduler stopped");
    }
}

/// Resolve once the stop flag turns true (or the sender goes away).
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingRunner {
        times: Arc<Mutex<Vec<Instant>>>,
        work: Duration,
    }

    #[async_trait]
    impl CycleRunner for RecordingRunner {
        async fn run_cycle(&self, _seq: u64) {
            self.times.lock().unwrap().push(Instant::now());
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
        }
    }

    fn spawn_scheduler(
        interval: Duration,
        work: Duration,
    ) -> (
        Arc<Mutex<Vec<Instant>>>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<Scheduler>,
    ) {
        let times = Arc::new(Mutex::new(Vec::new()));
        let runner = RecordingRunner {
            times: times.clone(),
            work,
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut scheduler = Scheduler::new(interval, stop_rx);
        let handle = tokio::spawn(async move {
            scheduler.run(&runner).await;
            scheduler
        });
        (times, stop_tx, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_cycle_then_fixed_spacing() {
        let interval = Duration::from_secs(300);
        let start = Instant::now();
        let (times, stop_tx, handle) = spawn_scheduler(interval, Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(601)).await;
        stop_tx.send(true).unwrap();
        let scheduler = handle.await.unwrap();

        assert_eq!(scheduler.phase(), CyclePhase::Idle);
        let times = times.lock().unwrap();
        assert_eq!(times.len(), 3);
        // Startup cycle fires right away
        assert!(times[0] - start < Duration::from_secs(1));
        for window in times.windows(2) {
            let spacing = window[1] - window[0];
            assert!(spacing >= interval);
            assert!(spacing < interval + Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycle_skips_missed_ticks() {
        let interval = Duration::from_secs(300);
        // Each cycle takes 1.5 intervals, so every other tick is skipped
        let (times, stop_tx, handle) = spawn_scheduler(interval, Duration::from_secs(450));

        tokio::time::sleep(Duration::from_secs(700)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        let times = times.lock().unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1] - times[0], Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_sleep() {
        let interval = Duration::from_secs(300);
        let start = Instant::now();
        let (times, stop_tx, handle) = spawn_scheduler(interval, Duration::ZERO);

        // Let the startup cycle run, then stop mid-sleep
        tokio::time::sleep(Duration::from_secs(10)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(start.elapsed() < interval);
        assert_eq!(times.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_runs_no_cycle() {
        let (times, stop_tx, handle) = spawn_scheduler(Duration::from_secs(300), Duration::ZERO);
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        // The first tick and the stop race; either zero or one startup
        // cycle is acceptable, but nothing beyond it.
        assert!(times.lock().unwrap().len() <= 1);
    }
}
