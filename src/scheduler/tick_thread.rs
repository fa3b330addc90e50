//! Background thread driving periodic adaptation ticks.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::SharedEngine;
use crate::environment::adaptation::TickReport;
use crate::environment::conditions::EnvironmentalConditions;

use super::commands::{SchedulerCommand, SchedulerState};

/// Shortest tick interval the thread will wait between ticks
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Handle for controlling the adaptation thread
pub struct AdaptationScheduler {
    /// Thread handle
    thread: Option<JoinHandle<()>>,
    /// Channel to send commands to the thread
    command_tx: Sender<SchedulerCommand>,
    /// Channel to receive tick reports from the thread
    report_rx: Receiver<TickReport>,
    /// Current state
    pub state: SchedulerState,
}

impl AdaptationScheduler {
    /// Spawn a scheduler ticking at the engine's configured interval
    pub fn spawn(engine: SharedEngine, conditions: EnvironmentalConditions) -> Self {
        let interval = Duration::from_millis(engine.read().config().adaptation.tick_interval_ms);
        Self::spawn_with_interval(engine, conditions, interval)
    }

    /// Spawn a scheduler with an explicit tick interval (at least 1 ms)
    pub fn spawn_with_interval(
        engine: SharedEngine,
        conditions: EnvironmentalConditions,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(MIN_TICK_INTERVAL);
        let (command_tx, command_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        let thread = thread::spawn(move || {
            run_scheduler(engine, conditions, interval, command_rx, report_tx);
        });

        Self {
            thread: Some(thread),
            command_tx,
            report_rx,
            state: SchedulerState::Running,
        }
    }

    /// Send a command to the thread
    pub fn send(&mut self, command: SchedulerCommand) {
        match &command {
            SchedulerCommand::Pause => self.state = SchedulerState::Paused,
            SchedulerCommand::Resume => self.state = SchedulerState::Running,
            SchedulerCommand::Shutdown => self.state = SchedulerState::Stopped,
            _ => {}
        }
        let _ = self.command_tx.send(command);
    }

    pub fn pause(&mut self) {
        self.send(SchedulerCommand::Pause);
    }

    pub fn resume(&mut self) {
        self.send(SchedulerCommand::Resume);
    }

    pub fn update_conditions(&mut self, conditions: EnvironmentalConditions) {
        self.send(SchedulerCommand::UpdateConditions(conditions));
    }

    pub fn tick_now(&mut self) {
        self.send(SchedulerCommand::TickNow);
    }

    /// Try to receive the latest report (non-blocking)
    pub fn try_recv_report(&self) -> Option<TickReport> {
        let mut latest = None;
        // Drain all available reports, keep only the latest
        loop {
            match self.report_rx.try_recv() {
                Ok(report) => latest = Some(report),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Wait for the next report
    pub fn recv_report_timeout(&self, timeout: Duration) -> Option<TickReport> {
        self.report_rx.recv_timeout(timeout).ok()
    }

    /// Check if the scheduler is ticking
    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(&mut self) {
        if self.thread.is_none() {
            return;
        }
        self.send(SchedulerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AdaptationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Main scheduler loop running in separate thread
fn run_scheduler(
    engine: SharedEngine,
    mut conditions: EnvironmentalConditions,
    interval: Duration,
    command_rx: Receiver<SchedulerCommand>,
    report_tx: Sender<TickReport>,
) {
    let mut state = SchedulerState::Running;
    let mut last_tick = Instant::now();
    let mut next_tick = last_tick + interval;

    log::info!("Adaptation scheduler started: interval={:?}", interval);

    let tick = |conditions: &EnvironmentalConditions, last_tick: &mut Instant| {
        let elapsed = last_tick.elapsed().as_secs_f32();
        *last_tick = Instant::now();
        // Write lock: never overlaps a breeding call
        let report = engine.write().process_adaptation_tick(conditions, elapsed);
        if !report.adapted.is_empty() {
            log::debug!("Tick {}: {} genotypes adapted", report.tick, report.adapted.len());
        }
        let _ = report_tx.send(report);
    };

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match command_rx.recv_timeout(timeout) {
            Ok(cmd) => match cmd {
                SchedulerCommand::Pause => state = SchedulerState::Paused,
                SchedulerCommand::Resume => {
                    if state != SchedulerState::Running {
                        // Paused time does not count as exposure
                        last_tick = Instant::now();
                        next_tick = last_tick + interval;
                    }
                    state = SchedulerState::Running;
                }
                SchedulerCommand::UpdateConditions(new_conditions) => {
                    log::debug!("Scheduler conditions updated: {:?}", new_conditions);
                    conditions = new_conditions;
                }
                SchedulerCommand::TickNow => tick(&conditions, &mut last_tick),
                SchedulerCommand::Shutdown => break,
            },
            Err(RecvTimeoutError::Timeout) => {
                if state == SchedulerState::Running {
                    tick(&conditions, &mut last_tick);
                }
                next_tick = Instant::now() + interval;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("Adaptation scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::GeneticsEngine;
    use crate::genetics::genotype::StrainProfile;

    fn create_shared_engine() -> SharedEngine {
        let mut engine = GeneticsEngine::new_with_seed(Config::default(), 7);
        engine.init();
        engine.create_founder(&StrainProfile::strain_a()).unwrap();
        engine.into_shared()
    }

    #[test]
    fn test_tick_now_while_paused() {
        let engine = create_shared_engine();
        let mut scheduler = AdaptationScheduler::spawn_with_interval(
            engine.clone(),
            EnvironmentalConditions::default(),
            Duration::from_secs(3600),
        );

        scheduler.pause();
        assert!(!scheduler.is_running());
        scheduler.tick_now();

        let report = scheduler.recv_report_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(engine.read().tick_count(), 1);

        scheduler.shutdown();
        assert_eq!(scheduler.state, SchedulerState::Stopped);
    }

    #[test]
    fn test_periodic_ticks_and_shutdown() {
        let engine = create_shared_engine();
        let mut scheduler = AdaptationScheduler::spawn_with_interval(
            engine.clone(),
            EnvironmentalConditions::new(35.0, 55.0, 1500.0, 400.0),
            Duration::from_millis(5),
        );

        assert!(scheduler.recv_report_timeout(Duration::from_secs(5)).is_some());
        assert!(scheduler.recv_report_timeout(Duration::from_secs(5)).is_some());
        scheduler.shutdown();

        let ticks = engine.read().tick_count();
        assert!(ticks >= 2);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.read().tick_count(), ticks);
    }

    #[test]
    fn test_zero_interval_config_still_ticks_and_stops() {
        let mut config = Config::default();
        config.adaptation.tick_interval_ms = 0;
        let mut engine = GeneticsEngine::new_with_seed(config, 8);
        engine.create_founder(&StrainProfile::strain_a()).unwrap();
        let engine = engine.into_shared();

        let start = Instant::now();
        let mut scheduler = AdaptationScheduler::spawn(engine.clone(), EnvironmentalConditions::default());
        for _ in 0..3 {
            assert!(scheduler.recv_report_timeout(Duration::from_secs(5)).is_some());
        }
        scheduler.shutdown();

        // At most one tick per millisecond
        let ticks = engine.read().tick_count();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        assert!(ticks >= 3);
        assert!(ticks <= elapsed_ms + 2);
    }

    #[test]
    fn test_drop_stops_thread() {
        let engine = create_shared_engine();
        {
            let _scheduler = AdaptationScheduler::spawn_with_interval(
                engine.clone(),
                EnvironmentalConditions::default(),
                Duration::from_millis(5),
            );
        }
        let ticks = engine.read().tick_count();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.read().tick_count(), ticks);
    }
}
