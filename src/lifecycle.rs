use crate::config::{ConfigError, SimulatorConfig};
use crate::scheduler::{Scheduler, SchedulerStats, SensorFeed, BASE_TICK};
use crate::transport::{PacketSink, TransportError, TransportResult, UdpTransport};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Unblock directives are repeated since nothing acknowledges them.
pub const CLEANUP_ATTEMPTS: usize = 10;

// Drop cannot await, so its rounds block the current thread; keep them short.
const DROP_CLEANUP_PACING: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Starting,
    Running,
    CleaningUp,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Timeout,
    Interrupted,
    TransportFailure,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub reason: StopReason,
    pub elapsed_ms: u64,
    pub stats: SchedulerStats,
    pub cleanup_attempts: usize,
}

/// Owns a run from the first block directive to the final socket close.
pub struct Simulator<'a, S: PacketSink> {
    config: &'a SimulatorConfig,
    sink: S,
    state: LifecycleState,
    cleanup_attempts: usize,
}

impl<'a> Simulator<'a, UdpTransport> {
    /// Validates the configuration and opens the UDP link to its destination.
    pub fn open(config: &'a SimulatorConfig) -> Result<Self, SimError> {
        config.validate()?;
        let transport = UdpTransport::open(&config.host, config.port)?;
        info!("Sending to {}", transport.destination());
        Self::new(config, transport)
    }
}

impl<'a, S: PacketSink> Simulator<'a, S> {
    pub fn new(config: &'a SimulatorConfig, sink: S) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            sink,
            state: LifecycleState::Starting,
            cleanup_attempts: 0,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Streams packets until the timeout elapses, `shutdown` resolves or the
    /// transport fails, then cleans up and closes the transport.
    ///
    /// A fatal transport error is returned only after cleanup has run.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunSummary, SimError>
    where
        F: Future<Output = ()>,
    {
        let config = self.config;
        let mut scheduler = Scheduler::new(config);
        let mut ticker = time::interval(BASE_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        match config.timeout_secs {
            Some(secs) => info!("Sending data for {} seconds", secs),
            None => info!("Sending data until interrupted"),
        }

        self.state = LifecycleState::Running;
        let start = Instant::now();
        let deadline = config.timeout_secs.map(|secs| start + Duration::from_secs(secs));

        let (reason, failure) = loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutting down...");
                    break (StopReason::Interrupted, None);
                }
                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now > deadline) {
                info!("Timeout reached");
                break (StopReason::Timeout, None);
            }

            if let Err(e) = scheduler.tick(now - start, &Utc::now(), &mut self.sink) {
                error!("Fatal transport failure: {}", e);
                break (StopReason::TransportFailure, Some(e));
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.cleanup().await;
        self.stop();

        let stats = *scheduler.stats();
        info!(
            "Done: {:?} after {} ms, {} packets sent, {} transient failures",
            reason, elapsed_ms, stats.packets_sent, stats.transient_failures
        );

        match failure {
            Some(e) => Err(SimError::Transport(e)),
            None => Ok(RunSummary {
                reason,
                elapsed_ms,
                stats,
                cleanup_attempts: self.cleanup_attempts,
            }),
        }
    }

    async fn cleanup(&mut self) {
        if !self.config.cleanup {
            info!("Cleanup disabled, labels stay blocked");
            return;
        }

        self.state = LifecycleState::CleaningUp;
        info!("Cleaning up...");
        for attempt in 1..=CLEANUP_ATTEMPTS {
            self.send_cleanup_round(attempt);
            time::sleep(BASE_TICK).await;
        }
    }

    fn send_cleanup_round(&mut self, attempt: usize) {
        if let Err(e) = self.sink.reopen() {
            warn!("cleanup attempt {}: cannot reopen transport: {}", attempt, e);
        }
        let feed = SensorFeed::new(self.config);
        for packet in feed.cleanup_packets() {
            match self.sink.send(&packet) {
                TransportResult::Sent => {}
                TransportResult::TransientFailure => debug!("cleanup attempt {}: target unavailable", attempt),
                TransportResult::FatalFailure(e) => warn!("cleanup attempt {} failed: {}", attempt, e),
            }
        }
        self.cleanup_attempts += 1;
    }

    fn stop(&mut self) {
        if self.state != LifecycleState::Stopped {
            self.sink.close();
            self.state = LifecycleState::Stopped;
        }
    }
}

impl<'a, S: PacketSink> Drop for Simulator<'a, S> {
    // Reached when a run is cancelled or panics before it could stop cleanly
    fn drop(&mut self) {
        if self.state == LifecycleState::Stopped {
            return;
        }
        let interrupted = matches!(self.state, LifecycleState::Running | LifecycleState::CleaningUp);
        if interrupted && self.config.cleanup {
            let cause = if std::thread::panicking() {
                "panicked"
            } else {
                "was cancelled"
            };
            error!(
                "Run {} while {:?} after {} cleanup rounds; sending unblock before closing",
                cause, self.state, self.cleanup_attempts
            );
            self.state = LifecycleState::CleaningUp;
            let remaining = CLEANUP_ATTEMPTS.saturating_sub(self.cleanup_attempts);
            for attempt in 1..=remaining {
                self.send_cleanup_round(attempt);
                std::thread::sleep(DROP_CLEANUP_PACING);
            }
        }
        self.stop();
    }
}
