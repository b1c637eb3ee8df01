use crate::config::TelemetryConfig;
use crate::error::TelemetryResult;
use crate::kinematics::{VelocityDeriver, VelocitySample, YawReading};
use crate::sensors::OrientationSource;
use crate::session::{CancelToken, FlushTimer, SamplerReport, SessionClock};
use crate::storage::{DurableLog, LogRecord};
use crate::window::WindowQueue;
use chrono::{DateTime, Local};
use std::time::Instant;

/// Result of feeding one poll through the aggregator
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub accepted: Option<VelocitySample>,
    pub flushed: bool,
}

/// Per-poll state of the sampler: acceptance gate, flush timer and the
/// producer side of the window queue.
pub struct Aggregator {
    deriver: VelocityDeriver,
    flush_timer: FlushTimer,
    window: WindowQueue,
}

impl Aggregator {
    pub fn new(config: &TelemetryConfig, window: WindowQueue, seed: YawReading) -> Self {
        Self {
            deriver: VelocityDeriver::new(
                config.accept_interval(),
                config.orbit_radius_meters(),
                seed,
            ),
            flush_timer: FlushTimer::new(config.flush_interval(), seed.observed_at),
            window,
        }
    }

    /// Handle one poll: accept and record it if the gate allows, then flush
    /// if the flush interval has run out.
    pub fn step(
        &mut self,
        log: &mut DurableLog,
        yaw: f64,
        now: Instant,
        wall: DateTime<Local>,
    ) -> TelemetryResult<StepOutcome> {
        let mut outcome = StepOutcome::default();

        if let Some(sample) = self.deriver.observe(yaw, now, wall) {
            log.append(&LogRecord::from(&sample))?;
            self.window.push(sample.angular_velocity)?;
            log::debug!(
                "Accepted yaw={:.3} angular={:.5} deg/s linear={:.3} after {:.3}s",
                sample.yaw_degrees,
                sample.angular_velocity,
                sample.linear_velocity,
                sample.elapsed.as_secs_f64()
            );
            outcome.accepted = Some(sample);
        }

        if self.flush_timer.is_due(now) {
            log.flush()?;
            self.flush_timer.reset(now);
            outcome.flushed = true;
            log::debug!("Flushed {} rows to {}", log.rows_written(), log.path().display());
        }

        Ok(outcome)
    }

    pub fn accepted(&self) -> u64 {
        self.deriver.accepted()
    }
}

/// Sampler/Aggregator loop. Polls the orientation source without delay,
/// gates samples by the accept interval and owns the durable log.
pub struct Sampler<S: OrientationSource> {
    config: TelemetryConfig,
    source: S,
    window: WindowQueue,
    cancel: CancelToken,
    clock: SessionClock,
}

impl<S: OrientationSource> Sampler<S> {
    pub fn new(config: TelemetryConfig, source: S, window: WindowQueue, cancel: CancelToken) -> Self {
        Self {
            config,
            source,
            window,
            cancel,
            clock: SessionClock::start(),
        }
    }

    /// Measure the session deadline from an existing clock (process start).
    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    /// Run until cancelled or the session deadline passes.
    ///
    /// The log is closed explicitly on the normal path. On an error return
    /// (or a panic) it is dropped, which flushes whatever was written.
    pub fn run(mut self) -> TelemetryResult<SamplerReport> {
        let mut log = DurableLog::create(&self.config.output_path)?;
        log::info!(
            "Sampler started, logging to {} (accept every {:.1}s, flush every {:.1}s)",
            self.config.output_path.display(),
            self.config.accept_interval_seconds,
            self.config.flush_interval_seconds
        );

        let starting_yaw = self.source.read_yaw()?;
        let seed = YawReading::new(starting_yaw, Instant::now());
        let mut aggregator = Aggregator::new(&self.config, self.window.clone(), seed);
        let session = self.config.session_duration();
        let mut report = SamplerReport::default();

        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                log::info!("Sampler cancelled");
                break;
            }
            if self.clock.deadline_passed(session) {
                log::info!("Session duration reached, sampler stopping");
                break;
            }

            let yaw = self.source.read_yaw()?;
            report.polls += 1;
            let now = Instant::now();
            let wall = self.clock.wall_at(now)?;
            aggregator.step(&mut log, yaw, now, wall)?;
        }

        report.accepted = aggregator.accepted();
        report.rows_written = log.rows_written();
        report.flushes = log.close()?;
        report.elapsed_secs = self.clock.elapsed().as_secs_f64();
        Ok(report)
    }
}
