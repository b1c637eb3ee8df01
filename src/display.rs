use crate::config::TelemetryConfig;
use crate::error::{TelemetryError, TelemetryResult};
use crate::kinematics::linear_velocity;
use crate::session::{CancelToken, DisplayReport, SessionClock};
use crate::window::WindowQueue;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;

/// Output device able to show a short text message. Fire-and-forget.
pub trait OutputSink: Send {
    fn show_message(&mut self, text: &str) -> TelemetryResult<()>;
}

impl OutputSink for Box<dyn OutputSink> {
    fn show_message(&mut self, text: &str) -> TelemetryResult<()> {
        (**self).show_message(text)
    }
}

/// Writes each message as a line on stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn show_message(&mut self, text: &str) -> TelemetryResult<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", text)
            .and_then(|_| stdout.flush())
            .map_err(|e| TelemetryError::Render(e.to_string()))
    }
}

/// Keeps rendered messages in memory; clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every render.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl OutputSink for RecordingSink {
    fn show_message(&mut self, text: &str) -> TelemetryResult<()> {
        if self.failing {
            return Err(TelemetryError::Render("display unavailable".to_string()));
        }
        self.messages
            .lock()
            .map_err(|_| TelemetryError::Internal("Failed to acquire sink lock".to_string()))?
            .push(text.to_string());
        Ok(())
    }
}

pub fn format_velocity(meters_per_second: f64) -> String {
    format!("{:.3} m/s", meters_per_second)
}

/// Averager/Display loop: renders the mean of every queued angular velocity
/// as a linear velocity, then drops the oldest reading.
pub struct Averager<O: OutputSink> {
    config: TelemetryConfig,
    window: WindowQueue,
    sink: O,
    cancel: CancelToken,
    report: DisplayReport,
}

impl<O: OutputSink> Averager<O> {
    pub fn new(config: TelemetryConfig, window: WindowQueue, sink: O, cancel: CancelToken) -> Self {
        Self {
            config,
            window,
            sink,
            cancel,
            report: DisplayReport::default(),
        }
    }

    /// One display cycle. Returns the rendered linear velocity, or `None`
    /// when the window was empty.
    pub fn tick(&mut self) -> TelemetryResult<Option<f64>> {
        let Some(mean_angular) = self.window.mean()? else {
            return Ok(None);
        };

        let mean_linear = linear_velocity(mean_angular, self.config.orbit_radius_meters());
        let message = format_velocity(mean_linear);

        match self.sink.show_message(&message) {
            Ok(()) => {
                self.report.renders += 1;
                self.report.last_message = Some(message);
            }
            Err(e) if !e.is_fatal() => {
                self.report.render_failures += 1;
                log::warn!("Render failed, continuing: {}", e);
            }
            Err(e) => return Err(e),
        }

        self.window.pop_front()?;
        Ok(Some(mean_linear))
    }

    /// Run until cancelled or the display duration has passed.
    pub fn run(mut self) -> TelemetryResult<DisplayReport> {
        let clock = SessionClock::start();
        let limit = self.config.display_duration();
        let tick = self.config.display_tick();
        log::info!(
            "Display started for {:.1}s (tick {:.2}s)",
            self.config.display_duration_seconds,
            self.config.display_tick_seconds
        );

        loop {
            if self.cancel.is_cancelled() {
                self.report.cancelled = true;
                log::info!("Display cancelled");
                break;
            }
            if clock.deadline_passed(limit) {
                log::info!("Display session finished after {} renders", self.report.renders);
                break;
            }

            self.tick()?;
            thread::sleep(tick);
        }

        self.report.elapsed_secs = clock.elapsed().as_secs_f64();
        Ok(self.report)
    }
}
