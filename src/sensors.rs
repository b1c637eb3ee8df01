use crate::error::{TelemetryError, TelemetryResult};
use std::collections::VecDeque;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

/// Pull-based orientation source yielding a yaw angle in degrees.
pub trait OrientationSource: Send {
    fn read_yaw(&mut self) -> TelemetryResult<f64>;
}

impl OrientationSource for Box<dyn OrientationSource> {
    fn read_yaw(&mut self) -> TelemetryResult<f64> {
        (**self).read_yaw()
    }
}

/// Simulated orientation for bench runs without the sensor board.
///
/// Yaw advances at a constant rate with a small wobble and stays in
/// `[0, 360)` like the real IMU output. An optional poll latency stands in
/// for the time the sensor link takes to answer.
pub struct SimulatedOrientation {
    started: Instant,
    start_yaw: f64,
    rate_deg_per_sec: f64,
    wobble_deg: f64,
    poll_latency: Duration,
}

impl SimulatedOrientation {
    pub fn new(start_yaw: f64, rate_deg_per_sec: f64) -> Self {
        Self {
            started: Instant::now(),
            start_yaw,
            rate_deg_per_sec,
            wobble_deg: 0.05,
            poll_latency: Duration::ZERO,
        }
    }

    pub fn with_poll_latency(mut self, latency: Duration) -> Self {
        self.poll_latency = latency;
        self
    }
}

impl Default for SimulatedOrientation {
    fn default() -> Self {
        // Roughly one revolution per 92 minute orbit
        Self::new(0.0, 360.0 / 5_550.0).with_poll_latency(Duration::from_millis(10))
    }
}

impl OrientationSource for SimulatedOrientation {
    fn read_yaw(&mut self) -> TelemetryResult<f64> {
        if !self.poll_latency.is_zero() {
            thread::sleep(self.poll_latency);
        }
        let t = self.started.elapsed().as_secs_f64();
        let yaw = self.start_yaw + self.rate_deg_per_sec * t + (t * 0.5).sin() * self.wobble_deg;
        Ok(yaw.rem_euclid(360.0))
    }
}

/// Reads yaw by running an external sensor command once per poll.
///
/// The command must print a `yaw=<degrees>` field (or a bare number).
pub struct CommandOrientation {
    program: String,
    args: Vec<String>,
}

impl CommandOrientation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a shell-style command line on whitespace. No quoting support.
    pub fn from_command_line(line: &str) -> TelemetryResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            TelemetryError::InvalidConfig("sensor command must not be empty".to_string())
        })?;
        Ok(Self::new(program, parts.collect()))
    }
}

impl OrientationSource for CommandOrientation {
    fn read_yaw(&mut self) -> TelemetryResult<f64> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| TelemetryError::SourceRead(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(TelemetryError::SourceRead(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_yaw_output(&text)
    }
}

/// Parse sensor output such as `pitch=1.2, roll=0.3, yaw=181.25` or `181.25`.
pub fn parse_yaw_output(output: &str) -> TelemetryResult<f64> {
    let trimmed = output.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return finite(value, trimmed);
    }

    for part in trimmed.split(|c: char| c == ',' || c.is_whitespace()) {
        if let Some(val_str) = part.trim().strip_prefix("yaw=") {
            let value = val_str.trim().parse::<f64>().map_err(|_| {
                TelemetryError::SourceRead(format!("unparseable yaw value '{}'", val_str))
            })?;
            return finite(value, val_str);
        }
    }

    Err(TelemetryError::SourceRead(format!(
        "no yaw field in sensor output '{}'",
        trimmed
    )))
}

fn finite(value: f64, raw: &str) -> TelemetryResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TelemetryError::SourceRead(format!("non-finite yaw '{}'", raw)))
    }
}

/// Replays a fixed list of yaw angles, then reports a read failure.
pub struct ScriptedOrientation {
    readings: VecDeque<f64>,
}

impl ScriptedOrientation {
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl OrientationSource for ScriptedOrientation {
    fn read_yaw(&mut self) -> TelemetryResult<f64> {
        self.readings
            .pop_front()
            .ok_or_else(|| TelemetryError::SourceRead("scripted readings exhausted".to_string()))
    }
}
