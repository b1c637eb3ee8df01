use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

/// One orientation poll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YawReading {
    pub angle_degrees: f64,
    pub observed_at: Instant,
}

impl YawReading {
    pub fn new(angle_degrees: f64, observed_at: Instant) -> Self {
        Self {
            angle_degrees,
            observed_at,
        }
    }
}

/// Velocity derived from two consecutive accepted readings.
#[derive(Clone, Debug, PartialEq)]
pub struct VelocitySample {
    pub yaw_degrees: f64,
    /// degrees/second
    pub angular_velocity: f64,
    /// angular velocity scaled by the orbit radius
    pub linear_velocity: f64,
    /// Measured time since the previous accepted sample
    pub elapsed: Duration,
    pub observed_at: Instant,
    pub recorded_at: DateTime<Local>,
}

/// Scale an angular velocity by the orbit radius.
pub fn linear_velocity(angular_velocity: f64, orbit_radius_meters: f64) -> f64 {
    angular_velocity * orbit_radius_meters
}

/// Turns raw yaw polls into time-throttled velocity samples.
///
/// Every poll yields a candidate computed against the last *accepted*
/// reading, divided by the measured elapsed time. A candidate is accepted
/// only once more than `accept_interval` has passed; rejected polls leave
/// the reference reading untouched.
#[derive(Clone, Debug)]
pub struct VelocityDeriver {
    accept_interval: Duration,
    orbit_radius_meters: f64,
    reference: YawReading,
    accepted: u64,
}

impl VelocityDeriver {
    pub fn new(accept_interval: Duration, orbit_radius_meters: f64, seed: YawReading) -> Self {
        Self {
            accept_interval,
            orbit_radius_meters,
            reference: seed,
            accepted: 0,
        }
    }

    /// Candidate `(angular, linear, elapsed)` for a poll, without accepting it.
    pub fn candidate(&self, yaw: f64, now: Instant) -> (f64, f64, Duration) {
        let elapsed = now.saturating_duration_since(self.reference.observed_at);
        let secs = elapsed.as_secs_f64();
        let angular = if secs > 0.0 {
            (yaw - self.reference.angle_degrees) / secs
        } else {
            0.0
        };
        (angular, linear_velocity(angular, self.orbit_radius_meters), elapsed)
    }

    pub fn observe(
        &mut self,
        yaw: f64,
        now: Instant,
        recorded_at: DateTime<Local>,
    ) -> Option<VelocitySample> {
        let (angular_velocity, linear_velocity, elapsed) = self.candidate(yaw, now);
        if elapsed <= self.accept_interval {
            return None;
        }

        self.reference = YawReading::new(yaw, now);
        self.accepted += 1;

        Some(VelocitySample {
            yaw_degrees: yaw,
            angular_velocity,
            linear_velocity,
            elapsed,
            observed_at: now,
            recorded_at,
        })
    }

    pub fn reference(&self) -> YawReading {
        self.reference
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}
