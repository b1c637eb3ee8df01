use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Session configuration. Every field has a deployed default, so a JSON file
/// only needs to name the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Minimum spacing between accepted samples
    pub accept_interval_seconds: f64,
    pub flush_interval_seconds: f64,
    /// Logging session length (2h50m on the station)
    pub session_duration_seconds: f64,
    pub display_duration_seconds: f64,
    pub display_tick_seconds: f64,
    pub planet_radius_meters: f64,
    pub orbital_altitude_meters: f64,
    pub output_path: PathBuf,
    /// How long the supervisor waits for each loop after cancelling
    pub join_timeout_seconds: f64,
    pub stop_when_display_ends: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            accept_interval_seconds: 5.0,
            flush_interval_seconds: 10.0,
            session_duration_seconds: 10_200.0,
            display_duration_seconds: 30.0,
            display_tick_seconds: 0.1,
            planet_radius_meters: 6_378_137.0,
            orbital_altitude_meters: 408_000.0,
            output_path: PathBuf::from("data.csv"),
            join_timeout_seconds: 5.0,
            stop_when_display_ends: false,
        }
    }
}

impl TelemetryConfig {
    pub fn from_json_file(path: &Path) -> TelemetryResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            TelemetryError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> TelemetryResult<Self> {
        serde_json::from_str(text).map_err(|e| TelemetryError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> TelemetryResult<()> {
        let positive = [
            ("accept_interval_seconds", self.accept_interval_seconds),
            ("flush_interval_seconds", self.flush_interval_seconds),
            ("session_duration_seconds", self.session_duration_seconds),
            ("display_duration_seconds", self.display_duration_seconds),
            ("display_tick_seconds", self.display_tick_seconds),
            ("join_timeout_seconds", self.join_timeout_seconds),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TelemetryError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(TelemetryError::InvalidConfig(format!(
                    "{} is too large, got {}",
                    name, value
                )));
            }
        }

        if self.display_duration_seconds > self.session_duration_seconds {
            return Err(TelemetryError::InvalidConfig(format!(
                "display_duration_seconds ({}) must not exceed session_duration_seconds ({})",
                self.display_duration_seconds, self.session_duration_seconds
            )));
        }

        let radius = self.orbit_radius_meters();
        if !radius.is_finite() || radius <= 0.0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "planet radius plus orbital altitude must be positive, got {}",
                radius
            )));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(TelemetryError::InvalidConfig(
                "output_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Distance from the planet's centre used to scale angular to linear velocity.
    pub fn orbit_radius_meters(&self) -> f64 {
        self.planet_radius_meters + self.orbital_altitude_meters
    }

    pub fn accept_interval(&self) -> Duration {
        seconds(self.accept_interval_seconds)
    }

    pub fn flush_interval(&self) -> Duration {
        seconds(self.flush_interval_seconds)
    }

    pub fn session_duration(&self) -> Duration {
        seconds(self.session_duration_seconds)
    }

    pub fn display_duration(&self) -> Duration {
        seconds(self.display_duration_seconds)
    }

    pub fn display_tick(&self) -> Duration {
        seconds(self.display_tick_seconds)
    }

    pub fn join_timeout(&self) -> Duration {
        seconds(self.join_timeout_seconds)
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = TelemetryConfig::default();
        assert_eq!(config.accept_interval(), Duration::from_secs(5));
        assert_eq!(config.flush_interval(), Duration::from_secs(10));
        assert_eq!(config.session_duration(), Duration::from_secs(10_200));
        assert_eq!(config.display_tick(), Duration::from_millis(100));
        assert_eq!(config.orbit_radius_meters(), 6_786_137.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TelemetryConfig::from_json_str(
            r#"{ "accept_interval_seconds": 1.5, "output_path": "logs/run.csv" }"#,
        )
        .unwrap();
        assert_eq!(config.accept_interval_seconds, 1.5);
        assert_eq!(config.output_path, PathBuf::from("logs/run.csv"));
        assert_eq!(config.flush_interval_seconds, 10.0);
    }

    #[test]
    fn test_rejects_non_positive_intervals() {
        let mut config = TelemetryConfig::default();
        config.display_tick_seconds = 0.0;
        assert!(matches!(
            config.validate(),
            Err(TelemetryError::InvalidConfig(ref m)) if m.contains("display_tick_seconds")
        ));

        let mut config = TelemetryConfig::default();
        config.flush_interval_seconds = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_interval_too_large_for_duration() {
        let config = TelemetryConfig {
            session_duration_seconds: 1e20,
            join_timeout_seconds: 1e20,
            ..TelemetryConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TelemetryError::InvalidConfig(ref m)) if m.contains("session_duration_seconds")
        ));

        let config = TelemetryConfig {
            join_timeout_seconds: 1e20,
            ..TelemetryConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TelemetryError::InvalidConfig(ref m)) if m.contains("join_timeout_seconds")
        ));
    }

    #[test]
    fn test_display_session_must_not_outlast_logging() {
        let config = TelemetryConfig {
            session_duration_seconds: 10.0,
            display_duration_seconds: 30.0,
            ..TelemetryConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TelemetryError::InvalidConfig(ref m)) if m.contains("display_duration_seconds")
        ));

        let equal = TelemetryConfig {
            session_duration_seconds: 30.0,
            ..TelemetryConfig::default()
        };
        assert!(equal.validate().is_ok());
    }

    #[test]
    fn test_rejects_collapsed_radius() {
        let mut config = TelemetryConfig::default();
        config.planet_radius_meters = -408_000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = TelemetryConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidConfig(_)));
    }
}
