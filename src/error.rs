use thiserror::Error;

/// Telemetry pipeline error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("Orientation read failed: {0}")]
    SourceRead(String),

    #[error("Log persistence failed: {0}")]
    Persistence(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

impl TelemetryError {
    /// Render failures are best-effort; everything else ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TelemetryError::Render(_))
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::Persistence(err.to_string())
    }
}

impl From<csv::Error> for TelemetryError {
    fn from(err: csv::Error) -> Self {
        TelemetryError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_the_only_non_fatal_error() {
        assert!(!TelemetryError::Render("led busy".to_string()).is_fatal());
        assert!(TelemetryError::SourceRead("i2c".to_string()).is_fatal());
        assert!(TelemetryError::Persistence("disk full".to_string()).is_fatal());
        assert!(TelemetryError::Internal("poisoned".to_string()).is_fatal());
    }

    #[test]
    fn test_io_error_maps_to_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no space left");
        let err: TelemetryError = io.into();
        assert!(matches!(err, TelemetryError::Persistence(ref m) if m.contains("no space")));
    }
}
