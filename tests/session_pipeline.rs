use approx::assert_relative_eq;
use std::time::Duration;
use yaw_telemetry::{
    read_log, OrientationSource, RecordingSink, StopReason, Supervisor, TelemetryConfig,
    TelemetryResult,
};

/// Yaw increasing by a fixed step per poll, with a small fixed poll latency.
struct RampSource {
    yaw: f64,
    step: f64,
}

impl OrientationSource for RampSource {
    fn read_yaw(&mut self) -> TelemetryResult<f64> {
        std::thread::sleep(Duration::from_millis(1));
        self.yaw += self.step;
        Ok(self.yaw)
    }
}

fn short_session(dir: &tempfile::TempDir) -> TelemetryConfig {
    TelemetryConfig {
        accept_interval_seconds: 0.025,
        flush_interval_seconds: 0.05,
        session_duration_seconds: 0.4,
        display_duration_seconds: 0.15,
        display_tick_seconds: 0.01,
        planet_radius_meters: 6_378_137.0,
        orbital_altitude_meters: 408_000.0,
        output_path: dir.path().join("run/data.csv"),
        join_timeout_seconds: 2.0,
        stop_when_display_ends: false,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_session_logs_every_accepted_sample() {
    let dir = tempfile::tempdir().unwrap();
    let config = short_session(&dir);
    let sink = RecordingSink::new();

    let report = Supervisor::new(config.clone())
        .run(
            RampSource { yaw: 10.0, step: 0.01 },
            sink.clone(),
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::SessionDeadline);
    assert!(report.sampler.accepted >= 2);
    assert_eq!(report.sampler.rows_written, report.sampler.accepted);

    let text = std::fs::read_to_string(&config.output_path).unwrap();
    assert_eq!(text.lines().count() as u64, 1 + report.sampler.accepted);

    let rows = read_log(&config.output_path).unwrap();
    assert_eq!(rows.len() as u64, report.sampler.accepted);

    for pair in rows.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(prev.datetime <= next.datetime);

        // Measured elapsed between accepted samples, not the nominal interval
        let elapsed = (next.datetime - prev.datetime).num_microseconds().unwrap() as f64 / 1e6;
        assert!(elapsed > config.accept_interval_seconds * 0.9);
        let expected = (next.yaw - prev.yaw) / elapsed;
        assert_relative_eq!(next.angular_velocity, expected, max_relative = 0.05);
        assert_relative_eq!(
            next.linear_velocity,
            next.angular_velocity * config.orbit_radius_meters(),
            max_relative = 1e-12
        );
    }

    let messages = sink.messages();
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|m| m.ends_with(" m/s")));
}
