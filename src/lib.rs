// Yaw telemetry pipeline
// Samples orientation, derives angular/linear velocity, shows a windowed
// mean and logs every accepted sample to CSV for a bounded session.

pub mod config;
pub mod display;
pub mod error;
pub mod kinematics;
pub mod sampler;
pub mod sensors;
pub mod session;
pub mod storage;
pub mod supervisor;
pub mod window;

pub use config::TelemetryConfig;
pub use display::{Averager, ConsoleSink, OutputSink, RecordingSink};
pub use error::{TelemetryError, TelemetryResult};
pub use kinematics::{VelocityDeriver, VelocitySample, YawReading};
pub use sampler::{Aggregator, Sampler};
pub use sensors::{CommandOrientation, OrientationSource, ScriptedOrientation, SimulatedOrientation};
pub use session::{CancelToken, SessionReport, StopReason};
pub use storage::{read_log, DurableLog, LogRecord};
pub use supervisor::Supervisor;
pub use window::WindowQueue;
