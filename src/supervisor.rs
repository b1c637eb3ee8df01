use crate::config::TelemetryConfig;
use crate::display::{Averager, OutputSink};
use crate::error::{TelemetryError, TelemetryResult};
use crate::sampler::Sampler;
use crate::sensors::OrientationSource;
use crate::session::{CancelToken, SessionClock, SessionReport, StopReason};
use crate::window::WindowQueue;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

/// Starts the sampler and display loops on their own threads, waits for one
/// of them to end or for an interrupt, then cancels both and joins them with
/// a bounded wait.
pub struct Supervisor {
    config: TelemetryConfig,
    clock: SessionClock,
    cancel: CancelToken,
    window: WindowQueue,
}

impl Supervisor {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            clock: SessionClock::start(),
            cancel: CancelToken::new(),
            window: WindowQueue::seeded(0.0),
        }
    }

    /// Handle to the shared cancellation signal.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn run<S, O, F>(self, source: S, sink: O, shutdown: F) -> TelemetryResult<SessionReport>
    where
        S: OrientationSource + 'static,
        O: OutputSink + 'static,
        F: Future<Output = ()>,
    {
        self.config.validate()?;

        let sampler = Sampler::new(
            self.config.clone(),
            source,
            self.window.clone(),
            self.cancel.clone(),
        )
        .with_clock(self.clock);
        let averager = Averager::new(
            self.config.clone(),
            self.window.clone(),
            sink,
            self.cancel.clone(),
        );

        let mut sampler_task = tokio::task::spawn_blocking(move || sampler.run());
        let mut display_task = tokio::task::spawn_blocking(move || averager.run());
        tokio::pin!(shutdown);

        let mut sampler_result = None;
        let mut display_result = None;

        let stop_reason = loop {
            tokio::select! {
                joined = &mut sampler_task, if sampler_result.is_none() => {
                    let result = flatten(joined, "sampler");
                    let reason = if result.is_ok() {
                        StopReason::SessionDeadline
                    } else {
                        StopReason::SamplerFailed
                    };
                    sampler_result = Some(result);
                    break reason;
                }
                joined = &mut display_task, if display_result.is_none() => {
                    let result = flatten(joined, "display");
                    let failed = result.is_err();
                    display_result = Some(result);
                    if failed {
                        break StopReason::DisplayFailed;
                    }
                    if self.config.stop_when_display_ends {
                        break StopReason::DisplayFinished;
                    }
                    log::info!("Display session over, logging continues");
                }
                _ = &mut shutdown => {
                    log::info!("Interrupt received, shutting down");
                    break StopReason::Interrupted;
                }
            }
        };

        if self.cancel.cancel() {
            log::info!("Cancellation raised ({:?})", stop_reason);
        }

        let limit = self.config.join_timeout();
        let sampler_result = match sampler_result {
            Some(result) => result,
            None => join_bounded(sampler_task, limit, "sampler").await,
        };
        let display_result = match display_result {
            Some(result) => result,
            None => join_bounded(display_task, limit, "display").await,
        };

        let (sampler, display) = match (stop_reason, sampler_result, display_result) {
            (_, Ok(sampler), Ok(display)) => (sampler, display),
            (StopReason::DisplayFailed, _, Err(e)) | (_, Err(e), _) | (_, _, Err(e)) => {
                log::error!("Session ended with fatal error: {}", e);
                return Err(e);
            }
        };

        log::info!(
            "Session stopped ({:?}): {} samples accepted, {} renders",
            stop_reason,
            sampler.accepted,
            display.renders
        );
        Ok(SessionReport {
            stop_reason,
            sampler,
            display,
        })
    }
}

fn flatten<T>(joined: Result<TelemetryResult<T>, JoinError>, name: &str) -> TelemetryResult<T> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(TelemetryError::Internal(format!("{} loop panicked: {}", name, e))),
    }
}

async fn join_bounded<T>(
    handle: JoinHandle<TelemetryResult<T>>,
    limit: Duration,
    name: &str,
) -> TelemetryResult<T> {
    match tokio::time::timeout(limit, handle).await {
        Ok(joined) => flatten(joined, name),
        Err(_) => {
            log::warn!("{} loop did not stop within {:?}", name, limit);
            Err(TelemetryError::Internal(format!(
                "{} loop did not stop within {:?}",
                name, limit
            )))
        }
    }
}
