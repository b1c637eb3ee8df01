use crate::error::{TelemetryError, TelemetryResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// FIFO of angular-velocity readings shared by the sampler (pushes to the
/// back) and the averager (pops from the front).
///
/// Clones share the same queue. All locking is internal; no lock is held
/// across a call boundary.
#[derive(Clone, Debug, Default)]
pub struct WindowQueue {
    inner: Arc<Mutex<VecDeque<f64>>>,
}

impl WindowQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue holding one value, so the display never starts on an empty window.
    pub fn seeded(seed: f64) -> Self {
        let mut values = VecDeque::with_capacity(64);
        values.push_back(seed);
        Self {
            inner: Arc::new(Mutex::new(values)),
        }
    }

    fn lock(&self) -> TelemetryResult<MutexGuard<'_, VecDeque<f64>>> {
        self.inner.lock().map_err(|_| {
            TelemetryError::Internal("Failed to acquire window queue lock".to_string())
        })
    }

    pub fn push(&self, value: f64) -> TelemetryResult<()> {
        self.lock()?.push_back(value);
        Ok(())
    }

    /// Arithmetic mean of everything currently queued.
    pub fn mean(&self) -> TelemetryResult<Option<f64>> {
        let values = self.lock()?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    pub fn pop_front(&self) -> TelemetryResult<Option<f64>> {
        Ok(self.lock()?.pop_front())
    }

    pub fn len(&self) -> TelemetryResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> TelemetryResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn snapshot(&self) -> TelemetryResult<Vec<f64>> {
        Ok(self.lock()?.iter().copied().collect())
    }
}
