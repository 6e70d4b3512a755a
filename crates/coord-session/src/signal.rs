//! One-shot gate released on a session's first successful connection.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How a wait on a [`ConnectionSignal`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The signal fired
    Connected,
    /// The wait was cancelled before the signal fired
    Interrupted,
}

/// One-shot gate. Once fired it stays fired.
#[derive(Debug)]
pub struct ConnectionSignal {
    fired: watch::Sender<bool>,
}

impl ConnectionSignal {
    /// Create an unfired signal.
    pub fn new() -> Self {
        let (fired, _) = watch::channel(false);
        Self { fired }
    }

    /// Fire the signal. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        self.fired.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    /// Whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.fired.borrow()
    }

    /// Wait until the signal fires or `cancel` is triggered.
    pub async fn wait(&self, cancel: &CancellationToken) -> WaitOutcome {
        let mut rx = self.fired.subscribe();
        tokio::select! {
            biased;
            // The sender lives in `self`, so `wait_for` only returns once fired.
            result = rx.wait_for(|fired| *fired) => match result {
                Ok(_) => WaitOutcome::Connected,
                Err(_) => WaitOutcome::Interrupted,
            },
            _ = cancel.cancelled() => WaitOutcome::Interrupted,
        }
    }
}

impl Default for ConnectionSignal {
    fn default() -> Self {
        Self::new()
    }
}
