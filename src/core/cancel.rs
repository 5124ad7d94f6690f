use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Shared cancellation flag checked by ingest workers and the query loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Combined deadline + cancellation check used by long-running loops.
#[derive(Debug, Clone, Default)]
pub struct StopCondition {
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
}

impl StopCondition {
    pub fn new(deadline: Option<Instant>, cancel: Option<CancelToken>) -> Self {
        StopCondition { deadline, cancel }
    }

    pub fn should_stop(&self) -> bool {
        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return true;
            }
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}
