use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{DeadLetterQueue, Error};

/// Logs rejected commands and keeps a count for the run summary.
#[derive(Default, Debug)]
pub struct LoggingDlq {
    reported: AtomicUsize,
}

impl LoggingDlq {
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::Relaxed)
    }
}

impl DeadLetterQueue for LoggingDlq {
    fn report(&self, error: &Error) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %error, "command dead-lettered");
    }
}
