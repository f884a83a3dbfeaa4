/// Receiver of batch progress. Reporting never influences the outcome.
pub trait ProgressSink {
    fn report(&mut self, message: &str);

    fn report_progress(&mut self, count: usize, total: usize, message: &str);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&mut self, _message: &str) {}

    fn report_progress(&mut self, _count: usize, _total: usize, _message: &str) {}
}

/// Forwards reports to the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    level: log::Level,
}

impl LogProgress {
    pub fn new(level: log::Level) -> Self {
        LogProgress { level }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        LogProgress::new(log::Level::Info)
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, message: &str) {
        log::log!(self.level, "{message}");
    }

    fn report_progress(&mut self, count: usize, total: usize, message: &str) {
        if message.is_empty() {
            log::log!(self.level, "{count}/{total}");
        } else {
            log::log!(self.level, "{message} {count}/{total}");
        }
    }
}
