//! Progress reporting contract for sync runs.
//!
//! The engine reports a phase label with "i/total" counts after each
//! comparison and each dispatched action, then a final summary line. Quiet
//! runs swap in `NoopProgress`.

/// Factory for progress indicators.
pub trait ProgressReporter: Send + Sync {
    /// Open a progress indicator with the given title.
    fn begin(&self, title: &str) -> Box<dyn ProgressHandle>;
}

/// One live progress indicator.
pub trait ProgressHandle: Send {
    /// Replace the current progress line. `percent` is 0-100.
    fn set_line(&mut self, text: &str, percent: u8);

    /// Close the indicator after the given delay.
    fn close(self: Box<Self>, after_ms: u64);
}

/// Reporter that discards everything (quiet mode).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn begin(&self, _title: &str) -> Box<dyn ProgressHandle> {
        Box::new(NoopHandle)
    }
}

struct NoopHandle;

impl ProgressHandle for NoopHandle {
    fn set_line(&mut self, _text: &str, _percent: u8) {}
    fn close(self: Box<Self>, _after_ms: u64) {}
}
