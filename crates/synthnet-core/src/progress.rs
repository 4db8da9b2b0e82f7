//! Progress reporting and cooperative cancellation

/// Receives progress from long-running builds and signals cancellation.
///
/// Recipes poll [`was_cancelled`](ProgressSink::was_cancelled) once per
/// outer-loop step and stop at the first `true`. Work written before the
/// cancel stays in the store.
pub trait ProgressSink {
    /// Start a new phase
    fn reset(&mut self);

    /// Expected number of steps in the current phase
    fn set_total_steps(&mut self, total: u64);

    /// Label describing the current phase
    fn set_label_text(&mut self, label: &str);

    /// Steps completed so far
    fn set_progress(&mut self, step: u64);

    /// Whether the caller asked to stop
    fn was_cancelled(&mut self) -> bool;
}

/// Sink that discards progress and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn reset(&mut self) {}

    fn set_total_steps(&mut self, _total: u64) {}

    fn set_label_text(&mut self, _label: &str) {}

    fn set_progress(&mut self, _step: u64) {}

    fn was_cancelled(&mut self) -> bool {
        false
    }
}

/// Sink that reports cancellation once it has been polled more than `limit` times
#[derive(Debug, Clone, Default)]
pub struct CancelAfter {
    limit: u64,
    polls: u64,
    last_label: String,
    last_progress: u64,
}

impl CancelAfter {
    /// Allow `limit` polls before cancelling
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Number of times cancellation has been polled
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Most recent label
    pub fn label(&self) -> &str {
        &self.last_label
    }

    /// Most recent progress value
    pub fn progress(&self) -> u64 {
        self.last_progress
    }
}

impl ProgressSink for CancelAfter {
    fn reset(&mut self) {
        self.last_progress = 0;
    }

    fn set_total_steps(&mut self, _total: u64) {}

    fn set_label_text(&mut self, label: &str) {
        self.last_label = label.to_string();
    }

    fn set_progress(&mut self, step: u64) {
        self.last_progress = step;
    }

    fn was_cancelled(&mut self) -> bool {
        self.polls += 1;
        self.polls > self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_progress_never_cancels() {
        let mut sink = NullProgress;
        assert!((0..1000).all(|_| !sink.was_cancelled()));
    }

    #[test]
    fn test_cancel_after_limit() {
        let mut sink = CancelAfter::new(2);
        assert!(!sink.was_cancelled());
        assert!(!sink.was_cancelled());
        assert!(sink.was_cancelled());
        assert!(sink.was_cancelled());
        assert_eq!(sink.polls(), 4);
    }

    #[test]
    fn test_cancel_after_records_label() {
        let mut sink = CancelAfter::new(0);
        sink.set_label_text("Creating topographic connections");
        sink.set_progress(7);
        assert_eq!(sink.label(), "Creating topographic connections");
        assert_eq!(sink.progress(), 7);
        sink.reset();
        assert_eq!(sink.progress(), 0);
    }
}
