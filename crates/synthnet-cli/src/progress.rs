//! Terminal progress bars and Ctrl-C cancellation for long builds

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use synthnet_core::ProgressSink;
use tracing::warn;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Flag raised once the user presses Ctrl-C.
///
/// Must be called from inside the tokio runtime.
pub fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let raised = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current neuron");
            raised.store(true, Ordering::SeqCst);
        }
    });
    flag
}

/// [`ProgressSink`] drawing an indicatif bar on stderr
pub struct BarProgress {
    bar: ProgressBar,
    cancel: Arc<AtomicBool>,
}

impl BarProgress {
    /// Create a bar; a hidden bar still honours the cancel flag
    pub fn new(visible: bool, cancel: Arc<AtomicBool>) -> Self {
        let bar = if visible { ProgressBar::new(0) } else { ProgressBar::hidden() };
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar, cancel }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Current position
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressSink for BarProgress {
    fn reset(&mut self) {
        self.bar.reset();
    }

    fn set_total_steps(&mut self, total: u64) {
        self.bar.set_length(total);
    }

    fn set_label_text(&mut self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn set_progress(&mut self, step: u64) {
        self.bar.set_position(step);
    }

    fn was_cancelled(&mut self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_position() {
        let mut progress = BarProgress::new(false, Arc::new(AtomicBool::new(false)));
        progress.set_total_steps(10);
        progress.set_label_text("Connecting");
        progress.set_progress(4);
        assert_eq!(progress.position(), 4);
        assert!(!progress.was_cancelled());
        progress.finish();
    }

    #[test]
    fn test_raised_flag_cancels() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut progress = BarProgress::new(false, Arc::clone(&flag));
        flag.store(true, Ordering::SeqCst);
        assert!(progress.was_cancelled());
    }
}
