//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a comparison reads and writes records
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Create progress reporter for a comparison; `quiet` suppresses all output
    pub fn new_for_compare(quiet: bool) -> Self {
        Self {
            spinner: (!quiet).then(|| create_spinner("Loading field metadata...")),
        }
    }

    /// Progress hook in the shape the core pipeline calls
    pub fn update(&self, processed: u64, total: u64, message: &str) {
        if let Some(pb) = &self.spinner {
            if total > 0 {
                pb.set_message(format!("{message} {processed}/{total}"));
            } else {
                pb.set_message(format!("{message} {processed}"));
            }
        }
    }

    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
