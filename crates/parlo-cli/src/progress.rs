//! Terminal progress rendering for uploads and reply polling.
//!
//! Presentation only. Wraps indicatif and maps
//! [`parlo_core::PollingStatus`] transitions onto a single bar so the
//! whole send flow reads as one continuous operation.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use parlo_core::PollingStatus;

/// Progress bar for the upload leg (0-100 percent of bytes sent).
pub fn upload_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg:>12} {bar:28.cyan/blue} {percent:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Uploading");
    bar
}

/// Spinner for the polling and download legs.
pub fn poll_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message("Waiting for reply audio");
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Render a polling status transition onto the spinner.
pub fn render_status(bar: &ProgressBar, status: &PollingStatus) {
    match status {
        PollingStatus::Idle => {}
        PollingStatus::Polling { percent } => {
            bar.set_message(format!("Waiting for reply audio ({percent}%)"));
        }
        PollingStatus::Downloading { .. } => {
            bar.set_message("Downloading reply audio".to_string());
        }
        PollingStatus::Ready { .. } => {
            bar.set_message("Reply audio ready".to_string());
        }
        PollingStatus::Error { message } => {
            bar.set_message(format!("Polling failed: {message}"));
        }
        PollingStatus::Timeout => {
            bar.set_message("Timed out waiting for reply audio".to_string());
        }
    }
}
