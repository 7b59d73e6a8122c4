//! Progress bar helpers using indicatif

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a progress bar for batch fitting
///
/// The bar draws nothing unless `visible` is set, so library callers get
/// silent operation by default.
pub fn create_progress_bar(len: u64, message: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len), draw_target(visible));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} features ({eta})") {
        pb.set_style(style.progress_chars("█▓▒░"));
    }
    pb.set_message(message.to_string());
    pb
}

fn draw_target(visible: bool) -> ProgressDrawTarget {
    if visible {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    }
}

/// Finish a progress bar with a success message
pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

/// Finish a progress bar with a warning message
pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}
