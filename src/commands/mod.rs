pub mod chat;
pub mod config;
pub mod index;
pub mod listen;
pub mod question;
pub mod search;
pub mod write;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner for indeterminate progress
pub(crate) fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Create a progress bar for determinate progress
pub(crate) fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30.cyan/dim}] {pos}/{len} ({percent}%)")
            .unwrap()
            .progress_chars("━━─"),
    );
    pb.set_message(message.to_string());
    pb
}
