use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg} [{wide_bar:.green/dim}] {human_pos}/{human_len} {prefix} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}: {human_pos} {prefix}";

/// Progress of one pass, counted in `unit`s; safe to tick from rayon workers.
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// A bar when the number of items is known up front, a spinner otherwise.
    pub fn new(message: &str, unit: &str, total: Option<u64>) -> Self {
        let bar = match total {
            Some(total) if total > 0 => {
                let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr_with_hz(8));
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                bar
            }
            _ => {
                let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(8));
                spinner.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.enable_steady_tick(Duration::from_millis(120));
                spinner
            }
        };
        bar.set_message(message.to_string());
        bar.set_prefix(unit.to_string());
        Self { bar }
    }

    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

/// `None` when progress output is switched off.
pub fn progress_for_phase(
    message: &str,
    unit: &str,
    total: Option<u64>,
    no_progress: bool,
) -> Option<ProgressTracker> {
    (!no_progress).then(|| ProgressTracker::new(message, unit, total))
}
