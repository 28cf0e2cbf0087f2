use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::{Phase, Ui};

/// Console UI: phase and log lines go to the log, progress to an indicatif bar on stderr
#[derive(Default)]
pub struct ConsoleUi {
    bar: Option<ProgressBar>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&mut self, total: u64) -> &ProgressBar {
        let bar = self.bar.get_or_insert_with(|| {
            if total == 0 {
                let pb = ProgressBar::new_spinner();
                pb.set_style(spinner_style());
                pb
            } else {
                let pb = ProgressBar::new(total);
                pb.set_style(bar_style());
                pb
            }
        });
        if total > 0 && bar.length() != Some(total) {
            bar.set_style(bar_style());
            bar.set_length(total);
        }
        bar
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg:30} [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {msg:30} {pos}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl Ui for ConsoleUi {
    fn set_phase(&mut self, phase: Phase) {
        self.clear_progress();
        info!("{}...", phase);
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        let bar = self.bar(total);
        bar.set_message(label.into());
        bar.set_position(current);
    }

    fn clear_progress(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        match &self.bar {
            Some(bar) => bar.suspend(|| info!("{}", message)),
            None => info!("{}", message),
        }
    }
}

impl Drop for ConsoleUi {
    fn drop(&mut self) {
        self.clear_progress();
    }
}
