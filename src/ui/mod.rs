//! Progress reporting for the import pipeline
//!
//! Every stage reports through [`Ui`] rather than writing to the console:
//! - Current phase (Provisioning, Parsing, Loading, ...)
//! - Progress (current/total with a label)
//! - Log lines

mod console;

pub use console::ConsoleUi;

/// Pipeline phases, in the order a run passes through them
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Provisioning,
    Parsing,
    Loading,
    Aggregating,
    Finalizing,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Provisioning => write!(f, "Creating tables"),
            Phase::Parsing => write!(f, "Reading data files"),
            Phase::Loading => write!(f, "Bulk loading"),
            Phase::Aggregating => write!(f, "Calculating districts and sectors"),
            Phase::Finalizing => write!(f, "Finalizing tables"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Trait for UI implementations - allows both console and silent/test modes
pub trait Ui {
    fn set_phase(&mut self, phase: Phase);
    /// `total` of 0 means the total is not known in advance
    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>);
    fn clear_progress(&mut self);
    fn log(&mut self, message: impl Into<String>);
}

/// Silent UI implementation for testing and non-interactive use
#[derive(Default)]
pub struct SilentUi;

impl SilentUi {
    pub fn new() -> Self {
        Self
    }
}

impl Ui for SilentUi {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}
    fn clear_progress(&mut self) {}
    fn log(&mut self, _message: impl Into<String>) {}
}

/// Records phases and log lines, for asserting on what a run reported
#[derive(Debug, Default)]
pub struct RecordingUi {
    pub phases: Vec<Phase>,
    pub messages: Vec<String>,
}

impl Ui for RecordingUi {
    fn set_phase(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}

    fn clear_progress(&mut self) {}

    fn log(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}
