//! Run-wide report handed to the reporting collaborator at cleanup

use crate::interrupt::InterruptReason;
use crate::result::AggregatedResult;
use std::time::{Duration, Instant};

/// Counts, timing and summary lines for one run
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Verdicts that passed
    pub passed: usize,
    /// Verdicts that failed
    pub failed: usize,
    /// Verdicts that were skipped
    pub skipped: usize,
    /// Every verdict counted
    pub total: usize,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    summary: Vec<String>,
    interrupted: Option<InterruptReason>,
    sealed: bool,
}

impl Report {
    /// Empty report without a start time
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a report whose clock starts now
    pub fn started() -> Self {
        Self {
            started_at: Some(Instant::now()),
            ..Self::default()
        }
    }

    /// Count one aggregated verdict
    pub fn add_result(&mut self, result: &AggregatedResult) {
        self.total += 1;
        if result.is_passed() {
            self.passed += 1;
        } else if result.is_failed() {
            self.failed += 1;
        } else if result.is_skipped() {
            self.skipped += 1;
        }
    }

    /// Append a free-form line contributed by a plugin
    pub fn add_summary(&mut self, line: impl Into<String>) {
        self.summary.push(line.into());
    }

    /// Lines appended by cleanup handlers
    pub fn summary(&self) -> &[String] {
        &self.summary
    }

    /// Record the first interruption; later ones are ignored
    pub fn set_interrupted(&mut self, reason: InterruptReason) {
        if self.interrupted.is_none() {
            self.interrupted = Some(reason);
        }
    }

    /// Why the run stopped early
    pub fn interrupted(&self) -> Option<&InterruptReason> {
        self.interrupted.as_ref()
    }

    /// Whether the run stopped early
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.is_some()
    }

    /// Stop the clock; counts remain readable
    pub fn seal(&mut self) {
        if !self.sealed {
            self.ended_at = Some(Instant::now());
            self.sealed = true;
        }
    }

    /// Whether [`Report::seal`] ran
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Wall time between start and seal, zero when either is missing
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}
