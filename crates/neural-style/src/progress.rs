use core::time::Duration;

use crate::loss::LossBreakdown;

/// Observation emitted by the optimization loop. Purely informational.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Total loss, before that iteration's update.
    pub total_loss: f64,
    /// Weighted style score.
    pub style_loss: f64,
    /// Weighted content score.
    pub content_loss: f64,
    /// Wall time since the first iteration started.
    pub elapsed: Duration,
}

impl Progress {
    pub(crate) fn new(iteration: usize, loss: LossBreakdown, elapsed: Duration) -> Self {
        Self {
            iteration,
            total_loss: loss.total,
            style_loss: loss.style,
            content_loss: loss.content,
            elapsed,
        }
    }
}

/// Receives the progress observations of a run.
pub trait ProgressObserver {
    /// Called every `log_interval` iterations.
    fn observe(&mut self, progress: &Progress);
}

/// Logs every observation at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn observe(&mut self, progress: &Progress) {
        log::info!(
            "Iteration: {}, Total loss: {:.4e}, style loss: {:.4e}, content loss: {:.4e}, time: {:.4}s",
            progress.iteration,
            progress.total_loss,
            progress.style_loss,
            progress.content_loss,
            progress.elapsed.as_secs_f64(),
        );
    }
}

impl ProgressObserver for Vec<Progress> {
    fn observe(&mut self, progress: &Progress) {
        self.push(*progress);
    }
}
