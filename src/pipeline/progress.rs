//! Progress reporting for batch runs.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Stage of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Converting,
    ExtractingPoints,
    WritingModel,
    Done,
}

/// Progress information during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub stage: Stage,
    /// Units finished in this stage
    pub completed: usize,
    /// Units in this stage
    pub total: usize,
    /// Label of the unit that just finished
    pub label: Option<String>,
    /// Time since the run started
    pub elapsed: Duration,
    /// Estimated time remaining in this stage
    pub eta: Option<Duration>,
}

impl BatchProgress {
    /// Percentage complete (0.0 - 100.0).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Receiver of progress updates. Called from worker threads.
pub trait ProgressSink: Sync {
    fn update(&self, progress: &BatchProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&BatchProgress) + Sync,
{
    fn update(&self, progress: &BatchProgress) {
        self(progress)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _progress: &BatchProgress) {}
}

/// Logs every update at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&self, progress: &BatchProgress) {
        let eta = progress
            .eta
            .map(|eta| format!(", {} left", format_duration(eta)))
            .unwrap_or_default();
        log::info!(
            "[{:3.0}%] {:?} {}/{}{}{}",
            progress.percent(),
            progress.stage,
            progress.completed,
            progress.total,
            progress
                .label
                .as_deref()
                .map(|l| format!(" ({})", l))
                .unwrap_or_default(),
            eta
        );
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.0}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}min", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

/// Counts finished units of one stage and forwards updates to a sink.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    start: Instant,
    stage: Stage,
    total: usize,
    completed: AtomicUsize,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, start: Instant, stage: Stage, total: usize) -> Self {
        let tracker = Self {
            sink,
            start,
            stage,
            total,
            completed: AtomicUsize::new(0),
        };
        tracker.report(0, None);
        tracker
    }

    /// Record one finished unit.
    pub(crate) fn finish(&self, label: &str) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.report(completed, Some(label.to_string()));
    }

    fn report(&self, completed: usize, label: Option<String>) {
        let elapsed = self.start.elapsed();
        let eta = (completed > 0).then(|| {
            let per_unit = elapsed.as_secs_f64() / completed as f64;
            Duration::from_secs_f64(per_unit * self.total.saturating_sub(completed) as f64)
        });
        self.sink.update(&BatchProgress {
            stage: self.stage,
            completed,
            total: self.total,
            label,
            elapsed,
            eta,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_tracker_counts_and_estimates() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: &BatchProgress| seen.lock().unwrap().push(p.clone());
        let tracker = ProgressTracker::new(&sink, Instant::now(), Stage::Converting, 3);
        tracker.finish("a");
        tracker.finish("b");

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].completed, 0);
        assert!(seen[0].eta.is_none());
        assert_eq!(seen[2].completed, 2);
        assert_eq!(seen[2].label.as_deref(), Some("b"));
        assert!(seen[2].eta.is_some());
        assert!((seen[2].percent() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stage_is_complete() {
        let p = BatchProgress {
            stage: Stage::Done,
            completed: 0,
            total: 0,
            label: None,
            elapsed: Duration::ZERO,
            eta: None,
        };
        assert_eq!(p.percent(), 100.0);
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5min");
    }
}
