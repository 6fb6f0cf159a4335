use std::collections::HashMap;
use std::fmt::Display;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TaskTiming {
    pub name: String,
    pub detail: String,
    pub duration: Duration,
}

/// Per-run timing context.
///
/// One `RunTimer` is owned by each processing run and handed to the stages
/// explicitly; stages record how long each task took together with a short
/// detail string (tile size, strategy, ...).
#[derive(Debug, Clone, Default)]
pub struct RunTimer {
    run: Option<String>,
    open: bool,
    tasks: Vec<TaskTiming>,
    totals: HashMap<String, Duration>,
}

impl RunTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_run(&mut self, label: impl Into<String>) {
        let label = label.into();
        if self.open {
            warn!(previous = self.run.as_deref().unwrap_or("unnamed"), "Previous run was never closed");
        }
        info!(run = %label, "Starting run");
        self.run = Some(label);
        self.open = true;
        self.tasks.clear();
        self.totals.clear();
    }

    /// Runs `task` and records its duration under `name`.
    pub fn time<T>(&mut self, name: &str, detail: impl Into<String>, task: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = task();
        self.record(name, detail, started.elapsed());
        result
    }

    pub fn record(&mut self, name: &str, detail: impl Into<String>, duration: Duration) {
        let detail = detail.into();
        debug!(task = name, detail = %detail, ms = duration.as_secs_f64() * 1000.0, "Task finished");
        self.tasks.push(TaskTiming {
            name: name.to_string(),
            detail,
            duration,
        });
        *self.totals.entry(name.to_string()).or_insert(Duration::ZERO) += duration;
    }

    pub fn total_duration(&self) -> Duration {
        self.tasks.iter().map(|t| t.duration).sum()
    }

    pub fn get_task(&self, name: &str) -> Option<Duration> {
        self.totals.get(name).copied()
    }

    pub fn tasks(&self) -> &[TaskTiming] {
        &self.tasks
    }

    /// Whether a run was started and has not been ended or aborted yet.
    pub fn is_running(&self) -> bool {
        self.open
    }

    pub fn end_run(&mut self) {
        self.open = false;
        let total = self.total_duration();
        info!(
            run = self.run.as_deref().unwrap_or("unnamed"),
            tasks = self.tasks.len(),
            ms = total.as_secs_f64() * 1000.0,
            "Run finished"
        );
    }

    /// Closes a run that stopped on `error`. Tasks recorded so far are kept.
    pub fn abort_run(&mut self, error: &dyn Display) {
        self.open = false;
        warn!(
            run = self.run.as_deref().unwrap_or("unnamed"),
            tasks = self.tasks.len(),
            %error,
            "Run failed"
        );
    }

    pub fn print_summary(&self) {
        let total = self.total_duration();
        println!("\nPipeline Timing Summary:");
        println!("{:-<72}", "");
        for task in &self.tasks {
            let percentage = if total.as_secs_f64() > 0.0 {
                (task.duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            println!(
                "{:<30} {:<18} {:>12.3}ms ({:>5.1}%)",
                task.name,
                task.detail,
                task.duration.as_secs_f64() * 1000.0,
                percentage
            );
        }
        println!("{:-<72}", "");
        println!("{:<49} {:>12.3}ms", "Total", total.as_secs_f64() * 1000.0);
    }
}
