use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};
#[cfg(feature = "colored-output")]
use colored::*;

/// Progress of one completed iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    /// 1-based iteration index within the batch.
    pub index: u32,
    /// Configured iteration count.
    pub total: u32,
    pub user_name: String,
    pub total_points: i64,
}

impl fmt::Display for IterationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} | Name: {} | Total Points: {}",
            self.index, self.total, self.user_name, self.total_points
        )
    }
}

/// Receives user-facing progress from the orchestrator.
pub trait ProgressSink: Send + Sync {
    fn iteration_completed(&self, report: &IterationReport);

    fn batch_completed(&self, finished_at: DateTime<Local>, next_batch_in: Duration);

    /// A run's session was opened through `proxy`.
    fn proxy_connected(&self, _proxy: &str) {}

    /// A run ended with an error and is about to be restarted.
    fn run_failed(&self, _message: &str) {}
}

/// Render a delay the way the console lines phrase it ("1 hour", "90 seconds").
pub fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// Prints progress lines to stdout.
pub struct ConsoleSink {
    colored: bool,
}

impl ConsoleSink {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn intro(&self) {
        println!("{}", self.colorize("Auto Grow for HANA Network", &Color::Green, true));
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.colorize(message, &Color::Green, false));
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.colorize(message, &Color::Red, false));
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Cyan => text.cyan(),
                    Color::Red => text.red(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn iteration_completed(&self, report: &IterationReport) {
        println!(
            "{}/{} | Name: {} | Total Points: {}",
            self.colorize(&report.index.to_string(), &Color::Cyan, true),
            report.total,
            self.colorize(&report.user_name, &Color::Yellow, false),
            self.colorize(&report.total_points.to_string(), &Color::Green, true),
        );
    }

    fn batch_completed(&self, finished_at: DateTime<Local>, next_batch_in: Duration) {
        println!(
            "{} - Waiting for {} before the next batch...",
            finished_at.format("%Y-%m-%d %H:%M:%S"),
            humanize(next_batch_in)
        );
    }

    fn proxy_connected(&self, proxy: &str) {
        self.success(&format!("Proxy connected: {proxy}"));
    }

    fn run_failed(&self, message: &str) {
        self.error(&format!("Error: {message}"));
    }
}

#[cfg_attr(not(feature = "colored-output"), allow(dead_code))]
enum Color {
    Green,
    Yellow,
    Cyan,
    Red,
}

/// Collects progress in memory. Used by tests and by callers that post-process reports.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<IterationReport>>,
    batches: Mutex<u32>,
    proxies: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<IterationReport> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn batches_completed(&self) -> u32 {
        self.batches.lock().map(|b| *b).unwrap_or_default()
    }

    pub fn proxies(&self) -> Vec<String> {
        self.proxies
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn iteration_completed(&self, report: &IterationReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
    }

    fn batch_completed(&self, _finished_at: DateTime<Local>, _next_batch_in: Duration) {
        if let Ok(mut batches) = self.batches.lock() {
            *batches += 1;
        }
    }

    fn proxy_connected(&self, proxy: &str) {
        if let Ok(mut proxies) = self.proxies.lock() {
            proxies.push(proxy.to_string());
        }
    }

    fn run_failed(&self, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(message.to_string());
        }
    }
}
