//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::outcome::ResolutionReport;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Output formatter for gatekey
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    spinner: Option<ProgressBar>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            spinner: None,
        }
    }

    /// Start a spinner while the pipeline runs
    pub fn start_spinner(&mut self, message: &str) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));

        self.spinner = Some(spinner.clone());
        Some(spinner)
    }

    /// Stop and clear the spinner
    pub fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message.green());
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message.yellow());
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message.red());
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            println!("🐛 {}", message);
        }
    }

    /// Print a report for humans. The key itself always goes to stdout, even when quiet.
    pub fn print_report(&self, report: &ResolutionReport, elapsed: Duration) {
        if let Some(key) = &report.key {
            if self.verbosity == VerbosityLevel::Quiet {
                println!("{}", key);
                return;
            }
            self.success(&format!(
                "Key resolved via {}",
                report.domain.as_deref().unwrap_or("unknown")
            ));
            println!("🔑 {}", key.bold());
        } else if let Some(action) = &report.action_required {
            self.warning(&format!("{} requires manual interaction", action.provider));
            println!("👉 {}", action.deep_link);
        } else {
            self.error(report.error.as_deref().unwrap_or("resolution failed"));
            if let Some(kind) = &report.error_kind {
                self.debug(&format!("error kind: {}", kind));
            }
        }

        self.debug(&format!("finished at {}", report.timestamp));
        self.info(&format!("Time: {}", format_duration(elapsed)));
    }

    /// Print a report as one JSON document on stdout
    pub fn print_json(&self, report: &ResolutionReport) -> Result<(), serde_json::Error> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}

/// Format a short duration as human-readable string
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let total_seconds = duration.as_secs();
    if total_seconds < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}m {}s", total_seconds / 60, total_seconds % 60)
    }
}
