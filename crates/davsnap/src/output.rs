//! Terminal output utilities

use console::style;
use davsnap_backup::CycleOutcome;
use std::fmt;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Print the outcome of a one-shot cycle
pub fn outcome<T: fmt::Display>(outcome: &CycleOutcome<T>) {
    match outcome {
        CycleOutcome::Done(report) => success(&report.to_string()),
        CycleOutcome::Skipped(reason) => info(&format!("Nothing to do: {}", reason)),
        CycleOutcome::Failed(failure) => error(&failure.to_string()),
    }
}
