//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use filestore_core::ClearReport;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a stored value
    ///
    /// Quiet mode still prints the value itself so it can be piped.
    pub fn print_value(&self, key: &str, value: &str) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", value),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"key": key, "value": value}));
            }
        }
    }

    /// Print a list of keys
    pub fn print_keys(&self, keys: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if keys.is_empty() {
                    println!("No keys found.");
                    return;
                }
                for key in keys {
                    println!("{}", key);
                }
                println!("\n{} key(s)", keys.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!(keys));
            }
            OutputFormat::Quiet => {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print the outcome of a clear
    pub fn print_clear_report(&self, report: &ClearReport) {
        match self.format {
            OutputFormat::Human => {
                if report.keys.is_empty() {
                    println!("Store is already empty.");
                    return;
                }
                println!(
                    "Removed {} of {} key(s).",
                    report.removed_count(),
                    report.keys.len()
                );
                for failure in &report.failures {
                    println!("  ✗ {}: {}", failure.key, failure.error);
                }
            }
            OutputFormat::Json => {
                let failures: Vec<_> = report
                    .failures
                    .iter()
                    .map(|f| serde_json::json!({"key": f.key, "error": f.error.to_string()}))
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "removed": report.removed(),
                        "total": report.keys.len(),
                        "removed_count": report.removed_count(),
                        "failures": failures
                    })
                );
            }
            OutputFormat::Quiet => {
                for failure in &report.failures {
                    println!("{}", failure.key);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}
