//! CLI output formatting.

use console::style;
use serde::Serialize;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON document per message
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Prints status lines, key/value pairs and serialisable data
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Selected format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        self.status("success", message, || {
            println!("{} {}", style("✓").green(), message)
        });
    }

    /// Print error message (stderr in text mode)
    pub fn error(&self, message: &str) {
        self.status("error", message, || {
            eprintln!("{} {}", style("Error:").red().bold(), message)
        });
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        self.status("warning", message, || {
            println!("{} {}", style("⚠").yellow(), message)
        });
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        self.status("info", message, || {
            println!("{} {}", style("ℹ").blue(), message)
        });
    }

    /// Print a key/value line
    pub fn kv(&self, key: &str, value: &str) {
        match self.format {
            OutputFormat::Json => self.print_json(&serde_json::json!({ key: value })),
            OutputFormat::Text => println!("  {:<26} {}", style(key).bold(), value),
        }
    }

    /// Print section header (text only)
    pub fn section(&self, title: &str) {
        if self.format == OutputFormat::Text {
            println!();
            println!("{}", style(format!("=== {} ===", title)).cyan().bold());
        }
    }

    /// Print serialisable data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Json => self.print_json(data),
            OutputFormat::Text => {
                if let Ok(text) = serde_json::to_string_pretty(data) {
                    println!("{}", text);
                }
            }
        }
    }

    fn status(&self, status: &str, message: &str, text: impl FnOnce()) {
        match self.format {
            OutputFormat::Json => self.print_json(&serde_json::json!({
                "status": status,
                "message": message,
            })),
            OutputFormat::Text => text(),
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, data: &T) {
        if let Ok(json) = serde_json::to_string(data) {
            println!("{}", json);
        }
    }
}
