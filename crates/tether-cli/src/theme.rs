//! CLI theme and styling.

use colored::Colorize;
use tether_components::ComponentStatus;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format a component status.
    pub(crate) fn status(status: &ComponentStatus) -> String {
        match status {
            ComponentStatus::Installed => "installed".green().to_string(),
            ComponentStatus::Deprecated => "deprecated".yellow().to_string(),
            ComponentStatus::Development => "dev".blue().to_string(),
            ComponentStatus::Tainted { .. } => "tainted".red().bold().to_string(),
        }
    }
}

/// Human-readable size.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_size(bytes: u64) -> String {
    let size = bytes as f64;
    if size >= 1024.0 * 1024.0 {
        format!("{:.1} MB", size / (1024.0 * 1024.0))
    } else if size >= 1024.0 {
        format!("{:.1} KB", size / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn status_labels() {
        assert!(Theme::status(&ComponentStatus::Installed).contains("installed"));
        assert!(Theme::status(&ComponentStatus::Deprecated).contains("deprecated"));
        assert!(Theme::status(&ComponentStatus::Development).contains("dev"));
        let tainted = ComponentStatus::Tainted {
            reason: "digest differs from lock file".into(),
        };
        assert!(Theme::status(&tainted).contains("tainted"));
    }
}
