//! Output formatting utilities for the CLI
//!
//! Tables for step logs and artifact listings, a summary view of an
//! installation record, and colored status messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use pf_core::{InstallStatus, Installation, LogStatus, StepLogEntry};

/// Format step log entries as a table, in the order given
pub fn format_logs(logs: &[StepLogEntry]) -> String {
    if logs.is_empty() {
        return "No log entries".to_string();
    }

    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "TIME")]
        time: String,
        #[tabled(rename = "PROGRESS")]
        progress: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "MESSAGE")]
        message: String,
    }

    let rows: Vec<LogRow> = logs
        .iter()
        .map(|entry| LogRow {
            time: format_timestamp(entry.timestamp),
            progress: format!("{}%", entry.progress),
            status: entry.status.to_string(),
            message: entry.message.clone(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(110))
        .to_string()
}

/// Format a list of artifact files with their sizes
pub fn format_artifacts<'a>(files: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    #[derive(Tabled)]
    struct ArtifactRow {
        #[tabled(rename = "FILE")]
        file: String,
        #[tabled(rename = "BYTES")]
        bytes: usize,
    }

    let rows: Vec<ArtifactRow> = files
        .into_iter()
        .map(|(file, content)| ArtifactRow {
            file: file.clone(),
            bytes: content.len(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format an installation record as a human-readable summary
pub fn format_installation(installation: &Installation) -> String {
    let mut output = String::new();

    output.push_str(&format!("Installation: {}\n", installation.id));
    output.push_str(&format!(
        "Target: {}@{}:{}\n",
        installation.username, installation.host, installation.port
    ));
    output.push_str(&format!(
        "Panel: {} ({})\n",
        installation.install_path,
        installation.tier.label()
    ));
    output.push_str(&format!(
        "Status: {} ({}%)\n",
        installation.status, installation.progress
    ));
    if let Some(url) = &installation.panel_url {
        output.push_str(&format!("Panel URL: {}\n", url));
    }
    if let Some(error) = &installation.error_message {
        output.push_str(&format!("Error: {}\n", error));
    }
    output.push_str(&format!(
        "Updated: {}\n",
        format_timestamp(installation.updated_at)
    ));

    output
}

/// Print one log entry as a colored status line
pub fn print_log_entry(entry: &StepLogEntry) {
    let line = format!("[{:>3}%] {}", entry.progress, entry.message);
    match entry.status {
        LogStatus::Success => print_success(&line),
        LogStatus::Error => print_error(&line),
        LogStatus::Warning => print_warning(&line),
        LogStatus::Info => print_info(&line),
    }
}

/// Print the terminal state of an installation
pub fn print_outcome(status: InstallStatus, panel_url: Option<&str>, error: Option<&str>) {
    match status {
        InstallStatus::Completed => {
            print_success(&format!(
                "Installation completed: {}",
                panel_url.unwrap_or("-")
            ));
        }
        InstallStatus::Failed => {
            print_error(&format!(
                "Installation failed: {}",
                error.unwrap_or("unknown error")
            ));
        }
        other => print_info(&format!("Installation {}", other)),
    }
}

/// Format Unix millis as `HH:MM:SS` (UTC)
pub fn format_timestamp(millis: u64) -> String {
    let secs = millis / 1000;
    let day_secs = secs % 86400;
    format!(
        "{:02}:{:02}:{:02}",
        day_secs / 3600,
        (day_secs % 3600) / 60,
        day_secs % 60
    )
}

/// Truncate a string with ellipsis if too long
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::InstallationId;

    fn entry(message: &str, status: LogStatus, progress: u8, timestamp: u64) -> StepLogEntry {
        StepLogEntry {
            installation_id: InstallationId::new(),
            message: message.to_string(),
            status,
            progress,
            timestamp,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "00:00:00");
        // 2024-01-01T13:05:09.250Z
        assert_eq!(format_timestamp(1_704_114_309_250), "13:05:09");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-message", 10), "a-very-...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_logs_empty() {
        assert_eq!(format_logs(&[]), "No log entries");
    }

    #[test]
    fn test_format_logs_columns() {
        let table = format_logs(&[
            entry("Connected to server", LogStatus::Info, 2, 1_000),
            entry("Installation completed successfully", LogStatus::Success, 100, 2_000),
        ]);
        assert!(table.contains("PROGRESS"));
        assert!(table.contains("Connected to server"));
        assert!(table.contains("100%"));
        assert!(table.contains("success"));
    }

    #[test]
    fn test_format_artifacts_lists_files() {
        let mut files = std::collections::BTreeMap::new();
        files.insert("index.php".to_string(), "<?php".to_string());
        let table = format_artifacts(&files);
        assert!(table.contains("index.php"));
        assert!(table.contains('5'));
    }
}
