//! Terminal rendering of supervisor results.
//!
//! Everything here returns strings; printing is left to the binary.

use chrono::{DateTime, Local, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use crate::supervisor::{
    DaemonDetails, DaemonState, DaemonStatus, DaemonSummary, RestartReport, StartOutcome,
    StartReport, StopOutcome, StopReport,
};

/// Timestamp format used in tables, in local time.
pub const DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

const NONE: &str = "(None)";

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format(DATE_FORMAT).to_string()
}

fn state_label(state: DaemonState) -> &'static str {
    match state {
        DaemonState::Running => "Running",
        DaemonState::StaleRunning => "Stopped (exited)",
        DaemonState::Stopped => "Stopped",
        DaemonState::Unknown => "Unknown",
    }
}

fn state_cell(state: DaemonState) -> Cell {
    let color = match state {
        DaemonState::Running => Color::Green,
        DaemonState::StaleRunning => Color::Yellow,
        DaemonState::Stopped | DaemonState::Unknown => Color::Red,
    };
    Cell::new(state_label(state)).fg(color)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Renders the `list` table.
pub fn list_table(summaries: &[DaemonSummary]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Daemon Name").fg(Color::Cyan),
        Cell::new("Path").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("PID").fg(Color::Cyan),
        Cell::new("Started At").fg(Color::Cyan),
    ]);

    for summary in summaries {
        let pid = match (summary.status, summary.pid) {
            (DaemonState::Running, Some(pid)) => pid.to_string(),
            _ => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(&summary.alias),
            Cell::new(summary.working_directory.display()),
            state_cell(summary.status),
            Cell::new(pid),
            Cell::new(format_timestamp(&summary.started_at)),
        ]);
    }

    table.to_string()
}

/// Renders the two-column `show` table.
pub fn details_table(details: &DaemonDetails) -> String {
    let record = &details.record;
    let optional = |value: Option<String>| value.unwrap_or_else(|| NONE.to_string());

    let rows: Vec<(&str, Cell)> = vec![
        ("Daemon Name", Cell::new(&record.alias)),
        ("Status", state_cell(details.live_status)),
        ("Started At", Cell::new(format_timestamp(&record.started_at))),
        (
            "Working Directory",
            Cell::new(record.working_directory.display()),
        ),
        ("Executable", Cell::new(record.executable_path.display())),
        ("Target File", Cell::new(record.target_file.display())),
        ("Launch Options", Cell::new(record.launch_options.join(" "))),
        ("Arguments", Cell::new(record.args.join(" "))),
        ("Started By", Cell::new(optional(record.started_by.clone()))),
        (
            "PID",
            Cell::new(optional(record.pid.map(|pid| pid.to_string()))),
        ),
        (
            "Stopped At",
            Cell::new(optional(record.stopped_at.as_ref().map(format_timestamp))),
        ),
        ("Stopped By", Cell::new(optional(record.stopped_by.clone()))),
    ];

    let mut table = new_table();
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label).fg(Color::Cyan), value]);
    }

    table.to_string()
}

/// Suggests follow-up commands for a daemon in `state`.
pub fn hints(alias: &str, state: DaemonState) -> String {
    let mut lines = vec!["Possible commands:".to_string()];
    if state.is_running() {
        lines.push(format!("- Run `daemonctl reload {}`", alias));
        lines.push(format!("- Run `daemonctl stop {}`", alias));
    } else {
        lines.push(format!("- Run `daemonctl start {}`", alias));
    }
    lines.join("\n")
}

pub fn start_message(report: &StartReport) -> String {
    match report.outcome {
        StartOutcome::Started => format!(
            "Daemon '{}' started successfully (PID {})",
            report.alias, report.pid
        ),
        StartOutcome::AlreadyRunning => format!(
            "Daemon '{}' is already running (PID {})",
            report.alias, report.pid
        ),
        StartOutcome::Restarted => format!(
            "Daemon '{}' was stopped externally, restarted (PID {})",
            report.alias, report.pid
        ),
    }
}

pub fn stop_message(report: &StopReport) -> String {
    match report.outcome {
        StopOutcome::Stopped => format!("Daemon '{}' stopped successfully", report.alias),
        StopOutcome::AlreadyStopped => format!("Daemon '{}' is already stopped", report.alias),
    }
}

pub fn restart_message(report: &RestartReport) -> String {
    match (report.stop, report.start) {
        (_, StartOutcome::AlreadyRunning) => format!(
            "Daemon '{}' is already running (PID {})",
            report.alias, report.pid
        ),
        (StopOutcome::AlreadyStopped, _) => format!(
            "Daemon '{}' was not running, started (PID {})",
            report.alias, report.pid
        ),
        (StopOutcome::Stopped, _) => format!(
            "Daemon '{}' restarted (PID {})",
            report.alias, report.pid
        ),
    }
}

pub fn status_message(status: &DaemonStatus) -> String {
    match (status.state, status.pid) {
        (DaemonState::Running, Some(pid)) => format!("{}: running (PID {})", status.alias, pid),
        (DaemonState::StaleRunning, Some(pid)) => {
            format!("{}: stopped externally (PID {} exited)", status.alias, pid)
        }
        (state, _) => format!("{}: {}", status.alias, state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DaemonRecord, RecordStatus};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn summary(alias: &str, status: DaemonState, pid: Option<u32>) -> DaemonSummary {
        DaemonSummary {
            alias: alias.to_string(),
            status,
            working_directory: PathBuf::from("/srv/app"),
            started_at: Utc::now(),
            pid,
        }
    }

    #[test]
    fn test_format_timestamp() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        let expected = utc.with_timezone(&Local).format("%d-%m-%Y %H:%M:%S").to_string();

        assert_eq!(format_timestamp(&utc), expected);
        assert_eq!(format_timestamp(&utc).len(), "07-03-2024 09:05:02".len());
    }

    #[test]
    fn test_list_table() {
        let rendered = list_table(&[
            summary("web", DaemonState::Running, Some(4242)),
            summary("worker", DaemonState::StaleRunning, Some(99)),
        ]);

        for header in ["Daemon Name", "Path", "Status", "PID", "Started At"] {
            assert!(rendered.contains(header), "missing header {}", header);
        }
        assert!(rendered.contains("web"));
        assert!(rendered.contains("/srv/app"));
        assert!(rendered.contains("Running"));
        assert!(rendered.contains("4242"));
        assert!(rendered.contains("Stopped (exited)"));
        assert!(!rendered.contains("99"));
    }

    #[test]
    fn test_details_table() {
        let details = DaemonDetails {
            record: DaemonRecord {
                alias: "web".to_string(),
                target_file: PathBuf::from("server.js"),
                working_directory: PathBuf::from("/srv/app"),
                launch_options: vec!["-A".to_string()],
                args: Vec::new(),
                executable_path: PathBuf::from("/usr/bin/node"),
                started_at: Utc::now(),
                stopped_at: None,
                started_by: Some("alice".to_string()),
                stopped_by: None,
                status: RecordStatus::Running,
                pid: Some(4242),
            },
            live_status: DaemonState::Running,
        };

        let rendered = details_table(&details);

        assert!(rendered.contains("/usr/bin/node"));
        assert!(rendered.contains("server.js"));
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("4242"));
        assert!(rendered.contains("(None)"));
    }

    #[test]
    fn test_hints() {
        let running = hints("web", DaemonState::Running);
        assert!(running.contains("daemonctl reload web"));
        assert!(running.contains("daemonctl stop web"));
        assert!(!running.contains("daemonctl start web"));

        let stopped = hints("web", DaemonState::StaleRunning);
        assert!(stopped.contains("daemonctl start web"));
        assert!(!stopped.contains("daemonctl stop web"));
    }

    #[test]
    fn test_messages() {
        let report = StartReport {
            alias: "web".to_string(),
            outcome: StartOutcome::Restarted,
            pid: 7,
        };
        assert_eq!(
            start_message(&report),
            "Daemon 'web' was stopped externally, restarted (PID 7)"
        );

        let report = StopReport {
            alias: "web".to_string(),
            outcome: StopOutcome::AlreadyStopped,
            pid: None,
        };
        assert_eq!(stop_message(&report), "Daemon 'web' is already stopped");

        let status = DaemonStatus {
            alias: "web".to_string(),
            state: DaemonState::Unknown,
            pid: None,
        };
        assert_eq!(status_message(&status), "web: unknown");
    }

    #[test]
    fn test_restart_message_reflects_outcomes() {
        let mut report = RestartReport {
            alias: "web".to_string(),
            stop: StopOutcome::Stopped,
            start: StartOutcome::Started,
            pid: 12,
        };
        assert_eq!(restart_message(&report), "Daemon 'web' restarted (PID 12)");

        report.stop = StopOutcome::AlreadyStopped;
        assert_eq!(
            restart_message(&report),
            "Daemon 'web' was not running, started (PID 12)"
        );
    }
}
