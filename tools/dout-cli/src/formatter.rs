//! Port trace formatter
//!
//! Formats script steps for display, as colored text or JSON lines.

use chrono::{DateTime, Local};
use colored::Colorize;
use dout::{PortConfig, SessionStats};

use crate::runner::StepReport;

pub struct TraceFormatter {
    json_format: bool,
}

impl TraceFormatter {
    pub fn new(json_format: bool) -> Self {
        Self { json_format }
    }

    pub fn header(&self, config: &PortConfig, started: DateTime<Local>) -> Option<String> {
        if self.json_format {
            return None;
        }
        Some(format!(
            "{} {}  width={} shift={} toggle={:#x} settle={:?}",
            "session".bright_white().bold(),
            started.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
            config.width.bits(),
            config.bit_shift,
            config.toggle_mask,
            config.settle,
        ))
    }

    pub fn step(&self, step: &StepReport) -> serde_json::Result<String> {
        if self.json_format {
            return serde_json::to_string(step);
        }

        let line = format!("{:>4}", step.line).dimmed();
        let command = if step.data {
            step.command.bright_green()
        } else {
            step.command.bright_cyan()
        };
        let mut out = format!("{line} {command}");

        if !step.writes.is_empty() {
            let writes = step
                .writes
                .iter()
                .map(|v| format!("{v:#010x}"))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("\n     {} {}", "->".dimmed(), writes));
        }
        if step.failed_writes > 0 {
            out.push_str(&format!(
                "\n     {}",
                format!("{} write(s) failed", step.failed_writes).bright_red()
            ));
        }
        if let Some(reply) = step.reply {
            out.push_str(&format!(
                "\n     {} {}",
                "checksum".bright_yellow(),
                format!("{reply:#06x}").bright_yellow().bold()
            ));
        }
        Ok(out)
    }

    pub fn error(&self, line: usize, message: &str) -> String {
        if self.json_format {
            return serde_json::json!({ "line": line, "error": message }).to_string();
        }
        format!("{:>4} {}", line.to_string().dimmed(), message.bright_red().bold())
    }

    pub fn summary(&self, checksum: u16, last_value: u32, stats: &SessionStats) -> String {
        if self.json_format {
            return serde_json::json!({
                "checksum": checksum,
                "last_value": last_value,
                "fragments": stats.fragments,
                "writes": stats.writes,
                "write_failures": stats.write_failures,
                "settles": stats.settles,
            })
            .to_string();
        }

        let failures = if stats.write_failures > 0 {
            stats.write_failures.to_string().bright_red().bold()
        } else {
            stats.write_failures.to_string().normal()
        };
        format!(
            "{} checksum={} last={:#010x} fragments={} writes={} failed={} settles={}",
            "done".bright_white().bold(),
            format!("{checksum:#06x}").bright_yellow().bold(),
            last_value,
            stats.fragments,
            stats.writes,
            failures,
            stats.settles,
        )
    }
}

