use anyhow::{Context, Result};
use std::fmt::Write as _;

use crate::config::OutputFormat;
use crate::report::Report;

/// Renders a finished report
pub trait ReportFormatter {
    fn format(&self, report: &Report) -> Result<String>;
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Escape characters that would break the tab-indented text layout
fn escape_text(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        match ch {
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\t' => output.push_str("\\t"),
            '\r' => output.push_str("\\r"),
            _ => output.push(ch),
        }
    }

    output
}

/// 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, ..., 21st
fn ordinal(n: u8) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Plain-text report in the layout operators are used to
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        let mut out = String::new();
        self.write_report(&mut out, report)
            .context("Failed to render text report")?;
        Ok(out)
    }
}

impl TextFormatter {
    fn write_report(&self, out: &mut String, report: &Report) -> std::fmt::Result {
        match &report.latency {
            Some(latency) => writeln!(
                out,
                "{} percentile of request duration: {}",
                ordinal(latency.percentile),
                latency.value
            )?,
            None => writeln!(out, "Percentile of request duration: n/a (no completed requests)")?,
        }
        writeln!(out)?;

        writeln!(out, "Requests with the longest result-sending phase:")?;
        let ids: Vec<&str> = report
            .slowest_sends
            .iter()
            .map(|send| send.request_id.as_str())
            .collect();
        writeln!(out, "{}", ids.join(" "))?;
        writeln!(out)?;

        writeln!(
            out,
            "Requests with an incomplete set of responding backends: {}",
            report.partial_failures
        )?;
        writeln!(out)?;

        if report.missing_send_time > 0 {
            writeln!(
                out,
                "Requests finished without a result-sending phase: {}",
                report.missing_send_time
            )?;
            writeln!(out)?;
        }

        writeln!(out, "Backend touches and errors:")?;
        for (group_id, targets) in &report.backends {
            writeln!(out, "Backend group {}:", escape_text(group_id))?;
            for (target, tally) in targets {
                writeln!(out, "\t{}", escape_text(target))?;
                writeln!(out, "\t\tTouches: {}", tally.touches)?;
                if !tally.errors.is_empty() {
                    writeln!(out, "\t\tErrors:")?;
                    for (error, count) in &tally.errors {
                        writeln!(out, "\t\t\t{}: {}", escape_text(error), count)?;
                    }
                }
            }
        }

        if report.unfinished.count > 0 {
            writeln!(out)?;
            writeln!(
                out,
                "Requests still open at end of input: {}",
                report.unfinished.count
            )?;
            for open in &report.unfinished.examples {
                writeln!(
                    out,
                    "\t{} (started line {}, {} open backends)",
                    open.request_id, open.line, open.open_backends
                )?;
            }
        }

        if report.faults.total > 0 {
            writeln!(out)?;
            writeln!(out, "Data faults: {}", report.faults.total)?;
            for (category, count) in &report.faults.by_category {
                writeln!(out, "\t{}: {}", category, count)?;
            }
            for example in &report.faults.examples {
                writeln!(out, "\t{}", escape_text(example))?;
            }
        }

        Ok(())
    }
}

/// Pretty-printed JSON of the full report model
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        let mut json =
            serde_json::to_string_pretty(report).context("Failed to serialize report as JSON")?;
        json.push('\n');
        Ok(json)
    }
}
