// Command-line interface definitions

use crate::config::{FaultStrategy, OutputFormat};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "reqlog")]
#[command(about = "Reconstruct request lifecycles from a dispatch-server event log")]
#[command(
    long_about = "Reconstruct request lifecycles from a dispatch-server event log\n\nReads tab-separated events (timestamp, request id, kind, payload) in a single pass and reports\nthe duration percentile, the slowest result-sending phases, partial backend failures and\nper-backend touch and error counts."
)]
#[command(version)]
pub struct Cli {
    /// Event log to read (gzip and zstd are detected automatically); reads stdin when omitted
    pub file: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(short = 'o', long = "output-file", help_heading = "Output Options")]
    pub output_file: Option<String>,

    /// Report format
    #[arg(short = 'F', long = "output-format", value_enum, default_value = "text", help_heading = "Output Options")]
    pub output_format: OutputFormat,

    /// Print processing statistics to stderr
    #[arg(short = 's', long = "stats", help_heading = "Output Options")]
    pub stats: bool,

    /// Rank percentile of request durations to report
    #[arg(long = "percentile", default_value_t = 95, value_parser = clap::value_parser!(u8).range(0..=100), help_heading = "Report Options")]
    pub percentile: u8,

    /// Number of slowest result-sending phases to list
    #[arg(long = "top", default_value_t = 10, help_heading = "Report Options")]
    pub top: usize,

    /// Number of never-finished requests to list by id
    #[arg(long = "unfinished-examples", default_value_t = 10, help_heading = "Report Options")]
    pub unfinished_examples: usize,

    /// How to handle events that reference requests or backends that are not open
    #[arg(long = "on-fault", value_enum, default_value = "collect", help_heading = "Fault Options")]
    pub on_fault: FaultStrategy,

    /// Number of fault messages kept in the report
    #[arg(long = "fault-examples", default_value_t = 10, help_heading = "Fault Options")]
    pub fault_examples: usize,

    /// Shard requests across worker threads
    #[arg(long = "parallel", help_heading = "Performance Options")]
    pub parallel: bool,

    /// Worker count (0 = number of CPUs); implies --parallel when non-zero
    #[arg(long = "threads", default_value_t = 0, help_heading = "Performance Options")]
    pub threads: usize,

    /// Events per batch sent to a worker
    #[arg(long = "batch-size", help_heading = "Performance Options")]
    pub batch_size: Option<usize>,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["reqlog"]).unwrap();
        assert!(cli.file.is_none());
        assert_eq!(cli.output_format, OutputFormat::Text);
        assert_eq!(cli.percentile, 95);
        assert_eq!(cli.top, 10);
        assert_eq!(cli.on_fault, FaultStrategy::Collect);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::try_parse_from([
            "reqlog",
            "input.txt",
            "-o",
            "out.json",
            "-F",
            "json",
            "--percentile",
            "99",
            "--top",
            "3",
            "--on-fault",
            "abort",
            "--threads",
            "4",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.file.as_deref(), Some("input.txt"));
        assert_eq!(cli.output_file.as_deref(), Some("out.json"));
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.percentile, 99);
        assert_eq!(cli.top, 3);
        assert_eq!(cli.on_fault, FaultStrategy::Abort);
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_every_option_is_documented() {
        let command = Cli::command();
        for arg in command.get_arguments() {
            let id = arg.get_id().as_str();
            if id == "help" || id == "version" {
                continue;
            }
            assert!(arg.get_help().is_some(), "option '{}' has no help text", id);
        }
    }

    #[test]
    fn test_percentile_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["reqlog", "--percentile", "101"]).is_err());
    }

    #[test]
    fn test_single_input_only() {
        assert!(Cli::try_parse_from(["reqlog", "a.log", "b.log"]).is_err());
    }
}
