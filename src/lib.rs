// Core library for reqlog: request lifecycle reconstruction from dispatch-server event logs

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod decompression;
pub mod error;
pub mod error_handling;
pub mod event;
pub mod formatters;
pub mod parallel;
pub mod parser;
pub mod pipeline;
pub mod readers;
pub mod report;
pub mod stats;

pub use config::AnalyzerConfig;
pub use error::Fault;
pub use pipeline::Analysis;
pub use report::Report;

use anyhow::Result;
use std::io::BufRead;

use parallel::{ParallelConfig, ParallelProcessor};

/// Analyze one event stream with the given configuration.
///
/// Runs sequentially unless sharded processing is configured. Data faults do
/// not fail the run unless the fault strategy is `Abort`.
pub fn run_analysis<R: BufRead>(config: &AnalyzerConfig, reader: R) -> Result<Analysis> {
    if config.should_use_parallel() {
        ParallelProcessor::new(ParallelConfig::from_config(config)).run(config, reader)
    } else {
        pipeline::run_sequential(config, reader)
    }
}

/// Convenience wrapper over [`run_analysis`] for in-memory logs
pub fn analyze_str(config: &AnalyzerConfig, log: &str) -> Result<Analysis> {
    run_analysis(config, std::io::Cursor::new(log.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_str_sequential_and_parallel_agree() {
        let log = "\
1390917600000000\t1\tStartRequest
1390917600000005\t2\tStartRequest
1390917600000010\t1\tStartSendResult
1390917600000012\t2\tStartSendResult
1390917600000020\t1\tFinishRequest
1390917600000040\t2\tFinishRequest
";
        let sequential = analyze_str(&AnalyzerConfig::default(), log).unwrap();

        let mut config = AnalyzerConfig::default();
        config.performance.threads = 2;
        let parallel = analyze_str(&config, log).unwrap();

        assert_eq!(sequential.report, parallel.report);
        assert_eq!(sequential.report.completed_requests, 2);
        assert_eq!(sequential.report.slowest_sends[0].request_id, "2");
    }
}
