//! Single-pass driver: raw lines -> events -> correlation -> statistics.

use anyhow::Result;
use std::io::BufRead;
use std::time::Instant;

use crate::aggregator::{Aggregator, Statistics};
use crate::config::AnalyzerConfig;
use crate::correlator::{Correlator, Observation, OpenRequest};
use crate::error::Fault;
use crate::error_handling::FaultReporter;
use crate::event::Event;
use crate::parser::LineParser;
use crate::readers::NumberedLines;
use crate::report::Report;
use crate::stats::ProcessingStats;

/// Finished analysis: the report plus statistics about the run
#[derive(Debug)]
pub struct Analysis {
    pub report: Report,
    pub stats: ProcessingStats,
}

/// Everything a pipeline accumulated, before the report is derived
#[derive(Debug)]
pub struct PipelineParts {
    pub statistics: Statistics,
    pub open_requests: Vec<OpenRequest>,
    pub faults: FaultReporter,
    pub stats: ProcessingStats,
}

/// Owns the parser, correlator, aggregator and fault reporter for one pass
#[derive(Debug)]
pub struct Pipeline {
    parser: LineParser,
    correlator: Correlator,
    aggregator: Aggregator,
    faults: FaultReporter,
    stats: ProcessingStats,
}

impl Pipeline {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            parser: LineParser::new(),
            correlator: Correlator::new(),
            aggregator: Aggregator::new(),
            faults: FaultReporter::new(config.faults.clone()),
            stats: ProcessingStats::new(),
        }
    }

    /// Parse one raw line and feed it through. Malformed lines are counted and skipped.
    /// Errors only when the fault strategy asks to abort.
    pub fn process_line(&mut self, line_number: u64, line: &str) -> Result<()> {
        self.stats.lines_read += 1;
        match self.parser.parse(line) {
            Ok(event) => {
                self.stats.events_parsed += 1;
                self.process_event(&event.with_line_number(line_number))
            }
            Err(rejection) => {
                tracing::debug!(line = line_number, %rejection, "skipping line");
                self.stats.add_rejection(rejection);
                Ok(())
            }
        }
    }

    /// Correlate an already-parsed event and fold what it produces
    pub fn process_event(&mut self, event: &Event) -> Result<()> {
        match self.correlator.apply(event) {
            Ok(Some(observation)) => {
                self.aggregator.record(&observation);
                if let Observation::Completed(lifecycle) = &observation {
                    self.stats.requests_completed += 1;
                    if lifecycle.send_duration.is_none() {
                        self.fault(Fault::MissingSendTime {
                            line: lifecycle.line_number,
                            request_id: lifecycle.request_id.clone(),
                        })?;
                    }
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(fault) => self.fault(fault),
        }
    }

    fn fault(&mut self, fault: Fault) -> Result<()> {
        self.stats.faults += 1;
        let message = fault.to_string();
        if self.faults.report(fault) {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Aborted on data fault: {}", message))
        }
    }

    pub fn open_requests(&self) -> usize {
        self.correlator.open_requests()
    }

    /// End-of-stream pass: hand over the accumulators and the still-open requests
    pub fn into_parts(self) -> PipelineParts {
        let open_requests = self.correlator.drain_open();
        if !open_requests.is_empty() {
            tracing::info!(
                count = open_requests.len(),
                "requests still open at end of input"
            );
        }
        if self.faults.has_faults() {
            tracing::info!(count = self.faults.fault_count(), "data faults found");
        }
        PipelineParts {
            statistics: self.aggregator.finish(),
            open_requests,
            faults: self.faults,
            stats: self.stats,
        }
    }
}

impl PipelineParts {
    pub fn into_analysis(mut self, config: &AnalyzerConfig, started: Instant) -> Analysis {
        self.stats.finish(started);
        let report = Report::build(
            &self.statistics,
            &config.report,
            &self.open_requests,
            self.faults.summary(),
        );
        Analysis {
            report,
            stats: self.stats,
        }
    }
}

/// Run the whole input through one pipeline on the current thread
pub fn run_sequential<R: BufRead>(config: &AnalyzerConfig, reader: R) -> Result<Analysis> {
    let started = Instant::now();
    let mut pipeline = Pipeline::new(config);

    for line in NumberedLines::new(reader) {
        let (line_number, text) = line?;
        pipeline.process_line(line_number, &text)?;
    }

    tracing::debug!(open = pipeline.open_requests(), "input exhausted");
    Ok(pipeline.into_parts().into_analysis(config, started))
}
