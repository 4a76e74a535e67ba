//! Sharded processing: requests are partitioned by id across worker threads.
//!
//! The reader thread parses lines and routes each event to the shard owning
//! its request id, so every request's state lives in exactly one worker.
//! Workers keep private accumulators; they are merged once the input ends.

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::AnalyzerConfig;
use crate::event::Event;
use crate::parser::LineParser;
use crate::pipeline::{Analysis, Pipeline, PipelineParts};
use crate::readers::NumberedLines;
use crate::stats::ProcessingStats;

/// Batches in flight per worker before the reader blocks
const CHANNEL_DEPTH: usize = 4;

/// Upper bound on the capacity reserved up front for a pending batch
const MAX_BATCH_RESERVE: usize = 4096;

/// Configuration for sharded processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub num_workers: usize,
    pub batch_size: usize,
}

impl ParallelConfig {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            num_workers: config.effective_threads().max(1),
            batch_size: config.effective_batch_size(),
        }
    }
}

/// Shard index for a request id. Ids are decimal, so their value spreads evenly.
pub fn shard_for(request_id: &str, shards: usize) -> usize {
    let key = request_id.parse::<u64>().unwrap_or_else(|_| {
        request_id
            .bytes()
            .fold(0u64, |hash, b| hash.wrapping_mul(31).wrapping_add(u64::from(b)))
    });
    (key % shards as u64) as usize
}

struct Shard {
    sender: Sender<Vec<Event>>,
    pending: Vec<Event>,
    handle: JoinHandle<Result<PipelineParts>>,
}

fn worker_thread(
    shard_id: usize,
    receiver: Receiver<Vec<Event>>,
    config: AnalyzerConfig,
) -> Result<PipelineParts> {
    let mut pipeline = Pipeline::new(&config);
    for batch in receiver {
        for event in &batch {
            pipeline.process_event(event)?;
        }
    }
    tracing::debug!(shard = shard_id, open = pipeline.open_requests(), "shard drained");
    Ok(pipeline.into_parts())
}

pub struct ParallelProcessor {
    config: ParallelConfig,
}

impl ParallelProcessor {
    pub fn new(config: ParallelConfig) -> Self {
        Self {
            config: ParallelConfig {
                num_workers: config.num_workers.max(1),
                batch_size: config.batch_size.max(1),
            },
        }
    }

    pub fn run<R: BufRead>(&self, config: &AnalyzerConfig, reader: R) -> Result<Analysis> {
        let started = Instant::now();
        let workers = self.config.num_workers;
        let batch_size = self.config.batch_size;
        let reserve = batch_size.min(MAX_BATCH_RESERVE);
        tracing::info!(workers, batch_size, "starting sharded processing");

        let mut shards: Vec<Shard> = (0..workers)
            .map(|shard_id| {
                let (sender, receiver) = bounded(CHANNEL_DEPTH);
                let worker_config = config.clone();
                let handle = thread::Builder::new()
                    .name(format!("reqlog-shard-{}", shard_id))
                    .spawn(move || worker_thread(shard_id, receiver, worker_config))
                    .map_err(|e| anyhow!("Failed to spawn worker thread: {}", e))?;
                Ok(Shard {
                    sender,
                    pending: Vec::with_capacity(reserve),
                    handle,
                })
            })
            .collect::<Result<_>>()?;

        let parser = LineParser::new();
        let mut reader_stats = ProcessingStats::new();
        // Set when a worker has hung up early (it aborted on a fault)
        let mut worker_stopped = false;
        let mut read_error = None;

        for line in NumberedLines::new(reader) {
            let (line_number, text) = match line {
                Ok(line) => line,
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            };
            reader_stats.lines_read += 1;
            let event = match parser.parse(&text) {
                Ok(event) => event.with_line_number(line_number),
                Err(rejection) => {
                    tracing::debug!(line = line_number, %rejection, "skipping line");
                    reader_stats.add_rejection(rejection);
                    continue;
                }
            };
            reader_stats.events_parsed += 1;

            let shard = &mut shards[shard_for(&event.request_id, workers)];
            shard.pending.push(event);
            if shard.pending.len() >= batch_size {
                let batch = std::mem::replace(&mut shard.pending, Vec::with_capacity(reserve));
                if shard.sender.send(batch).is_err() {
                    worker_stopped = true;
                    break;
                }
            }
        }

        let mut handles = Vec::with_capacity(workers);
        for shard in shards {
            if !worker_stopped && !shard.pending.is_empty() {
                // A failed send means the worker already stopped; its join result says why
                let _ = shard.sender.send(shard.pending);
            }
            drop(shard.sender);
            handles.push(shard.handle);
        }

        let mut merged: Option<PipelineParts> = None;
        let mut first_error = None;
        for handle in handles {
            let result = handle
                .join()
                .map_err(|_| anyhow!("Worker thread panicked"))
                .and_then(|result| result);
            match result {
                Ok(parts) => match merged.as_mut() {
                    Some(total) => merge_parts(total, parts),
                    None => merged = Some(parts),
                },
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if let Some(e) = read_error {
            return Err(e.into());
        }

        let mut parts = merged.ok_or_else(|| anyhow!("No worker produced results"))?;
        let shard_stats = std::mem::replace(&mut parts.stats, reader_stats);
        parts.stats.merge_shard(&shard_stats);
        parts.stats.shards = workers;
        Ok(parts.into_analysis(config, started))
    }
}

fn merge_parts(total: &mut PipelineParts, parts: PipelineParts) {
    total.statistics.merge(parts.statistics);
    total.open_requests.extend(parts.open_requests);
    total.open_requests.sort_by(|a, b| {
        a.line_number
            .cmp(&b.line_number)
            .then_with(|| a.request_id.cmp(&b.request_id))
    });
    total.faults.merge(parts.faults);
    total.stats.merge_shard(&parts.stats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultStrategy;
    use crate::pipeline::run_sequential;
    use std::io::Cursor;

    fn synthetic_log(requests: u64) -> String {
        let mut lines = Vec::new();
        let mut ts = 1390917600000000i64;
        // Interleave requests in pairs so shards see cross-request ordering
        for pair in (0..requests).step_by(2) {
            for id in [pair, pair + 1] {
                lines.push(format!("{:016}\t{}\tStartRequest", ts, id));
                ts += 3;
                lines.push(format!("{:016}\t{}\tBackendConnect\t{}\thttp://b{}.example/x", ts, id, id % 3, id % 5));
                ts += 1;
            }
            for id in [pair, pair + 1] {
                if id % 4 == 0 {
                    lines.push(format!("{:016}\t{}\tBackendError\t{}\ttimeout", ts, id, id % 3));
                } else {
                    lines.push(format!("{:016}\t{}\tBackendOk\t{}", ts, id, id % 3));
                }
                ts += (id % 7) as i64;
                if id % 9 != 0 {
                    lines.push(format!("{:016}\t{}\tStartSendResult", ts, id));
                }
                ts += (id % 11) as i64;
                if id % 13 != 5 {
                    lines.push(format!("{:016}\t{}\tFinishRequest", ts, id));
                }
                ts += 2;
            }
        }
        lines.push("not an event".to_string());
        lines.push(format!("{:016}\t99999\tBackendOk\t1", ts));
        lines.join("\n")
    }

    fn config_with_threads(threads: usize) -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.performance.threads = threads;
        config.performance.batch_size = Some(7);
        config
    }

    fn run_parallel(text: &str, config: &AnalyzerConfig) -> Result<Analysis> {
        ParallelProcessor::new(ParallelConfig::from_config(config))
            .run(config, Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_shard_for_is_stable() {
        assert_eq!(shard_for("10", 4), 2);
        assert_eq!(shard_for("10", 4), shard_for("0010", 4));
        assert!(shard_for("abc", 3) < 3);
        assert_eq!(shard_for("7", 1), 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let log = synthetic_log(200);
        let sequential = run_sequential(
            &AnalyzerConfig::default(),
            Cursor::new(log.as_bytes().to_vec()),
        )
        .unwrap();

        for threads in [1, 3, 4] {
            let parallel = run_parallel(&log, &config_with_threads(threads)).unwrap();
            assert_eq!(parallel.report, sequential.report, "threads = {}", threads);
            assert_eq!(parallel.stats.lines_read, sequential.stats.lines_read);
            assert_eq!(parallel.stats.lines_rejected, 1);
            assert_eq!(
                parallel.stats.requests_completed,
                sequential.stats.requests_completed
            );
            assert_eq!(parallel.stats.faults, sequential.stats.faults);
            assert_eq!(parallel.stats.shards, threads);
        }
    }

    #[test]
    fn test_parallel_abort_propagates() {
        let mut config = config_with_threads(2);
        config.faults.strategy = FaultStrategy::Abort;
        let log = "1390917600000000\t4\tFinishRequest\n1390917600000001\t5\tStartRequest\n";
        let err = run_parallel(log, &config).unwrap_err().to_string();
        assert!(err.contains("Aborted on data fault"));
    }

    #[test]
    fn test_zero_workers_and_batch_are_clamped() {
        let config = AnalyzerConfig::default();
        let processor = ParallelProcessor::new(ParallelConfig {
            num_workers: 0,
            batch_size: 0,
        });
        let log = "1390917600000000\t1\tStartRequest\n1390917600000001\t1\tFinishRequest\n";
        let analysis = processor
            .run(&config, Cursor::new(log.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(analysis.report.completed_requests, 1);
        assert_eq!(analysis.stats.shards, 1);
    }

    #[test]
    fn test_huge_batch_size_does_not_preallocate() {
        let log = synthetic_log(20);
        let mut config = config_with_threads(2);
        config.performance.batch_size = Some(usize::MAX);
        let parallel = run_parallel(&log, &config).unwrap();
        let sequential = run_sequential(
            &AnalyzerConfig::default(),
            Cursor::new(log.as_bytes().to_vec()),
        )
        .unwrap();
        assert_eq!(parallel.report, sequential.report);
    }

    #[test]
    fn test_parallel_empty_input() {
        let analysis = run_parallel("", &config_with_threads(2)).unwrap();
        assert_eq!(analysis.report.completed_requests, 0);
        assert_eq!(analysis.report.latency, None);
    }
}
