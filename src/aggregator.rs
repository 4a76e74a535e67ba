//! Running statistics folded from completed lifecycles and backend observations.

use crate::correlator::{Lifecycle, Observation};
use std::collections::HashMap;

/// Send-phase timing of one finished request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTiming {
    pub request_id: String,
    pub send_duration: i64,
    /// Line of the FinishRequest event; orders ties by completion
    pub line_number: u64,
}

/// Append/increment-only accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub durations: Vec<i64>,
    pub send_rankings: Vec<SendTiming>,
    pub partial_failure_count: u64,
    pub missing_send_count: u64,
    /// (group id, target) -> successes
    pub backend_success_counts: HashMap<(String, String), u64>,
    /// (group id, target, error text) -> occurrences
    pub backend_error_counts: HashMap<(String, String, String), u64>,
}

impl Statistics {
    pub fn completed_requests(&self) -> usize {
        self.durations.len()
    }

    /// Fold another partial accumulator into this one
    pub fn merge(&mut self, other: Statistics) {
        self.durations.extend(other.durations);
        self.send_rankings.extend(other.send_rankings);
        self.partial_failure_count += other.partial_failure_count;
        self.missing_send_count += other.missing_send_count;
        for (key, count) in other.backend_success_counts {
            *self.backend_success_counts.entry(key).or_insert(0) += count;
        }
        for (key, count) in other.backend_error_counts {
            *self.backend_error_counts.entry(key).or_insert(0) += count;
        }
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    stats: Statistics,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, observation: &Observation) {
        match observation {
            Observation::Completed(lifecycle) => self.record_lifecycle(lifecycle),
            Observation::BackendSucceeded { group_id, target } => {
                *self
                    .stats
                    .backend_success_counts
                    .entry((group_id.clone(), target.clone()))
                    .or_insert(0) += 1;
            }
            Observation::BackendFailed {
                group_id,
                target,
                error,
            } => {
                *self
                    .stats
                    .backend_error_counts
                    .entry((group_id.clone(), target.clone(), error.clone()))
                    .or_insert(0) += 1;
            }
        }
    }

    fn record_lifecycle(&mut self, lifecycle: &Lifecycle) {
        self.stats.durations.push(lifecycle.total_duration);
        match lifecycle.send_duration {
            Some(send_duration) => self.stats.send_rankings.push(SendTiming {
                request_id: lifecycle.request_id.clone(),
                send_duration,
                line_number: lifecycle.line_number,
            }),
            None => self.stats.missing_send_count += 1,
        }
        if lifecycle.had_unresolved_backend() {
            self.stats.partial_failure_count += 1;
        }
    }

    pub fn finish(self) -> Statistics {
        self.stats
    }
}
