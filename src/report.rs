//! Report model derived from the final statistics.
//!
//! Everything here is a pure read of [`Statistics`]; the formatters in
//! `formatters.rs` decide how it is rendered.

use crate::aggregator::{SendTiming, Statistics};
use crate::config::ReportConfig;
use crate::correlator::OpenRequest;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

/// Percentile of request durations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Percentile {
    pub percentile: u8,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlowSend {
    pub request_id: String,
    pub send_duration: i64,
}

/// Touches and errors for one target of a backend group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendTally {
    pub touches: u64,
    pub successes: u64,
    pub errors: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnfinishedRequest {
    pub request_id: String,
    pub start_time: i64,
    pub line: u64,
    pub open_backends: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnfinishedSummary {
    pub count: usize,
    pub examples: Vec<UnfinishedRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FaultSummary {
    pub total: u64,
    pub by_category: BTreeMap<String, u64>,
    pub examples: Vec<String>,
}

/// Immutable snapshot handed to the formatters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub completed_requests: usize,
    /// None when no request completed
    pub latency: Option<Percentile>,
    pub slowest_sends: Vec<SlowSend>,
    pub partial_failures: u64,
    pub missing_send_time: u64,
    /// group id -> target -> tally
    pub backends: BTreeMap<String, BTreeMap<String, BackendTally>>,
    pub unfinished: UnfinishedSummary,
    pub faults: FaultSummary,
}

impl Report {
    pub fn build(
        stats: &Statistics,
        config: &ReportConfig,
        unfinished: &[OpenRequest],
        faults: FaultSummary,
    ) -> Self {
        let latency = percentile(&stats.durations, config.percentile).map(|value| Percentile {
            percentile: config.percentile,
            value,
        });

        let slowest_sends = slowest_sends(&stats.send_rankings, config.top)
            .into_iter()
            .map(|timing| SlowSend {
                request_id: timing.request_id.clone(),
                send_duration: timing.send_duration,
            })
            .collect();

        let unfinished = UnfinishedSummary {
            count: unfinished.len(),
            examples: unfinished
                .iter()
                .take(config.unfinished_examples)
                .map(|open| UnfinishedRequest {
                    request_id: open.request_id.clone(),
                    start_time: open.start_time,
                    line: open.line_number,
                    open_backends: open.open_backends,
                })
                .collect(),
        };

        Report {
            completed_requests: stats.completed_requests(),
            latency,
            slowest_sends,
            partial_failures: stats.partial_failure_count,
            missing_send_time: stats.missing_send_count,
            backends: backend_report(stats),
            unfinished,
            faults,
        }
    }
}

/// 0-based rank index for `pct` over `count` sorted values: `floor(count * pct / 100)`,
/// clamped to the last element. None for an empty distribution.
pub fn percentile_index(count: usize, pct: u8) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let pct = usize::from(pct.min(100));
    Some((count * pct / 100).min(count - 1))
}

/// Rank-index percentile over unsorted values
pub fn percentile(values: &[i64], pct: u8) -> Option<i64> {
    let index = percentile_index(values.len(), pct)?;
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    Some(sorted[index])
}

/// Heap entry ordered so the "largest" entry is the slowest send; among equal
/// durations the earlier finish ranks higher
struct Ranked<'a>(&'a SendTiming);

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .send_duration
            .cmp(&other.0.send_duration)
            .then_with(|| other.0.line_number.cmp(&self.0.line_number))
            .then_with(|| other.0.request_id.cmp(&self.0.request_id))
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

/// The `n` slowest sends, slowest first, via a bounded min-heap
pub fn slowest_sends(rankings: &[SendTiming], n: usize) -> Vec<&SendTiming> {
    if n == 0 {
        return Vec::new();
    }
    // `n` comes from the command line; never reserve more than there are candidates
    let mut heap: BinaryHeap<Reverse<Ranked<'_>>> =
        BinaryHeap::with_capacity(n.min(rankings.len()) + 1);
    for timing in rankings {
        heap.push(Reverse(Ranked(timing)));
        if heap.len() > n {
            heap.pop();
        }
    }
    // Ascending order of Reverse is descending order of Ranked
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(Ranked(timing))| timing)
        .collect()
}

/// Nested per-group, per-target tallies over the union of success and error keys
pub fn backend_report(stats: &Statistics) -> BTreeMap<String, BTreeMap<String, BackendTally>> {
    let mut groups: BTreeMap<String, BTreeMap<String, BackendTally>> = BTreeMap::new();

    for ((group_id, target), count) in &stats.backend_success_counts {
        let tally = groups
            .entry(group_id.clone())
            .or_default()
            .entry(target.clone())
            .or_default();
        tally.successes += count;
        tally.touches += count;
    }

    for ((group_id, target, error), count) in &stats.backend_error_counts {
        let tally = groups
            .entry(group_id.clone())
            .or_default()
            .entry(target.clone())
            .or_default();
        *tally.errors.entry(error.clone()).or_insert(0) += count;
        tally.touches += count;
    }

    groups
}
