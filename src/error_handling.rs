use std::collections::BTreeMap;

use crate::config::{FaultConfig, FaultStrategy};
use crate::error::Fault;
use crate::report::FaultSummary;

/// Collects data-integrity faults according to the configured strategy
#[derive(Debug)]
pub struct FaultReporter {
    config: FaultConfig,
    total: u64,
    counts: BTreeMap<&'static str, u64>,
    /// Earliest faults by line, capped at `config.max_examples`
    examples: Vec<Fault>,
}

impl FaultReporter {
    pub fn new(config: FaultConfig) -> Self {
        Self {
            config,
            total: 0,
            counts: BTreeMap::new(),
            examples: Vec::new(),
        }
    }

    /// Record a fault. Returns false when processing should stop.
    pub fn report(&mut self, fault: Fault) -> bool {
        tracing::debug!(
            category = fault.category(),
            line = fault.line(),
            request_id = fault.request_id(),
            "{}",
            fault
        );

        let should_continue = match self.config.strategy {
            FaultStrategy::Collect => true,
            FaultStrategy::Print => {
                eprintln!("reqlog: {}", fault);
                true
            }
            FaultStrategy::Abort => false,
        };

        self.track(fault);
        should_continue
    }

    fn track(&mut self, fault: Fault) {
        self.total += 1;
        *self.counts.entry(fault.category()).or_insert(0) += 1;
        if self.examples.len() < self.config.max_examples {
            self.examples.push(fault);
        }
    }

    /// Fold in the faults collected by another reporter (a shard worker)
    pub fn merge(&mut self, other: FaultReporter) {
        self.total += other.total;
        for (category, count) in other.counts {
            *self.counts.entry(category).or_insert(0) += count;
        }
        self.examples.extend(other.examples);
        self.examples.sort_by_key(|fault| fault.line());
        self.examples.truncate(self.config.max_examples);
    }

    pub fn has_faults(&self) -> bool {
        self.total > 0
    }

    pub fn fault_count(&self) -> u64 {
        self.total
    }

    pub fn summary(&self) -> FaultSummary {
        FaultSummary {
            total: self.total,
            by_category: self
                .counts
                .iter()
                .map(|(category, count)| (category.to_string(), *count))
                .collect(),
            examples: self.examples.iter().map(|fault| fault.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_send(line: u64) -> Fault {
        Fault::MissingSendTime {
            line,
            request_id: line.to_string(),
        }
    }

    fn reporter(strategy: FaultStrategy, max_examples: usize) -> FaultReporter {
        FaultReporter::new(FaultConfig {
            strategy,
            max_examples,
        })
    }

    #[test]
    fn test_collect_keeps_going_and_caps_examples() {
        let mut faults = reporter(FaultStrategy::Collect, 2);
        for line in 1..=5 {
            assert!(faults.report(missing_send(line)));
        }
        faults.report(Fault::DuplicateStart {
            line: 6,
            request_id: "6".to_string(),
        });

        let summary = faults.summary();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.by_category["missing_send_time"], 5);
        assert_eq!(summary.by_category["duplicate_start"], 1);
        assert_eq!(summary.examples.len(), 2);
        assert!(summary.examples[0].starts_with("line 1:"));
    }

    #[test]
    fn test_abort_stops() {
        let mut faults = reporter(FaultStrategy::Abort, 10);
        assert!(!faults.report(missing_send(3)));
        assert!(faults.has_faults());
        assert_eq!(faults.fault_count(), 1);
    }

    #[test]
    fn test_merge_keeps_earliest_examples() {
        let mut left = reporter(FaultStrategy::Collect, 3);
        left.report(missing_send(2));
        left.report(missing_send(8));
        let mut right = reporter(FaultStrategy::Collect, 3);
        right.report(missing_send(1));
        right.report(missing_send(5));

        left.merge(right);
        let examples = left.summary().examples;
        assert_eq!(examples.len(), 3);
        assert!(examples[0].starts_with("line 1:"));
        assert!(examples[1].starts_with("line 2:"));
        assert!(examples[2].starts_with("line 5:"));
        assert_eq!(left.fault_count(), 4);
    }

    #[test]
    fn test_empty_summary() {
        let faults = reporter(FaultStrategy::Print, 10);
        assert!(!faults.has_faults());
        assert_eq!(faults.summary(), FaultSummary::default());
    }
}
