use std::time::{Duration, Instant};

use crate::parser::Rejection;

/// Statistics about the processing run itself (not the analyzed requests)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub lines_read: u64,
    pub lines_rejected: u64,
    pub rejected_no_match: u64,
    pub rejected_payload: u64,
    pub events_parsed: u64,
    pub requests_completed: u64,
    pub faults: u64,
    pub shards: usize,
    pub processing_time: Duration,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            shards: 1,
            ..Default::default()
        }
    }

    pub fn add_rejection(&mut self, rejection: Rejection) {
        self.lines_rejected += 1;
        match rejection {
            Rejection::NoMatch => self.rejected_no_match += 1,
            Rejection::MissingPayload(_) | Rejection::BadPayload(_) => self.rejected_payload += 1,
        }
    }

    /// Fold the counters of a shard worker into these stats
    pub fn merge_shard(&mut self, shard: &ProcessingStats) {
        self.requests_completed += shard.requests_completed;
        self.faults += shard.faults;
    }

    pub fn finish(&mut self, start: Instant) {
        self.processing_time = start.elapsed();
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Lines processed: {} total, {} events, {} rejected",
            self.lines_read, self.events_parsed, self.lines_rejected
        );

        if self.lines_rejected > 0 {
            output.push_str(&format!(
                " ({} unmatched, {} bad payload)",
                self.rejected_no_match, self.rejected_payload
            ));
        }

        output.push_str(&format!("; {} requests completed", self.requests_completed));

        if self.faults > 0 {
            output.push_str(&format!(", {} faults", self.faults));
        }

        if self.shards > 1 {
            output.push_str(&format!(", {} shards", self.shards));
        }

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.lines_read > 0 {
            let lines_per_sec = (self.lines_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} lines/s)", lines_per_sec));
        }

        output
    }
}
