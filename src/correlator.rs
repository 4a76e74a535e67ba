//! Per-request state machine that turns an interleaved event stream into
//! request lifecycles and backend observations.

use crate::error::Fault;
use crate::event::{Event, EventData};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static HTTP_AUTHORITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^http://(?P<authority>[^/]*)").expect("failed to compile URL regex"));

/// Identifier recorded for a backend: the authority of a `http://` URL,
/// or the raw URL text when it has another shape
pub fn target_identifier(url: &str) -> String {
    match HTTP_AUTHORITY_REGEX.captures(url) {
        Some(caps) => caps["authority"].to_string(),
        None => url.to_string(),
    }
}

/// Mutable state of one open request
#[derive(Debug, Clone)]
struct RequestState {
    start_time: i64,
    start_line: u64,
    send_time: Option<i64>,
    /// group id -> target identifier for backends not yet confirmed
    open_backends: HashMap<String, String>,
}

impl RequestState {
    fn new(start_time: i64, start_line: u64) -> Self {
        Self {
            start_time,
            start_line,
            send_time: None,
            open_backends: HashMap::new(),
        }
    }
}

/// Reconstructed record of one finished request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    pub request_id: String,
    /// Line of the FinishRequest event
    pub line_number: u64,
    pub total_duration: i64,
    /// None when StartSendResult was never observed
    pub send_duration: Option<i64>,
    pub unresolved_backends: usize,
}

impl Lifecycle {
    pub fn had_unresolved_backend(&self) -> bool {
        self.unresolved_backends > 0
    }
}

/// What the correlator hands to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Completed(Lifecycle),
    BackendSucceeded {
        group_id: String,
        target: String,
    },
    BackendFailed {
        group_id: String,
        target: String,
        error: String,
    },
}

/// A request still open when the stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub request_id: String,
    pub start_time: i64,
    pub line_number: u64,
    pub open_backends: usize,
}

#[derive(Debug, Default)]
pub struct Correlator {
    requests: HashMap<String, RequestState>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests started but not yet finished
    pub fn open_requests(&self) -> usize {
        self.requests.len()
    }

    /// Apply one event in stream order.
    ///
    /// Returns the observation the event produced, if any. Faults leave the
    /// state untouched, except `DuplicateStart`, which has already replaced
    /// the previous state when it is returned.
    pub fn apply(&mut self, event: &Event) -> Result<Option<Observation>, Fault> {
        let line = event.line_number;
        let request_id = &event.request_id;

        match &event.data {
            EventData::StartRequest => {
                let previous = self
                    .requests
                    .insert(request_id.clone(), RequestState::new(event.timestamp, line));
                match previous {
                    Some(_) => Err(Fault::DuplicateStart {
                        line,
                        request_id: request_id.clone(),
                    }),
                    None => Ok(None),
                }
            }
            EventData::StartMerge | EventData::BackendRequest { .. } => Ok(None),
            EventData::StartSendResult => {
                self.state_mut(event)?.send_time = Some(event.timestamp);
                Ok(None)
            }
            EventData::BackendConnect { group_id, url } => {
                let target = target_identifier(url);
                self.state_mut(event)?
                    .open_backends
                    .insert(group_id.clone(), target);
                Ok(None)
            }
            EventData::BackendError { group_id, error } => {
                let state = self.state_mut(event)?;
                let target = state
                    .open_backends
                    .get(group_id)
                    .cloned()
                    .ok_or_else(|| unknown_backend(event, group_id))?;
                Ok(Some(Observation::BackendFailed {
                    group_id: group_id.clone(),
                    target,
                    error: error.clone(),
                }))
            }
            EventData::BackendOk { group_id } => {
                let state = self.state_mut(event)?;
                let target = state
                    .open_backends
                    .remove(group_id)
                    .ok_or_else(|| unknown_backend(event, group_id))?;
                Ok(Some(Observation::BackendSucceeded {
                    group_id: group_id.clone(),
                    target,
                }))
            }
            EventData::FinishRequest => {
                let state = self
                    .requests
                    .remove(request_id)
                    .ok_or_else(|| unknown_request(event))?;
                Ok(Some(Observation::Completed(Lifecycle {
                    request_id: request_id.clone(),
                    line_number: line,
                    total_duration: event.timestamp - state.start_time,
                    send_duration: state.send_time.map(|send| event.timestamp - send),
                    unresolved_backends: state.open_backends.len(),
                })))
            }
        }
    }

    /// Consume the correlator, listing requests that never finished by start line
    pub fn drain_open(self) -> Vec<OpenRequest> {
        let mut open: Vec<OpenRequest> = self
            .requests
            .into_iter()
            .map(|(request_id, state)| OpenRequest {
                request_id,
                start_time: state.start_time,
                line_number: state.start_line,
                open_backends: state.open_backends.len(),
            })
            .collect();
        open.sort_by(|a, b| {
            a.line_number
                .cmp(&b.line_number)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        open
    }

    fn state_mut(&mut self, event: &Event) -> Result<&mut RequestState, Fault> {
        self.requests
            .get_mut(&event.request_id)
            .ok_or_else(|| unknown_request(event))
    }
}

fn unknown_request(event: &Event) -> Fault {
    Fault::UnknownRequest {
        line: event.line_number,
        request_id: event.request_id.clone(),
        kind: event.kind(),
    }
}

fn unknown_backend(event: &Event, group_id: &str) -> Fault {
    Fault::UnknownBackend {
        line: event.line_number,
        request_id: event.request_id.clone(),
        group_id: group_id.to_string(),
        kind: event.kind(),
    }
}
