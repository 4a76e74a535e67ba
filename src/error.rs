use crate::event::EventKind;
use thiserror::Error;

/// Data-integrity faults found while correlating events.
///
/// Faults are local to the offending line: the stream keeps going unless the
/// configured strategy is to abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A correlation event for a request that was never started (or already finished)
    #[error("line {line}: {kind} for request {request_id} which is not open")]
    UnknownRequest {
        line: u64,
        request_id: String,
        kind: EventKind,
    },

    /// A backend result for a group that has no open connection in its request
    #[error("line {line}: {kind} for backend group {group_id} of request {request_id} which was never connected")]
    UnknownBackend {
        line: u64,
        request_id: String,
        group_id: String,
        kind: EventKind,
    },

    /// A second StartRequest for a request that is still open; the new start wins
    #[error("line {line}: request {request_id} started again while still open")]
    DuplicateStart { line: u64, request_id: String },

    /// A request finished without ever reaching StartSendResult
    #[error("line {line}: request {request_id} finished without StartSendResult")]
    MissingSendTime { line: u64, request_id: String },
}

impl Fault {
    /// Short category name used for per-kind tallies
    pub fn category(&self) -> &'static str {
        match self {
            Fault::UnknownRequest { .. } => "unknown_request",
            Fault::UnknownBackend { .. } => "unknown_backend",
            Fault::DuplicateStart { .. } => "duplicate_start",
            Fault::MissingSendTime { .. } => "missing_send_time",
        }
    }

    pub fn line(&self) -> u64 {
        match self {
            Fault::UnknownRequest { line, .. }
            | Fault::UnknownBackend { line, .. }
            | Fault::DuplicateStart { line, .. }
            | Fault::MissingSendTime { line, .. } => *line,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Fault::UnknownRequest { request_id, .. }
            | Fault::UnknownBackend { request_id, .. }
            | Fault::DuplicateStart { request_id, .. }
            | Fault::MissingSendTime { request_id, .. } => request_id,
        }
    }
}
