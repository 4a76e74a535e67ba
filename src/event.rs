use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The closed set of event kinds a dispatch server writes to its log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventKind {
    StartRequest,
    BackendConnect,
    BackendRequest,
    BackendOk,
    BackendError,
    StartMerge,
    StartSendResult,
    FinishRequest,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::StartRequest,
        EventKind::BackendConnect,
        EventKind::BackendRequest,
        EventKind::BackendOk,
        EventKind::BackendError,
        EventKind::StartMerge,
        EventKind::StartSendResult,
        EventKind::FinishRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StartRequest => "StartRequest",
            EventKind::BackendConnect => "BackendConnect",
            EventKind::BackendRequest => "BackendRequest",
            EventKind::BackendOk => "BackendOk",
            EventKind::BackendError => "BackendError",
            EventKind::StartMerge => "StartMerge",
            EventKind::StartSendResult => "StartSendResult",
            EventKind::FinishRequest => "FinishRequest",
        }
    }

    /// Whether lines of this kind carry a tab-separated tail that must be parsed
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            EventKind::BackendConnect
                | EventKind::BackendRequest
                | EventKind::BackendOk
                | EventKind::BackendError
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown event kind: {}", s))
    }
}

/// Kind-specific payload; each variant holds only the fields valid for its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    StartRequest,
    BackendConnect { group_id: String, url: String },
    BackendRequest { group_id: String },
    BackendOk { group_id: String },
    BackendError { group_id: String, error: String },
    StartMerge,
    StartSendResult,
    FinishRequest,
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::StartRequest => EventKind::StartRequest,
            EventData::BackendConnect { .. } => EventKind::BackendConnect,
            EventData::BackendRequest { .. } => EventKind::BackendRequest,
            EventData::BackendOk { .. } => EventKind::BackendOk,
            EventData::BackendError { .. } => EventKind::BackendError,
            EventData::StartMerge => EventKind::StartMerge,
            EventData::StartSendResult => EventKind::StartSendResult,
            EventData::FinishRequest => EventKind::FinishRequest,
        }
    }
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: i64,
    pub request_id: String,
    pub data: EventData,
    /// 1-based position in the input, 0 when the event did not come from a stream
    pub line_number: u64,
}

impl Event {
    pub fn new(timestamp: i64, request_id: impl Into<String>, data: EventData) -> Self {
        Self {
            timestamp,
            request_id: request_id.into(),
            data,
            line_number: 0,
        }
    }

    pub fn with_line_number(mut self, line_number: u64) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Renders the canonical log line (without trailing newline)
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016}\t{}\t{}", self.timestamp, self.request_id, self.kind())?;
        match &self.data {
            EventData::BackendConnect { group_id, url } => write!(f, "\t{}\t{}", group_id, url),
            EventData::BackendRequest { group_id } | EventData::BackendOk { group_id } => {
                write!(f, "\t{}", group_id)
            }
            EventData::BackendError { group_id, error } => write!(f, "\t{}\t{}", group_id, error),
            EventData::StartRequest
            | EventData::StartMerge
            | EventData::StartSendResult
            | EventData::FinishRequest => Ok(()),
        }
    }
}
