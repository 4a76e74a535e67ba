//! Two-tier parser for dispatch-server event lines.
//!
//! The outer pattern splits a line into timestamp, request id, kind and an
//! optional tab-separated tail. Kinds that carry a payload then run the tail
//! through a kind-specific pattern. Lines failing either tier are rejected,
//! never fatal.
//!
//! Both tiers are anchored at the end of the line and accept only ASCII
//! digits. Older prefix-matching tools read `StartRequestX` as a
//! StartRequest and `BackendOk\t12abc` as group 12; here both lines are
//! rejected.

use crate::event::{Event, EventData, EventKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const LINE_PATTERN: &str = concat!(
    r"^(?P<time>[0-9]{16})\t",
    r"(?P<id>[0-9]{1,8})\t",
    r"(?P<kind>StartRequest|BackendConnect|BackendRequest|BackendOk|BackendError|",
    r"StartMerge|StartSendResult|FinishRequest)",
    r"(?:\t(?P<tail>.*))?$",
);
const GROUP_PATTERN: &str = r"^(?P<group>[0-9]{1,8})$";
const GROUP_WITH_TEXT_PATTERN: &str = r"^(?P<group>[0-9]{1,8})\t(?P<text>.*)$";

static LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(LINE_PATTERN).expect("failed to compile event line regex"));
static GROUP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(GROUP_PATTERN).expect("failed to compile backend group regex"));
static GROUP_WITH_TEXT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(GROUP_WITH_TEXT_PATTERN).expect("failed to compile backend group/text regex")
});

/// Why a line did not become an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The outer timestamp/id/kind pattern did not match
    NoMatch,
    /// A payload kind arrived without a tail
    MissingPayload(EventKind),
    /// The tail did not match the kind-specific pattern
    BadPayload(EventKind),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoMatch => write!(f, "line does not match the event pattern"),
            Rejection::MissingPayload(kind) => write!(f, "{} line has no payload", kind),
            Rejection::BadPayload(kind) => write!(f, "{} payload is malformed", kind),
        }
    }
}

/// Parser for tab-separated event lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one line; a trailing `\n` or `\r\n` is ignored
    pub fn parse(&self, line: &str) -> Result<Event, Rejection> {
        let line = line.trim_end_matches(['\r', '\n']);
        let captures = LINE_REGEX.captures(line).ok_or(Rejection::NoMatch)?;

        // Sixteen digits always fit an i64
        let timestamp = captures["time"]
            .parse::<i64>()
            .map_err(|_| Rejection::NoMatch)?;
        let request_id = captures["id"].to_string();
        let kind = captures["kind"]
            .parse::<EventKind>()
            .map_err(|_| Rejection::NoMatch)?;
        let tail = captures.name("tail").map(|m| m.as_str());

        let data = Self::parse_payload(kind, tail)?;
        Ok(Event::new(timestamp, request_id, data))
    }

    fn parse_payload(kind: EventKind, tail: Option<&str>) -> Result<EventData, Rejection> {
        let tail = match tail {
            Some(tail) => tail,
            None if kind.has_payload() => return Err(Rejection::MissingPayload(kind)),
            None => "",
        };

        match kind {
            // Any tail on a payload-less kind is ignored
            EventKind::StartRequest => Ok(EventData::StartRequest),
            EventKind::StartMerge => Ok(EventData::StartMerge),
            EventKind::StartSendResult => Ok(EventData::StartSendResult),
            EventKind::FinishRequest => Ok(EventData::FinishRequest),
            EventKind::BackendConnect | EventKind::BackendError => {
                let caps = GROUP_WITH_TEXT_REGEX
                    .captures(tail)
                    .ok_or(Rejection::BadPayload(kind))?;
                let group_id = caps["group"].to_string();
                let text = caps["text"].to_string();
                Ok(if kind == EventKind::BackendConnect {
                    EventData::BackendConnect { group_id, url: text }
                } else {
                    EventData::BackendError {
                        group_id,
                        error: text,
                    }
                })
            }
            EventKind::BackendRequest | EventKind::BackendOk => {
                let caps = GROUP_REGEX
                    .captures(tail)
                    .ok_or(Rejection::BadPayload(kind))?;
                let group_id = caps["group"].to_string();
                Ok(if kind == EventKind::BackendOk {
                    EventData::BackendOk { group_id }
                } else {
                    EventData::BackendRequest { group_id }
                })
            }
        }
    }
}
