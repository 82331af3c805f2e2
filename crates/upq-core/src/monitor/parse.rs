//! Parse the monitor's XML status document into a PollOutcome.
//!
//! The document is `<?xml version="1.0"?><m><s .../></m>` where the `s`
//! element carries exactly one of `p="bytesDone/totalBytes"` or
//! `v="complete"|"cancel"|"unknownpid"`.

use thiserror::Error;

use super::PollOutcome;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusParseError {
    #[error("status document has no <s> element")]
    MissingStatusElement,
    #[error("malformed progress attribute: {0:?}")]
    MalformedProgress(String),
    #[error("unknown status value: {0:?}")]
    UnknownValue(String),
    #[error("status element carries neither progress nor value")]
    EmptyStatus,
}

/// Parses a status document body.
pub fn parse_status(body: &str) -> Result<PollOutcome, StatusParseError> {
    let start = body
        .find("<s")
        .ok_or(StatusParseError::MissingStatusElement)?;
    let rest = &body[start..];
    let end = rest.find('>').ok_or(StatusParseError::MissingStatusElement)?;
    let element = &rest[..end];

    if let Some(progress) = attr(element, "p") {
        let (done, total) = progress
            .split_once('/')
            .ok_or_else(|| StatusParseError::MalformedProgress(progress.to_string()))?;
        let done: u64 = done
            .trim()
            .parse()
            .map_err(|_| StatusParseError::MalformedProgress(progress.to_string()))?;
        let total: u64 = total
            .trim()
            .parse()
            .map_err(|_| StatusParseError::MalformedProgress(progress.to_string()))?;
        return Ok(PollOutcome::Progress { done, total });
    }

    if let Some(value) = attr(element, "v") {
        return match value {
            "complete" => Ok(PollOutcome::Complete),
            "cancel" => Ok(PollOutcome::Cancelled),
            "unknownpid" => Ok(PollOutcome::UnknownPid),
            other => Err(StatusParseError::UnknownValue(other.to_string())),
        };
    }

    Err(StatusParseError::EmptyStatus)
}

/// Extracts a quoted attribute value from an element slice.
fn attr<'a>(element: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(" {}=\"", name);
    let start = element.find(&pattern)? + pattern.len();
    let rest = &element[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}
