//! Response Envelope Decoding
//!
//! The tool backend answers RPC calls either with a plain JSON document
//! or with a text event-stream whose `data:` frames carry JSON-RPC
//! payloads. The transport layer classifies the body by content type
//! into [`ResponseBody`]; this module normalizes either shape into a
//! single JSON value for callers.
//!
//! When a stream carries several parseable `data:` frames, the last one
//! wins: a streaming upstream emits partial results first and the final
//! result last.

use serde_json::Value;

/// An upstream response body, tagged at the transport boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body was `application/json` and is already parsed.
    PlainJson(Value),
    /// The body was `text/event-stream`; frames are not yet parsed.
    EventStream(String),
}

/// Failure to extract a JSON payload from a response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// An event-stream body contained no `data:` frame with parseable JSON.
    #[error("event stream contained no parseable data frame")]
    NoDataFrame,
}

/// Normalize a response body into a single JSON value.
///
/// Plain JSON passes through unchanged. For an event stream, the last
/// `data:` frame carrying parseable JSON is selected; its `result`
/// field is returned when present, otherwise the whole frame object.
///
/// # Errors
///
/// Returns [`DecodeError::NoDataFrame`] when a stream-shaped body has
/// no parseable `data:` frame. A malformed upstream response is an
/// error, never a silent empty value.
pub fn decode(body: ResponseBody) -> Result<Value, DecodeError> {
    match body {
        ResponseBody::PlainJson(value) => Ok(value),
        ResponseBody::EventStream(text) => {
            let payload = last_data_frame(&text).ok_or(DecodeError::NoDataFrame)?;
            Ok(unwrap_result(payload))
        }
    }
}

/// Find the last `data:` line whose payload parses as JSON.
fn last_data_frame(text: &str) -> Option<Value> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|payload| serde_json::from_str::<Value>(payload.trim_start()).ok())
        .last()
}

/// Pull the JSON-RPC `result` field out of a frame, if it has one.
fn unwrap_result(frame: Value) -> Value {
    match frame {
        Value::Object(mut map) => map
            .remove("result")
            .unwrap_or_else(|| Value::Object(map)),
        other => other,
    }
}
