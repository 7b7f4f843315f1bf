//! Response envelopes: a root map with optional `"data"` and `"traceback"`
//! lists.

use bytes::Bytes;
use tracing::debug;

use crate::decode::decode;
use crate::encode::{encode, envelope_map, DATA_KEY, TRACEBACK_KEY};
use crate::error::Result;
use crate::value::Value;

/// A decoded response envelope.
///
/// A successful response carries a non-empty `data` list. Anything else is
/// an application failure, optionally explained by `traceback`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub data: Option<Vec<Value>>,
    pub traceback: Option<Vec<Value>>,
}

/// A remote failure reported through an envelope's traceback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote failure: {}", .traceback.last().map(String::as_str).unwrap_or("no traceback"))]
pub struct RemoteFailure {
    /// Traceback lines, outermost first.
    pub traceback: Vec<String>,
}

impl Envelope {
    /// Successful envelope carrying `data`.
    pub fn success(data: Vec<Value>) -> Self {
        Self {
            data: Some(data),
            traceback: None,
        }
    }

    /// Failed envelope carrying `traceback`.
    pub fn failure(traceback: Vec<Value>) -> Self {
        Self {
            data: None,
            traceback: Some(traceback),
        }
    }

    /// Neither data nor traceback is present.
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.traceback.is_none()
    }

    /// Data is present and non-empty.
    pub fn is_success(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_empty())
    }

    /// Traceback entries rendered as text. Non-text entries are formatted
    /// with their debug representation.
    pub fn traceback_lines(&self) -> Vec<String> {
        self.traceback
            .iter()
            .flatten()
            .map(|line| match line {
                Value::Text(text) => text.clone(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    /// Split into the result data or the remote failure.
    pub fn into_result(self) -> std::result::Result<Vec<Value>, RemoteFailure> {
        if !self.is_success() {
            return Err(RemoteFailure {
                traceback: self.traceback_lines(),
            });
        }
        Ok(self.data.unwrap_or_default())
    }

    /// Encode this envelope as a message.
    pub fn encode(&self) -> Result<Bytes> {
        encode(&Value::from(self.clone()))
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        Value::Map(envelope_map(envelope.data, envelope.traceback))
    }
}

/// Read an envelope out of a decoded root.
///
/// A root that is not a map yields an empty envelope, as does a map without
/// the envelope keys. A `"data"` or `"traceback"` entry that is not a list
/// is ignored.
impl From<Value> for Envelope {
    fn from(root: Value) -> Self {
        let kind = root.kind();
        let Some(mut map) = root.into_map() else {
            debug!(root = %kind, "envelope root is not a map, treating as empty");
            return Envelope::default();
        };

        Envelope {
            data: map.remove(DATA_KEY).and_then(Value::into_list),
            traceback: map.remove(TRACEBACK_KEY).and_then(Value::into_list),
        }
    }
}

/// Decode a response envelope. Decoding errors propagate; the root is read
/// as by `Envelope::from(Value)`.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    decode(bytes).map(Envelope::from)
}
