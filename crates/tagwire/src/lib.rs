//! Tagged, length-prefixed binary messages.
//!
//! tagwire encodes trees of null, bool, int32, float64, text, list and
//! ordered-map values into a compact big-endian wire format, decodes them
//! back, and wraps remote-call results in `data`/`traceback` envelopes.
//!
//! # Crate Structure
//!
//! - [`codec`] — Value model, encoder, decoder and envelopes
//!
//! The `cli` feature builds the `tagwire` binary for encoding and inspecting
//! messages from the shell.

/// Re-export codec types.
pub mod codec {
    pub use tagwire_codec::*;
}

pub use tagwire_codec::{
    decode, decode_envelope, encode, encode_envelope, encode_request, CodecError, Envelope, Map,
    RemoteFailure, Value,
};
