//! Tagged, length-prefixed binary message codec.
//!
//! A message is one [`Value`] tree whose root is a list or a map. Every
//! value starts with a one-byte tag; counts and lengths are big-endian:
//!
//! - `0x00` null, `0x01` bool, `0x02` int32, `0x03` float64, `0x04` text
//! - at the root, and wherever the decoder resolves them as such, `0x01`
//!   opens a list and `0x02` opens a map
//!
//! Responses travel in an [`Envelope`]: a map with optional `"data"` and
//! `"traceback"` lists.
//!
//! ```
//! use tagwire_codec::{decode, encode, Value};
//!
//! let msg = Value::List(vec![Value::from(1), Value::from("hi")]);
//! let bytes = encode(&msg).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), msg);
//! ```

pub mod config;
mod cursor;
pub mod decode;
pub mod encode;
pub mod envelope;
pub mod error;
mod resolve;
pub mod tag;
pub mod value;
#[cfg(feature = "serde")]
mod value_serde;

pub use config::{DecodeConfig, DEFAULT_MAX_DEPTH};
pub use decode::{decode, decode_with_config, Decoder};
pub use encode::{
    encode, encode_envelope, encode_into, encode_list, encode_map, encode_request, encoded_len,
    DATA_KEY, MAX_KEY_LEN, MAX_LEN, TRACEBACK_KEY,
};
pub use envelope::{decode_envelope, Envelope, RemoteFailure};
pub use error::{CodecError, Result};
pub use value::{wire_int, Map, Value, ValueKind};
