//! Proof codec: byte-exact recursive length prefix (RLP) encoding.
//!
//! Scalars are big-endian with no leading zero bytes (zero is the empty
//! string), byte strings are length-prefixed, and lists nest. Decoding is
//! strict: any non-canonical form is rejected, because decoded bytes are
//! later rehashed and compared against roots computed on another ledger.

pub mod codec;
pub mod error;
pub mod item;
pub mod traits;

pub use codec::{decode, decode_prefix, encode, MAX_DEPTH};
pub use error::{RlpError, RlpResult};
pub use item::RlpItem;
pub use traits::{Decodable, Encodable};
