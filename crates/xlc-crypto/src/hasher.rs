use sha3::{Digest, Keccak256};
use xlc_types::H256;

/// keccak-256 of the empty input.
pub const EMPTY_KECCAK: H256 = H256::new([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// keccak-256 hash of `data`.
pub fn keccak256(data: &[u8]) -> H256 {
    H256::new(Keccak256::digest(data).into())
}

/// keccak-256 over the concatenation of `parts`, without allocating.
pub fn keccak256_concat(parts: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    H256::new(hasher.finalize().into())
}

/// Topic of an event with the given canonical signature,
/// e.g. `Root(uint256,bool)`.
pub fn event_topic(signature: &str) -> H256 {
    keccak256(signature.as_bytes())
}
