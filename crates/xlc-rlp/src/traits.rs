use xlc_types::{Address, CallPath, LedgerId, TransactionId, H256};

use crate::codec::{decode, encode};
use crate::error::{RlpError, RlpResult};
use crate::item::RlpItem;

/// Types with a canonical RLP representation.
pub trait Encodable {
    fn to_rlp(&self) -> RlpItem;

    /// Encoded wire bytes.
    fn rlp_bytes(&self) -> Vec<u8> {
        encode(&self.to_rlp())
    }
}

/// Types that can be rebuilt from their RLP representation.
pub trait Decodable: Sized {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self>;

    /// Decode from wire bytes; the input must hold exactly one item.
    fn decode_rlp(data: &[u8]) -> RlpResult<Self> {
        Self::from_rlp(&decode(data)?)
    }
}

impl Encodable for RlpItem {
    fn to_rlp(&self) -> RlpItem {
        self.clone()
    }
}

impl Decodable for RlpItem {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        Ok(item.clone())
    }
}

impl Encodable for u64 {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::uint(*self)
    }
}

impl Decodable for u64 {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_u64()
    }
}

impl Encodable for u32 {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::uint(u64::from(*self))
    }
}

impl Decodable for u32 {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_u32()
    }
}

impl Encodable for bool {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::boolean(*self)
    }
}

impl Decodable for bool {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_bool()
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(self.iter().map(Encodable::to_rlp).collect())
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_list()?.iter().map(T::from_rlp).collect()
    }
}

/// Hashes travel as fixed 32-byte strings, not integers.
impl Encodable for H256 {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::bytes(self.as_bytes().to_vec())
    }
}

impl Decodable for H256 {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_fixed::<32>().map(H256::new)
    }
}

impl Encodable for Address {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::bytes(self.as_bytes().to_vec())
    }
}

impl Decodable for Address {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_fixed::<20>().map(Address::new)
    }
}

impl Encodable for LedgerId {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::uint(self.as_u64())
    }
}

impl Decodable for LedgerId {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        item.as_u64().map(LedgerId::new)
    }
}

impl Encodable for TransactionId {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::bytes(self.minimal_bytes().to_vec())
    }
}

impl Decodable for TransactionId {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let bytes = item.as_uint_array::<32>()?;
        TransactionId::from_bytes(bytes).map_err(|e| RlpError::Custom(e.to_string()))
    }
}

/// A call path is a list of child indices.
impl Encodable for CallPath {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(self.as_slice().iter().map(|i| RlpItem::uint(u64::from(*i))).collect())
    }
}

impl Decodable for CallPath {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        Vec::<u32>::from_rlp(item).map(CallPath::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn transaction_id_uses_minimal_integer_form() {
        let id = TransactionId::from_u64(0x0102);
        assert_eq!(id.rlp_bytes(), vec![0x82, 0x01, 0x02]);
        assert_eq!(TransactionId::decode_rlp(&id.rlp_bytes()).unwrap(), id);
        assert_eq!(TransactionId::from_u64(0).rlp_bytes(), vec![0x80]);
    }

    #[test]
    fn transaction_id_rejects_top_bit() {
        let item = RlpItem::bytes(vec![0x80; 32]);
        assert!(matches!(TransactionId::from_rlp(&item), Err(RlpError::Custom(_))));
    }

    #[test]
    fn hash_requires_exact_width() {
        let short = RlpItem::bytes(vec![1; 31]);
        assert!(matches!(
            H256::from_rlp(&short),
            Err(RlpError::InvalidLength { expected: 32, actual: 31 })
        ));
        let h = H256::new([0; 32]);
        assert_eq!(H256::decode_rlp(&h.rlp_bytes()).unwrap(), h);
    }

    #[test]
    fn call_path_encoding() {
        assert_eq!(CallPath::root().rlp_bytes(), vec![0xc0]);
        assert_eq!(CallPath::new(vec![2, 0]).rlp_bytes(), vec![0xc2, 0x02, 0x80]);
    }

    #[test]
    fn address_list() {
        let addrs = vec![Address::new([1; 20]), Address::new([2; 20])];
        let decoded = Vec::<Address>::decode_rlp(&addrs.rlp_bytes()).unwrap();
        assert_eq!(decoded, addrs);
    }

    proptest! {
        #[test]
        fn call_paths_survive_the_wire(indices in prop::collection::vec(any::<u32>(), 0..8)) {
            let path = CallPath::new(indices);
            prop_assert_eq!(CallPath::decode_rlp(&path.rlp_bytes()).unwrap(), path);
        }
    }
}
