use crate::error::{RlpError, RlpResult};

/// A decoded RLP value: either a byte string or a list of items.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    pub fn list(items: Vec<RlpItem>) -> Self {
        Self::List(items)
    }

    /// The empty byte string (also the encoding of integer zero).
    pub fn empty() -> Self {
        Self::Bytes(Vec::new())
    }

    /// An unsigned integer in minimal big-endian form.
    pub fn uint(value: u64) -> Self {
        Self::uint_bytes(&value.to_be_bytes())
    }

    /// An unsigned integer given as big-endian bytes of any width.
    /// Leading zero bytes are stripped.
    pub fn uint_bytes(be: &[u8]) -> Self {
        let first = be.iter().position(|b| *b != 0).unwrap_or(be.len());
        Self::Bytes(be[first..].to_vec())
    }

    pub fn boolean(value: bool) -> Self {
        Self::uint(u64::from(value))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn as_bytes(&self) -> RlpResult<&[u8]> {
        match self {
            Self::Bytes(b) => Ok(b),
            Self::List(_) => Err(RlpError::ExpectedBytes),
        }
    }

    pub fn as_list(&self) -> RlpResult<&[RlpItem]> {
        match self {
            Self::List(items) => Ok(items),
            Self::Bytes(_) => Err(RlpError::ExpectedList),
        }
    }

    /// A list that must have exactly `len` items.
    pub fn as_list_of(&self, len: usize) -> RlpResult<&[RlpItem]> {
        let items = self.as_list()?;
        if items.len() != len {
            return Err(RlpError::ListLength {
                expected: len,
                actual: items.len(),
            });
        }
        Ok(items)
    }

    /// Integer bytes, checked for canonical form and at most `max_bytes` wide.
    pub fn as_uint_bytes(&self, max_bytes: usize) -> RlpResult<&[u8]> {
        let b = self.as_bytes()?;
        if b.first() == Some(&0) {
            return Err(RlpError::LeadingZero);
        }
        if b.len() > max_bytes {
            return Err(RlpError::Overflow {
                max_bytes,
                actual: b.len(),
            });
        }
        Ok(b)
    }

    pub fn as_u64(&self) -> RlpResult<u64> {
        let b = self.as_uint_bytes(8)?;
        Ok(b.iter().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    pub fn as_u32(&self) -> RlpResult<u32> {
        let b = self.as_uint_bytes(4)?;
        Ok(b.iter().fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)))
    }

    pub fn as_bool(&self) -> RlpResult<bool> {
        match self.as_u64()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RlpError::Custom(format!("boolean out of range: {other}"))),
        }
    }

    /// An integer left-padded into an `N`-byte big-endian array.
    pub fn as_uint_array<const N: usize>(&self) -> RlpResult<[u8; N]> {
        let b = self.as_uint_bytes(N)?;
        let mut out = [0u8; N];
        out[N - b.len()..].copy_from_slice(b);
        Ok(out)
    }

    /// A byte string of exactly `N` bytes.
    pub fn as_fixed<const N: usize>(&self) -> RlpResult<[u8; N]> {
        let b = self.as_bytes()?;
        b.try_into().map_err(|_| RlpError::InvalidLength {
            expected: N,
            actual: b.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_strips_leading_zeros() {
        assert_eq!(RlpItem::uint(0), RlpItem::empty());
        assert_eq!(RlpItem::uint(1), RlpItem::bytes(vec![1]));
        assert_eq!(RlpItem::uint(0x0100), RlpItem::bytes(vec![1, 0]));
        assert_eq!(RlpItem::uint_bytes(&[0, 0, 5]), RlpItem::bytes(vec![5]));
    }

    #[test]
    fn integer_accessors() {
        assert_eq!(RlpItem::uint(u64::MAX).as_u64().unwrap(), u64::MAX);
        assert_eq!(RlpItem::empty().as_u64().unwrap(), 0);
        assert_eq!(RlpItem::uint(70000).as_u32().unwrap(), 70000);
    }

    #[test]
    fn leading_zero_is_rejected() {
        let err = RlpItem::bytes(vec![0, 1]).as_u64().unwrap_err();
        assert_eq!(err, RlpError::LeadingZero);
    }

    #[test]
    fn overflow_is_rejected() {
        let err = RlpItem::bytes(vec![1; 9]).as_u64().unwrap_err();
        assert!(matches!(err, RlpError::Overflow { max_bytes: 8, actual: 9 }));
    }

    #[test]
    fn booleans() {
        assert!(RlpItem::boolean(true).as_bool().unwrap());
        assert!(!RlpItem::boolean(false).as_bool().unwrap());
        assert!(RlpItem::uint(2).as_bool().is_err());
    }

    #[test]
    fn fixed_and_padded() {
        let item = RlpItem::bytes(vec![7; 20]);
        assert_eq!(item.as_fixed::<20>().unwrap(), [7; 20]);
        assert!(item.as_fixed::<32>().is_err());

        let padded: [u8; 4] = RlpItem::uint(0x0102).as_uint_array().unwrap();
        assert_eq!(padded, [0, 0, 1, 2]);
    }

    #[test]
    fn shape_mismatch() {
        assert_eq!(RlpItem::list(vec![]).as_bytes().unwrap_err(), RlpError::ExpectedBytes);
        assert_eq!(RlpItem::empty().as_list().unwrap_err(), RlpError::ExpectedList);
        let err = RlpItem::list(vec![RlpItem::empty()]).as_list_of(2).unwrap_err();
        assert_eq!(err, RlpError::ListLength { expected: 2, actual: 1 });
    }
}
