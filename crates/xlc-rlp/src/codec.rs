use crate::error::{RlpError, RlpResult};
use crate::item::RlpItem;

/// Maximum list nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 128;

const SHORT_STRING: u8 = 0x80;
const LONG_STRING: u8 = 0xb7;
const SHORT_LIST: u8 = 0xc0;
const LONG_LIST: u8 = 0xf7;

/// Encode an item.
pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &RlpItem, out: &mut Vec<u8>) {
    match item {
        RlpItem::Bytes(b) if b.len() == 1 && b[0] < SHORT_STRING => out.push(b[0]),
        RlpItem::Bytes(b) => {
            write_header(b.len(), SHORT_STRING, LONG_STRING, out);
            out.extend_from_slice(b);
        }
        RlpItem::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                encode_into(child, &mut payload);
            }
            write_header(payload.len(), SHORT_LIST, LONG_LIST, out);
            out.extend_from_slice(&payload);
        }
    }
}

fn write_header(len: usize, short: u8, long: u8, out: &mut Vec<u8>) {
    if len <= 55 {
        out.push(short + len as u8);
    } else {
        let be = len.to_be_bytes();
        let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
        let len_bytes = &be[first..];
        out.push(long + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

/// Decode exactly one item; trailing bytes are an error.
pub fn decode(data: &[u8]) -> RlpResult<RlpItem> {
    let (item, consumed) = decode_prefix(data)?;
    if consumed != data.len() {
        return Err(RlpError::TrailingBytes(data.len() - consumed));
    }
    Ok(item)
}

/// Decode the first item in `data`. Returns (item, bytes_consumed).
pub fn decode_prefix(data: &[u8]) -> RlpResult<(RlpItem, usize)> {
    decode_at_depth(data, 0)
}

fn decode_at_depth(data: &[u8], depth: usize) -> RlpResult<(RlpItem, usize)> {
    if depth > MAX_DEPTH {
        return Err(RlpError::TooDeep(MAX_DEPTH));
    }
    let prefix = *data.first().ok_or(RlpError::UnexpectedEnd {
        needed: 1,
        available: 0,
    })?;

    match prefix {
        0x00..=0x7f => Ok((RlpItem::Bytes(vec![prefix]), 1)),
        0x80..=0xb7 => {
            let len = (prefix - SHORT_STRING) as usize;
            let body = take(data, 1, len)?;
            if len == 1 && body[0] < SHORT_STRING {
                return Err(RlpError::NonCanonical(
                    "single byte below 0x80 must encode as itself".into(),
                ));
            }
            Ok((RlpItem::Bytes(body.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let len_of_len = (prefix - LONG_STRING) as usize;
            let len = read_long_length(data, len_of_len)?;
            let body = take(data, 1 + len_of_len, len)?;
            Ok((RlpItem::Bytes(body.to_vec()), 1 + len_of_len + len))
        }
        0xc0..=0xf7 => {
            let len = (prefix - SHORT_LIST) as usize;
            let payload = take(data, 1, len)?;
            let items = decode_list_payload(payload, depth)?;
            Ok((RlpItem::List(items), 1 + len))
        }
        0xf8..=0xff => {
            let len_of_len = (prefix - LONG_LIST) as usize;
            let len = read_long_length(data, len_of_len)?;
            let payload = take(data, 1 + len_of_len, len)?;
            let items = decode_list_payload(payload, depth)?;
            Ok((RlpItem::List(items), 1 + len_of_len + len))
        }
    }
}

fn decode_list_payload(mut payload: &[u8], depth: usize) -> RlpResult<Vec<RlpItem>> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, consumed) = decode_at_depth(payload, depth + 1)?;
        items.push(item);
        payload = &payload[consumed..];
    }
    Ok(items)
}

/// Read the big-endian length that follows a long-form prefix byte.
fn read_long_length(data: &[u8], len_of_len: usize) -> RlpResult<usize> {
    let len_bytes = take(data, 1, len_of_len)?;
    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonical("length has a leading zero".into()));
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(RlpError::Overflow {
            max_bytes: std::mem::size_of::<usize>(),
            actual: len_of_len,
        });
    }
    let len = len_bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
    if len <= 55 {
        return Err(RlpError::NonCanonical(format!(
            "long form used for length {len}"
        )));
    }
    Ok(len)
}

fn take(data: &[u8], offset: usize, len: usize) -> RlpResult<&[u8]> {
    let end = offset.checked_add(len).ok_or(RlpError::Overflow {
        max_bytes: std::mem::size_of::<usize>(),
        actual: std::mem::size_of::<usize>() + 1,
    })?;
    if end > data.len() {
        return Err(RlpError::UnexpectedEnd {
            needed: end,
            available: data.len(),
        });
    }
    Ok(&data[offset..end])
}
