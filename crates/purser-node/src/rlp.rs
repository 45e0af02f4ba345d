//! Recursive length prefix encoding
//!
//! Just enough RLP for legacy account transactions: byte strings,
//! unsigned quantities, and one flat list around them.

/// Append a byte-string item
pub fn append_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        out.push(bytes[0]);
        return;
    }
    append_length(out, bytes.len(), 0x80);
    out.extend_from_slice(bytes);
}

/// Append an unsigned quantity as a minimal big-endian byte string.
///
/// Zero encodes as the empty string.
pub fn append_uint(out: &mut Vec<u8>, value: u128) {
    let bytes = value.to_be_bytes();
    append_bytes(out, strip_leading_zeros(&bytes));
}

/// Wrap an already-encoded payload in a list header
pub fn wrap_list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    append_length(&mut out, payload.len(), 0xc0);
    out.extend_from_slice(payload);
    out
}

/// Minimal big-endian representation of a byte string, dropping leading
/// zero bytes
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn append_length(out: &mut Vec<u8>, len: usize, offset: u8) {
    if len <= 55 {
        out.push(offset + len as u8);
    } else {
        let be = (len as u64).to_be_bytes();
        let len_bytes = strip_leading_zeros(&be);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}
