//! Length prefixes for the canonical record encoding.
//!
//! Big-endian variable-length integers:
//! - The high bit of each byte is a continuation flag (1 = more bytes follow)
//! - The remaining 7 bits are data, with MSB first
//!
//! For example, 300 (0x12C) encodes as:
//! - Binary: 100101100 (9 bits)
//! - Split into 7-bit groups from MSB: 0000010, 0101100
//! - First byte: 0x80 | 2 = 0x82 (continuation)
//! - Second byte: 0x2c (no continuation)
//! - Result: [0x82, 0x2c]

/// Append `value` to `out` as a big-endian varint.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn write_varint(out: &mut Vec<u8>, value: u64) {
    if value < 128 {
        out.push(value as u8);
        return;
    }

    // Extract 7-bit chunks starting from LSB, then reverse for big-endian
    let mut temp = [0u8; 10];
    let mut len = 0;
    let mut v = value;
    while v > 0 {
        temp[len] = (v & 0x7f) as u8;
        v >>= 7;
        len += 1;
    }

    for i in (0..len).rev() {
        if i == 0 {
            out.push(temp[i]);
        } else {
            out.push(temp[i] | 0x80);
        }
    }
}

/// Append a `usize` length as a varint.
pub(crate) fn write_len(out: &mut Vec<u8>, len: usize) {
    write_varint(out, len as u64);
}
