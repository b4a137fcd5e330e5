//! Script number encoding with Bitcoin consensus rules.
//!
//! All numbers on the Bitcoin script stack are encoded as little-endian
//! byte arrays with a sign bit in the most significant bit of the last byte.
//! Numeric opcodes read operands of at most 4 bytes (5 for the lock time
//! opcodes) but results may overflow that range and remain valid as long as
//! they are not reinterpreted as numbers. Every value fits an `i64`.

use crate::ScriptError;

/// Encode an integer as a minimal script number.
///
/// Zero encodes as the empty array. A sign byte is appended when the
/// magnitude already uses the top bit of its last byte.
pub fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut result = Vec::with_capacity(9);
    while magnitude > 0 {
        result.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    let last = result.len() - 1;
    if result[last] & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        result[last] |= 0x80;
    }
    result
}

/// Decode a script number.
///
/// # Arguments
/// * `bytes` - The encoded number.
/// * `require_minimal` - Reject encodings with unnecessary trailing bytes.
/// * `max_len` - Maximum accepted byte length (4, or 5 for lock times).
///
/// # Returns
/// The value, or `ScriptError::UnknownError` if the operand is too long or
/// not minimal when minimality is required.
pub fn decode_num(bytes: &[u8], require_minimal: bool, max_len: usize) -> Result<i64, ScriptError> {
    if bytes.len() > max_len || bytes.len() > 8 {
        return Err(ScriptError::UnknownError);
    }
    if require_minimal && !is_minimally_encoded(bytes) {
        return Err(ScriptError::UnknownError);
    }
    if bytes.is_empty() {
        return Ok(0);
    }

    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }

    let last = bytes[bytes.len() - 1];
    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
        Ok(-(result & mask))
    } else {
        Ok(result)
    }
}

/// Whether `bytes` is the shortest encoding of its value.
///
/// The last byte may only be `0x00` or `0x80` when the byte before it
/// needs its top bit for the magnitude.
pub fn is_minimally_encoded(bytes: &[u8]) -> bool {
    match bytes.last() {
        None => true,
        Some(last) if last & 0x7f == 0 => bytes.len() > 1 && bytes[bytes.len() - 2] & 0x80 != 0,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    #[test]
    fn test_encode_num_vectors() {
        let cases: Vec<(i64, &str)> = vec![
            (0, ""),
            (1, "01"),
            (-1, "81"),
            (127, "7f"),
            (-127, "ff"),
            (128, "8000"),
            (-128, "8080"),
            (255, "ff00"),
            (256, "0001"),
            (-256, "0081"),
            (32767, "ff7f"),
            (32768, "008000"),
            (2147483647, "ffffff7f"),
            (-2147483647, "ffffffff"),
            (2147483648, "0000008000"),
            (-2147483648, "0000008080"),
            (4294967295, "ffffffff00"),
        ];
        for (value, expected) in cases {
            assert_eq!(hex::encode(encode_num(value)), expected, "encode {}", value);
        }
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    #[test]
    fn test_decode_num_vectors() {
        let cases: Vec<(&str, i64)> = vec![
            ("", 0),
            ("01", 1),
            ("81", -1),
            ("8000", 128),
            ("0081", -256),
            ("ffffff7f", 2147483647),
            ("ffffffff", -2147483647),
            // non-minimal forms decode when minimality is not required
            ("00", 0),
            ("80", 0),
            ("0100", 1),
            ("010080", -1),
        ];
        for (encoded, expected) in cases {
            let bytes = hex::decode(encoded).unwrap();
            assert_eq!(decode_num(&bytes, false, 4), Ok(expected), "decode {}", encoded);
        }
    }

    /// Operands longer than the limit are rejected.
    #[test]
    fn test_decode_num_too_long() {
        let five = hex::decode("0000008000").unwrap();
        assert_eq!(decode_num(&five, false, 4), Err(ScriptError::UnknownError));
        assert_eq!(decode_num(&five, false, 5), Ok(2147483648));
    }

    #[test]
    fn test_decode_num_minimal() {
        for encoded in ["00", "80", "0100", "0080", "010080"] {
            let bytes = hex::decode(encoded).unwrap();
            assert_eq!(
                decode_num(&bytes, true, 4),
                Err(ScriptError::UnknownError),
                "non-minimal {}",
                encoded
            );
        }
        let bytes = hex::decode("8000").unwrap();
        assert_eq!(decode_num(&bytes, true, 4), Ok(128));
    }

    #[test]
    fn test_is_minimally_encoded() {
        assert!(is_minimally_encoded(&[]));
        assert!(is_minimally_encoded(&[0x01]));
        assert!(is_minimally_encoded(&[0xff, 0x00]));
        assert!(is_minimally_encoded(&[0xff, 0x80]));
        assert!(!is_minimally_encoded(&[0x7f, 0x00]));
        assert!(!is_minimally_encoded(&[0x00]));
    }
}
