//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated bytes.
//! This module handles decoding raw script bytes into structured chunks and
//! encoding push data with the correct OP_PUSHDATA prefix.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a Bitcoin script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes. For every opcode
/// up to and including `OP_PUSHDATA4`, `data` is `Some` (empty for `OP_0`);
/// for every other opcode it is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub opcode: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
    /// Byte offset of the opcode within the program it was parsed from.
    pub start_location_in_program: usize,
}

impl ScriptChunk {
    /// Create a chunk with no recorded program offset.
    pub fn new(opcode: u8, data: Option<Vec<u8>>) -> Self {
        ScriptChunk {
            opcode,
            data,
            start_location_in_program: 0,
        }
    }

    /// Create a bare opcode chunk.
    pub fn op(opcode: u8) -> Self {
        ScriptChunk::new(opcode, None)
    }

    /// Whether this chunk is an opcode rather than a data push.
    pub fn is_op_code(&self) -> bool {
        self.opcode > OP_PUSHDATA4
    }

    /// Whether this chunk pushes data, including the small-number opcodes
    /// `OP_1NEGATE` and `OP_1..OP_16`.
    pub fn is_push_data(&self) -> bool {
        self.opcode <= OP_16
    }

    pub fn equals_op_code(&self, opcode: u8) -> bool {
        self.opcode == opcode
    }

    /// Whether the opcode and data agree, so that `write` produces bytes
    /// that decode back to this chunk.
    ///
    /// `OP_0` carries empty data, a direct push carries exactly `opcode`
    /// bytes, `OP_PUSHDATA1/2/4` carry data that fits their length field,
    /// and every other opcode carries no data.
    pub fn is_well_formed(&self) -> bool {
        match (self.opcode, &self.data) {
            (OP_0, Some(data)) => data.is_empty(),
            (0x01..=OP_DATA_75, Some(data)) => data.len() == self.opcode as usize,
            (OP_PUSHDATA1, Some(data)) => data.len() <= 0xff,
            (OP_PUSHDATA2, Some(data)) => data.len() <= 0xffff,
            (OP_PUSHDATA4, Some(data)) => data.len() <= u32::MAX as usize,
            (op, None) => op > OP_PUSHDATA4,
            _ => false,
        }
    }

    /// Whether this push uses the shortest encoding for its data.
    ///
    /// Opcode chunks are trivially minimal. A push is minimal when an empty
    /// push uses `OP_0`, a single byte 1..=16 uses `OP_N`, `0x81` uses
    /// `OP_1NEGATE`, and otherwise the smallest length prefix is used.
    pub fn is_shortest_possible_push_data(&self) -> bool {
        let data = match &self.data {
            Some(data) => data,
            None => return true,
        };
        if data.is_empty() {
            return self.opcode == OP_0;
        }
        if data.len() == 1 {
            let b = data[0];
            if (1..=16).contains(&b) {
                return self.opcode == OP_1 + b - 1;
            }
            if b == 0x81 {
                return self.opcode == OP_1NEGATE;
            }
        }
        if data.len() <= OP_DATA_75 as usize {
            return self.opcode as usize == data.len();
        }
        if data.len() <= 0xff {
            return self.opcode == OP_PUSHDATA1;
        }
        if data.len() <= 0xffff {
            return self.opcode == OP_PUSHDATA2;
        }
        true
    }

    /// Serialized length of this chunk in bytes.
    pub fn size(&self) -> usize {
        let data_len = self.data.as_ref().map_or(0, Vec::len);
        match self.opcode {
            OP_PUSHDATA1 => 2 + data_len,
            OP_PUSHDATA2 => 3 + data_len,
            OP_PUSHDATA4 => 5 + data_len,
            _ => 1 + data_len,
        }
    }

    /// Append the wire encoding of this chunk to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.opcode);
        let data = match &self.data {
            Some(data) => data,
            None => return,
        };
        match self.opcode {
            OP_PUSHDATA1 => out.push(data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(data);
    }

    /// Convert this chunk to its ASM string representation.
    ///
    /// Data pushes render as hex, `OP_0` as `0` and `OP_1NEGATE` as `-1`;
    /// other opcodes use their canonical OP_xxx name.
    ///
    /// # Returns
    /// A string suitable for inclusion in a space-separated ASM output.
    pub fn to_asm_string(&self) -> String {
        match self.opcode {
            OP_0 => "0".to_string(),
            OP_1NEGATE => "-1".to_string(),
            op if op <= OP_PUSHDATA4 => self.data.as_deref().map(hex::encode).unwrap_or_default(),
            op => opcode_to_string(op),
        }
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Handles OP_0, OP_DATA_1..OP_DATA_75 (direct push) and OP_PUSHDATA1/2/4
/// (extended push). Each chunk records its byte offset in `bytes`.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// A vector of parsed chunks, or `ScriptError::MalformedPush` if a length
/// prefix or the data it announces runs past the end of the script.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let op = bytes[pos];
        pos += 1;

        let length = match op {
            OP_0..=OP_DATA_75 => op as usize,
            OP_PUSHDATA1 => read_push_length(bytes, &mut pos, 1)?,
            OP_PUSHDATA2 => read_push_length(bytes, &mut pos, 2)?,
            OP_PUSHDATA4 => read_push_length(bytes, &mut pos, 4)?,
            _ => {
                chunks.push(ScriptChunk {
                    opcode: op,
                    data: None,
                    start_location_in_program: start,
                });
                continue;
            }
        };

        if bytes.len() - pos < length {
            return Err(ScriptError::MalformedPush);
        }
        chunks.push(ScriptChunk {
            opcode: op,
            data: Some(bytes[pos..pos + length].to_vec()),
            start_location_in_program: start,
        });
        pos += length;
    }

    Ok(chunks)
}

/// Read a `width`-byte little-endian push length at `pos`, advancing it.
fn read_push_length(bytes: &[u8], pos: &mut usize, width: usize) -> Result<usize, ScriptError> {
    if bytes.len() - *pos < width {
        return Err(ScriptError::MalformedPush);
    }
    let length = bytes[*pos..*pos + width]
        .iter()
        .rev()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    *pos += width;
    Ok(length)
}

/// Compute the OP_PUSHDATA prefix bytes for a data payload of the given length.
///
/// # Arguments
/// * `data_len` - The length of the data to be pushed.
///
/// # Returns
/// A byte vector containing the appropriate prefix, or `MalformedPush` if
/// the data cannot be expressed by any push opcode.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::MalformedPush)
    }
}

/// Encode a single data push with its length prefix.
///
/// The prefix is chosen by length alone, so a one-byte payload is always a
/// direct push. This is the encoding FindAndDelete searches for.
pub fn encode_push_data(data: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let mut out = push_data_prefix(data.len())?;
    out.extend_from_slice(data);
    Ok(out)
}
