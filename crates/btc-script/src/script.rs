//! Bitcoin Script type - a parsed sequence of opcodes and data pushes.
//!
//! Scripts are used in transaction inputs (unlocking) and outputs (locking)
//! to define spending conditions. A `Script` keeps both the decoded chunks
//! and the raw program bytes; re-serializing the chunks always reproduces
//! the program exactly.

use std::fmt;
use std::hash::{Hash, Hasher};

use btc_primitives::ec::PublicKey;

use crate::chunk::{decode_script, encode_push_data, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::pattern::{self, ScriptType};
use crate::ScriptError;

/// Estimated size of a DER signature plus its sighash byte.
pub const SIG_SIZE: usize = 75;

/// A Bitcoin script: its chunks plus the program bytes they were parsed from.
///
/// Immutable once constructed. Equality and hashing use the program bytes.
#[derive(Clone)]
pub struct Script {
    chunks: Vec<ScriptChunk>,
    program: Vec<u8>,
}

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script {
            chunks: Vec::new(),
            program: Vec::new(),
        }
    }

    /// Parse a script from raw program bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw script bytes.
    ///
    /// # Returns
    /// The parsed `Script`, or `ScriptError::MalformedPush` if a push runs
    /// past the end of the program.
    pub fn parse(bytes: &[u8]) -> Result<Self, ScriptError> {
        let chunks = decode_script(bytes)?;
        Ok(Script {
            chunks,
            program: bytes.to_vec(),
        })
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// The parsed `Script`, or an error if the hex or the script is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|_| ScriptError::UnknownError)?;
        Self::parse(&bytes)
    }

    /// Build a script from chunks, serializing them into a fresh program.
    ///
    /// Each chunk's `start_location_in_program` is recomputed. The chunks
    /// must be well-formed (`ScriptChunk::is_well_formed`); a chunk whose
    /// opcode and data disagree produces a program that parses differently.
    /// Use `ScriptBuilder::add_chunk` to have chunks checked.
    pub fn from_chunks(chunks: Vec<ScriptChunk>) -> Self {
        let mut program = Vec::with_capacity(chunks.iter().map(ScriptChunk::size).sum());
        let mut located = Vec::with_capacity(chunks.len());
        for mut chunk in chunks {
            chunk.start_location_in_program = program.len();
            chunk.write(&mut program);
            located.push(chunk);
        }
        Script {
            chunks: located,
            program,
        }
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Tokens are opcode names (with the `OP_` prefix, or without it when
    /// the name starts with a letter), `0` and `-1` for `OP_0`/`OP_1NEGATE`,
    /// or hex data which becomes a push whose prefix is chosen by length.
    ///
    /// # Arguments
    /// * `asm` - A whitespace-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or `ScriptError::UnknownError` if any token is invalid.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut chunks = Vec::new();
        for token in asm.split_whitespace() {
            let chunk = match token {
                "0" => ScriptChunk::new(OP_0, Some(Vec::new())),
                "-1" => ScriptChunk::op(OP_1NEGATE),
                _ => match lookup_asm_opcode(token) {
                    Some(OP_0) => ScriptChunk::new(OP_0, Some(Vec::new())),
                    // Push opcodes need their data; use a hex token instead.
                    Some(op) if op <= OP_PUSHDATA4 => return Err(ScriptError::UnknownError),
                    Some(op) => ScriptChunk::op(op),
                    None => {
                        let data = hex::decode(token).map_err(|_| ScriptError::UnknownError)?;
                        let prefix = push_data_prefix(data.len())?;
                        ScriptChunk::new(prefix[0], Some(data))
                    }
                },
            };
            chunks.push(chunk);
        }
        Ok(Script::from_chunks(chunks))
    }

    // -----------------------------------------------------------------------
    // Accessors and serialization
    // -----------------------------------------------------------------------

    /// The raw program bytes.
    pub fn program(&self) -> &[u8] {
        &self.program
    }

    /// Consume the script, returning its program bytes.
    pub fn into_program(self) -> Vec<u8> {
        self.program
    }

    /// The decoded chunks, in program order.
    pub fn chunks(&self) -> &[ScriptChunk] {
        &self.chunks
    }

    /// Encode the program as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.program)
    }

    /// Convert the script to its ASM representation.
    ///
    /// Each chunk becomes one space-separated token: data pushes appear as
    /// hex, opcodes by name.
    pub fn to_asm(&self) -> String {
        self.chunks
            .iter()
            .map(ScriptChunk::to_asm_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Length of the program in bytes.
    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    /// Whether every chunk is a push (opcodes up to and including `OP_16`).
    pub fn is_push_only(&self) -> bool {
        self.chunks.iter().all(ScriptChunk::is_push_data)
    }

    /// Classify the script against the standard output templates.
    pub fn script_type(&self) -> ScriptType {
        pattern::script_type(self)
    }

    /// The public keys of a bare multisig script, in script order.
    ///
    /// # Returns
    /// The key list, or `ScriptError::UnknownError` if this is not a
    /// multisig script.
    pub fn pub_keys(&self) -> Result<Vec<Vec<u8>>, ScriptError> {
        if !pattern::is_sent_to_multisig(self) {
            return Err(ScriptError::UnknownError);
        }
        Ok(pattern::extract_multisig_pub_keys(self))
    }

    // -----------------------------------------------------------------------
    // Signature operation counting
    // -----------------------------------------------------------------------

    /// Count the signature operations in this script.
    ///
    /// CHECKSIG(VERIFY) counts one. CHECKMULTISIG(VERIFY) counts the value
    /// of the preceding `OP_N` when `accurate` is set, otherwise the
    /// 20-key maximum.
    pub fn sig_op_count(&self, accurate: bool) -> usize {
        count_sig_ops(&self.chunks, accurate)
    }

    /// Count the signature operations of the redeem script carried by a
    /// P2SH scriptSig, i.e. its last data push.
    ///
    /// Parse failures are tolerated: only the chunks decoded before the
    /// failure are considered.
    pub fn p2sh_sig_op_count(script_sig: &[u8]) -> usize {
        let chunks = decode_prefix(script_sig);
        let redeem = match chunks.iter().rev().find(|c| !c.is_op_code()) {
            Some(chunk) => chunk.data.as_deref().unwrap_or_default(),
            None => return 0,
        };
        count_sig_ops(&decode_prefix(redeem), true)
    }

    /// Number of signatures needed to spend this output.
    ///
    /// # Returns
    /// `m` for an m-of-n multisig, 1 for P2PKH and P2PK, or
    /// `ScriptError::UnknownError` for P2SH (it depends on the redeem
    /// script) and unsupported templates.
    pub fn number_of_signatures_required_to_spend(&self) -> Result<usize, ScriptError> {
        if pattern::is_sent_to_multisig(self) {
            Ok(pattern::extract_multisig_threshold(self))
        } else if pattern::is_p2pkh(self) || pattern::is_p2pk(self) {
            Ok(1)
        } else {
            Err(ScriptError::UnknownError)
        }
    }

    /// Estimate the scriptSig size needed to spend this output.
    ///
    /// # Arguments
    /// * `pub_key` - The key spending a P2PKH output; an uncompressed key
    ///   size is assumed when absent.
    /// * `redeem_script` - Required for P2SH outputs.
    ///
    /// # Returns
    /// The estimated size in bytes, or `ScriptError::UnknownError` for an
    /// unsupported template or a P2SH output without its redeem script.
    pub fn number_of_bytes_required_to_spend(
        &self,
        pub_key: Option<&PublicKey>,
        redeem_script: Option<&Script>,
    ) -> Result<usize, ScriptError> {
        if pattern::is_p2sh(self) {
            let redeem = redeem_script.ok_or(ScriptError::UnknownError)?;
            Ok(redeem.number_of_signatures_required_to_spend()? * SIG_SIZE + redeem.len())
        } else if pattern::is_sent_to_multisig(self) {
            // OP_0 <sig>...
            Ok(self.number_of_signatures_required_to_spend()? * SIG_SIZE + 1)
        } else if pattern::is_p2pk(self) {
            Ok(SIG_SIZE)
        } else if pattern::is_p2pkh(self) {
            let key_len = pub_key.map_or(btc_primitives::ec::public_key::UNCOMPRESSED_LEN, |_| {
                btc_primitives::ec::public_key::COMPRESSED_LEN
            });
            Ok(SIG_SIZE + key_len)
        } else {
            Err(ScriptError::UnknownError)
        }
    }

    // -----------------------------------------------------------------------
    // Program rewriting
    // -----------------------------------------------------------------------

    /// Remove every chunk-aligned occurrence of `chunk_to_remove` from a program.
    ///
    /// Matching is attempted only at chunk boundaries. After a match the
    /// scan resumes right after the removed bytes, so back-to-back
    /// occurrences are all removed. An undecodable tail is copied verbatim.
    ///
    /// # Arguments
    /// * `program` - The script bytes to filter.
    /// * `chunk_to_remove` - The serialized chunk(s) to delete.
    ///
    /// # Returns
    /// The filtered program. It is never longer than `program`.
    pub fn remove_all_instances_of(program: &[u8], chunk_to_remove: &[u8]) -> Vec<u8> {
        if chunk_to_remove.is_empty() {
            return program.to_vec();
        }
        let mut out = Vec::with_capacity(program.len());
        let mut pos = 0;
        while pos < program.len() {
            while program[pos..].starts_with(chunk_to_remove) {
                pos += chunk_to_remove.len();
            }
            if pos >= program.len() {
                break;
            }
            let next = next_chunk_end(program, pos);
            out.extend_from_slice(&program[pos..next]);
            pos = next;
        }
        out
    }

    /// Remove every occurrence of a single opcode from a program.
    pub fn remove_all_instances_of_op(program: &[u8], op: u8) -> Vec<u8> {
        Self::remove_all_instances_of(program, &[op])
    }

    /// Remove every push of `data` (length-prefixed) from a program.
    pub fn remove_all_pushes_of(program: &[u8], data: &[u8]) -> Vec<u8> {
        match encode_push_data(data) {
            Ok(pattern) => Self::remove_all_instances_of(program, &pattern),
            Err(_) => program.to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Small number opcodes
    // -----------------------------------------------------------------------

    /// Decode `OP_0`, `OP_1NEGATE` or `OP_1..OP_16` to its integer value.
    ///
    /// # Returns
    /// The value in -1..=16, or `ScriptError::UnknownError` for any other opcode.
    pub fn decode_from_op_n(opcode: u8) -> Result<i64, ScriptError> {
        match opcode {
            OP_0 => Ok(0),
            OP_1NEGATE => Ok(-1),
            OP_1..=OP_16 => Ok((opcode - OP_1 + 1) as i64),
            _ => Err(ScriptError::UnknownError),
        }
    }

    /// Encode a value in -1..=16 as its small-number opcode.
    pub fn encode_to_op_n(value: i64) -> Result<u8, ScriptError> {
        match value {
            0 => Ok(OP_0),
            -1 => Ok(OP_1NEGATE),
            1..=16 => Ok(OP_1 + (value as u8) - 1),
            _ => Err(ScriptError::UnknownError),
        }
    }
}

/// Resolve an ASM token to an opcode.
///
/// Bare names must start with a letter so that hex data such as `10` is
/// never read as `OP_10`.
fn lookup_asm_opcode(token: &str) -> Option<u8> {
    let starts_alpha = token.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if token.starts_with("OP_") || starts_alpha {
        string_to_opcode(token)
    } else {
        None
    }
}

/// Decode as many chunks as possible, stopping silently at a malformed push.
fn decode_prefix(bytes: &[u8]) -> Vec<ScriptChunk> {
    let mut end = 0;
    while end < bytes.len() {
        let next = next_chunk_end(bytes, end);
        if next > bytes.len() || decode_script(&bytes[end..next]).is_err() {
            break;
        }
        end = next;
    }
    decode_script(&bytes[..end]).unwrap_or_default()
}

/// Byte offset just past the chunk starting at `pos`.
///
/// A truncated push runs to the end of the program.
fn next_chunk_end(program: &[u8], pos: usize) -> usize {
    let op = program[pos];
    let rest = &program[pos + 1..];
    let (prefix, len) = match op {
        OP_0..=OP_DATA_75 => (0, op as usize),
        OP_PUSHDATA1 if !rest.is_empty() => (1, rest[0] as usize),
        OP_PUSHDATA2 if rest.len() >= 2 => (2, u16::from_le_bytes([rest[0], rest[1]]) as usize),
        OP_PUSHDATA4 if rest.len() >= 4 => (
            4,
            u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize,
        ),
        OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => return program.len(),
        _ => (0, 0),
    };
    (pos + 1)
        .saturating_add(prefix)
        .saturating_add(len)
        .min(program.len())
}

fn count_sig_ops(chunks: &[ScriptChunk], accurate: bool) -> usize {
    let mut sig_ops = 0;
    let mut last_opcode = OP_INVALIDOPCODE;
    for chunk in chunks.iter().filter(|c| c.is_op_code()) {
        match chunk.opcode {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => sig_ops += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                if accurate && (OP_1..=OP_16).contains(&last_opcode) {
                    sig_ops += (last_opcode - OP_1 + 1) as usize;
                } else {
                    sig_ops += 20;
                }
            }
            _ => {}
        }
        last_opcode = chunk.opcode;
    }
    sig_ops
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.program == other.program
    }
}

impl Eq for Script {}

impl Hash for Script {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.program.hash(state);
    }
}

impl fmt::Display for Script {
    /// Display the script in ASM form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_asm())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
