//! Signature hash computation for transaction signing.
//!
//! Computes the digest an ECDSA signature commits to when authorizing the
//! spend of a transaction input. Legacy scripts use the original
//! transaction-copy algorithm; version 0 witness scripts use BIP143, which
//! commits to the spent amount and reuses three per-transaction hashes.
//!
//! See <https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki>

use btc_primitives::hash::sha256d;
use btc_primitives::util::ByteWriter;
use btc_script::opcodes::OP_CODESEPARATOR;
use btc_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u8 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u8 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u8 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u8 = 0x1f;

/// The digest returned by legacy hashing for an input with no matching
/// output under SIGHASH_SINGLE, or an input index out of range.
pub const SIGHASH_ONE: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

/// The base signature hash types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SigHashType {
    All = SIGHASH_ALL,
    None = SIGHASH_NONE,
    Single = SIGHASH_SINGLE,
}

impl SigHashType {
    /// Decode the base type from a sighash byte, ignoring ANYONECANPAY.
    ///
    /// # Returns
    /// The base type, or `None` if the low five bits name no defined type.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte & SIGHASH_MASK {
            SIGHASH_ALL => Some(SigHashType::All),
            SIGHASH_NONE => Some(SigHashType::None),
            SIGHASH_SINGLE => Some(SigHashType::Single),
            _ => None,
        }
    }

    /// The sighash byte appended to a signature.
    pub fn to_byte(self, anyone_can_pay: bool) -> u8 {
        if anyone_can_pay {
            self as u8 | SIGHASH_ANYONECANPAY
        } else {
            self as u8
        }
    }
}

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the legacy signature hash for a given input.
///
/// # Arguments
/// * `tx`             - The transaction being signed.
/// * `input_index`    - Index of the input being signed.
/// * `subscript`      - The script code being satisfied.
/// * `sighash_type`   - The base sighash type.
/// * `anyone_can_pay` - Whether only the signed input is committed to.
///
/// # Returns
/// A 32-byte double-SHA256 hash to be signed by ECDSA.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    subscript: &Script,
    sighash_type: SigHashType,
    anyone_can_pay: bool,
) -> [u8; 32] {
    signature_hash_raw(
        tx,
        input_index,
        subscript.program(),
        sighash_type.to_byte(anyone_can_pay),
    )
}

/// Compute the legacy signature hash from a raw sighash byte.
///
/// The transaction is serialized as if every unlocking script were empty
/// except the signed input's, which is replaced by `subscript` with all
/// `OP_CODESEPARATOR`s removed. NONE drops the outputs, SINGLE keeps only
/// outputs up to the signed index (earlier ones blanked to value -1 and an
/// empty script), and both zero the other inputs' sequence numbers.
/// ANYONECANPAY keeps only the signed input. Witness data is never included.
///
/// Out of range indices, including SINGLE without a matching output,
/// yield `SIGHASH_ONE` rather than an error.
///
/// # Arguments
/// * `tx`          - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `subscript`   - The script code bytes.
/// * `hash_type`   - The full sighash byte, including ANYONECANPAY.
pub fn signature_hash_raw(
    tx: &Transaction,
    input_index: usize,
    subscript: &[u8],
    hash_type: u8,
) -> [u8; 32] {
    let base_type = hash_type & SIGHASH_MASK;
    let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;
    let hash_none = base_type == SIGHASH_NONE;
    let hash_single = base_type == SIGHASH_SINGLE;

    if input_index >= tx.inputs.len() || (hash_single && input_index >= tx.outputs.len()) {
        return SIGHASH_ONE;
    }

    let script_code = Script::remove_all_instances_of_op(subscript, OP_CODESEPARATOR);
    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs
    let signed_inputs = if anyone_can_pay {
        input_index..input_index + 1
    } else {
        0..tx.inputs.len()
    };
    writer.write_varint(signed_inputs.len().into());
    for (i, input) in tx.inputs[signed_inputs.clone()].iter().enumerate() {
        let is_signed = signed_inputs.start + i == input_index;
        input.write_outpoint(&mut writer);
        if is_signed {
            writer.write_var_bytes(&script_code);
        } else {
            writer.write_var_bytes(&[]);
        }
        if !is_signed && (hash_single || hash_none) {
            writer.write_u32_le(0);
        } else {
            writer.write_u32_le(input.sequence_number);
        }
    }

    // Outputs
    let output_count = if hash_none {
        0
    } else if hash_single {
        input_index + 1
    } else {
        tx.outputs.len()
    };
    writer.write_varint(output_count.into());
    for (i, output) in tx.outputs[..output_count].iter().enumerate() {
        if hash_single && i != input_index {
            writer.write_u64_le(u64::MAX);
            writer.write_var_bytes(&[]);
        } else {
            output.write_to(&mut writer);
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(hash_type as u32);
    sha256d(writer.as_bytes())
}

// -----------------------------------------------------------------------
// BIP143 signature hash
// -----------------------------------------------------------------------

/// Compute the BIP143 signature hash for a version 0 witness input.
///
/// # Arguments
/// * `tx`          - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - The script code being satisfied.
/// * `amount`      - The value of the output being spent.
/// * `hash_type`   - The full sighash byte.
///
/// # Returns
/// A 32-byte double-SHA256 hash, or `InvalidTransaction` if
/// `input_index` is out of range.
pub fn witness_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    hash_type: u8,
) -> Result<[u8; 32], TransactionError> {
    SigHashCache::new(tx).witness_signature_hash(input_index, script_code, amount, hash_type)
}

/// Compute the BIP143 pre-image bytes before double-hashing.
///
/// See `SigHashCache::witness_preimage` for the layout.
pub fn witness_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    hash_type: u8,
) -> Result<Vec<u8>, TransactionError> {
    SigHashCache::new(tx).witness_preimage(input_index, script_code, amount, hash_type)
}

/// The three BIP143 hashes shared by every input of a transaction.
///
/// Computing them once makes hashing all inputs linear in the
/// transaction size.
#[derive(Debug, Clone)]
pub struct SigHashCache<'a> {
    tx: &'a Transaction,
    /// sha256d of every outpoint.
    pub hash_prevouts: [u8; 32],
    /// sha256d of every input sequence number.
    pub hash_sequence: [u8; 32],
    /// sha256d of every serialized output.
    pub hash_outputs: [u8; 32],
}

impl<'a> SigHashCache<'a> {
    /// Precompute the shared hashes for `tx`.
    pub fn new(tx: &'a Transaction) -> Self {
        SigHashCache {
            tx,
            hash_prevouts: prevouts_hash(tx),
            hash_sequence: sequence_hash(tx),
            hash_outputs: outputs_hash(tx, None),
        }
    }

    /// Compute the BIP143 signature hash for `input_index`.
    pub fn witness_signature_hash(
        &self,
        input_index: usize,
        script_code: &[u8],
        amount: u64,
        hash_type: u8,
    ) -> Result<[u8; 32], TransactionError> {
        let preimage = self.witness_preimage(input_index, script_code, amount, hash_type)?;
        Ok(sha256d(&preimage))
    }

    /// Build the BIP143 pre-image for `input_index`.
    ///
    /// The preimage consists of:
    /// 1. nVersion (4 bytes LE)
    /// 2. hashPrevouts (32 bytes) - zero under ANYONECANPAY
    /// 3. hashSequence (32 bytes) - zero under ANYONECANPAY, SINGLE or NONE
    /// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
    /// 5. scriptCode (varint + script)
    /// 6. amount (8 bytes LE) - value of the output being spent
    /// 7. nSequence (4 bytes LE) - sequence of the input being signed
    /// 8. hashOutputs (32 bytes) - all outputs, the matching output for
    ///    SINGLE, or zero
    /// 9. nLocktime (4 bytes LE)
    /// 10. sighash type (4 bytes LE)
    ///
    /// # Returns
    /// The raw preimage bytes, or `InvalidTransaction` if `input_index`
    /// is out of range.
    pub fn witness_preimage(
        &self,
        input_index: usize,
        script_code: &[u8],
        amount: u64,
        hash_type: u8,
    ) -> Result<Vec<u8>, TransactionError> {
        let tx = self.tx;
        let input = tx.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                tx.inputs.len()
            ))
        })?;

        let base_type = hash_type & SIGHASH_MASK;
        let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;

        let hash_prevouts = if anyone_can_pay {
            [0u8; 32]
        } else {
            self.hash_prevouts
        };

        let hash_sequence =
            if anyone_can_pay || base_type == SIGHASH_SINGLE || base_type == SIGHASH_NONE {
                [0u8; 32]
            } else {
                self.hash_sequence
            };

        let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
            self.hash_outputs
        } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
            outputs_hash(tx, Some(input_index))
        } else {
            [0u8; 32]
        };

        let mut writer = ByteWriter::with_capacity(156 + script_code.len());
        writer.write_u32_le(tx.version);
        writer.write_bytes(&hash_prevouts);
        writer.write_bytes(&hash_sequence);
        input.write_outpoint(&mut writer);
        writer.write_var_bytes(script_code);
        writer.write_u64_le(amount);
        writer.write_u32_le(input.sequence_number);
        writer.write_bytes(&hash_outputs);
        writer.write_u32_le(tx.lock_time);
        writer.write_u32_le(hash_type as u32);

        Ok(writer.into_bytes())
    }
}

// -----------------------------------------------------------------------
// Internal helper functions
// -----------------------------------------------------------------------

/// Double-SHA256 of all input outpoints concatenated.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        input.write_outpoint(&mut writer);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of all input sequence numbers concatenated.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of serialized outputs.
///
/// # Arguments
/// * `tx` - The transaction whose outputs to hash.
/// * `n`  - A single output index (SIGHASH_SINGLE), or `None` for all outputs.
fn outputs_hash(tx: &Transaction, n: Option<usize>) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    match n {
        Some(index) => tx.outputs[index].write_to(&mut writer),
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }
    sha256d(writer.as_bytes())
}
