//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs and lock
//! time. Supports legacy and BIP144 segwit serialization, txid/wtxid
//! computation, coinbase detection and input verification against the
//! outputs being spent.

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::{verify_script, Script, VerifyFlags};

use crate::context::TransactionContext;
use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::TransactionError;

/// BIP144 marker byte, written where a legacy transaction has its input count.
const SEGWIT_MARKER: u8 = 0x00;
/// BIP144 flag bit announcing per-input witness stacks.
const SEGWIT_FLAG: u8 = 0x01;
/// Weight units per non-witness byte.
const WITNESS_SCALE_FACTOR: usize = 4;

/// A Bitcoin transaction consisting of a version, a set of inputs, a set of
/// outputs, and a lock time.
///
/// # Wire format
///
/// | Field        | Size                                  |
/// |--------------|---------------------------------------|
/// | version      | 4 bytes (LE)                          |
/// | marker, flag | 2 bytes `00 01`, segwit only          |
/// | input count  | VarInt                                |
/// | inputs       | variable (per input)                  |
/// | output count | VarInt                                |
/// | outputs      | variable (per output)                 |
/// | witnesses    | one stack per input, segwit only      |
/// | lock_time    | 4 bytes (LE)                          |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version. Currently 1 or 2.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time. If non-zero, the transaction is not valid until the
    /// specified block height or Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the hex is
    /// invalid or the bytes do not form a valid transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// This method requires the byte slice to contain exactly one complete
    /// transaction with no trailing data.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes, legacy or segwit encoded.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the data
    /// is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// An input count of zero followed by a non-zero byte is read as the
    /// BIP144 marker and flag. A zero byte there is the output count of a
    /// transaction with no inputs and no outputs.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized transaction.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` on I/O or
    /// format errors, including an unknown segwit flag or a witness
    /// section in which every stack is empty.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let mut flag = 0u8;
        let mut inputs = read_inputs(reader)?;
        let outputs = if inputs.is_empty() {
            flag = reader.read_u8().map_err(|e| {
                TransactionError::SerializationError(format!("reading segwit flag: {}", e))
            })?;
            if flag != 0 {
                inputs = read_inputs(reader)?;
                read_outputs(reader)?
            } else {
                Vec::new()
            }
        } else {
            read_outputs(reader)?
        };

        if flag & SEGWIT_FLAG != 0 {
            flag ^= SEGWIT_FLAG;
            for input in inputs.iter_mut() {
                input.read_witness(reader)?;
            }
            if !inputs.iter().any(TransactionInput::has_witness) {
                return Err(TransactionError::SerializationError(
                    "superfluous witness record".to_string(),
                ));
            }
        }
        if flag != 0 {
            return Err(TransactionError::SerializationError(format!(
                "unknown transaction optional data {:#04x}",
                flag
            )));
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes.
    ///
    /// Uses the BIP144 segwit encoding when any input carries a witness,
    /// and the legacy encoding otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize(self.has_witness())
    }

    /// Serialize this transaction without witness data.
    ///
    /// This is the encoding hashed for the txid.
    pub fn to_bytes_no_witness(&self) -> Vec<u8> {
        self.serialize(false)
    }

    fn serialize(&self, with_witness: bool) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        if with_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        if with_witness {
            for input in &self.inputs {
                input.write_witness(&mut writer);
            }
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    ///
    /// # Returns
    /// A lowercase hex-encoded string of `to_bytes()`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Compute the transaction ID: double SHA-256 of the serialization
    /// without witness data.
    ///
    /// The txid bytes are in internal (little-endian) order. To get the
    /// conventional display string, use `txid_hex()`.
    pub fn txid(&self) -> [u8; 32] {
        sha256d(&self.to_bytes_no_witness())
    }

    /// Compute the transaction ID as a human-readable hex string.
    ///
    /// The hex string is byte-reversed from the internal hash, following
    /// Bitcoin's convention where txids are displayed in big-endian order.
    pub fn txid_hex(&self) -> String {
        display_hex(self.txid())
    }

    /// Compute the witness transaction ID: double SHA-256 of the full
    /// serialization. Equal to `txid()` when no input has a witness.
    pub fn wtxid(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// Compute the witness transaction ID as a display-order hex string.
    pub fn wtxid_hex(&self) -> String {
        display_hex(self.wtxid())
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    /// Append a `TransactionInput` to this transaction.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Return the number of inputs in the transaction.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Append a `TransactionOutput` to this transaction.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Return the number of outputs in the transaction.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Compute the sum of all output values, or `None` on overflow.
    pub fn total_output_satoshis(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, o| total.checked_add(o.satoshis))
    }

    /// Return `true` if any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(TransactionInput::has_witness)
    }

    // -----------------------------------------------------------------
    // Coinbase detection
    // -----------------------------------------------------------------

    /// Determine whether this transaction is a coinbase transaction.
    ///
    /// A coinbase transaction has exactly one input spending the null
    /// outpoint: an all-zero txid and output index `0xFFFFFFFF`.
    pub fn is_coinbase(&self) -> bool {
        match self.inputs.as_slice() {
            [input] => input.source_txid == [0u8; 32] && input.source_tx_out_index == 0xFFFF_FFFF,
            _ => false,
        }
    }

    // -----------------------------------------------------------------
    // Size
    // -----------------------------------------------------------------

    /// Return the size of the full serialization in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Return the BIP141 weight: three times the stripped size plus the
    /// full size.
    pub fn weight(&self) -> usize {
        self.to_bytes_no_witness().len() * (WITNESS_SCALE_FACTOR - 1) + self.size()
    }

    /// Return the virtual size: weight divided by four, rounded up.
    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(WITNESS_SCALE_FACTOR)
    }

    // -----------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------

    /// Verify that input `input_index` correctly spends an output.
    ///
    /// Runs the input's unlocking script and witness against
    /// `script_pubkey` with signature checks bound to this transaction.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input to verify.
    /// * `script_pubkey` - Locking script of the output being spent.
    /// * `amount` - Value of the output being spent, committed to by
    ///   witness v0 signatures.
    /// * `flags` - Script verification flags.
    ///
    /// # Returns
    /// `Ok(())` if the spend is valid, `TransactionError::Script` with the
    /// failure reason if not (`MalformedPush` for an unparseable unlocking
    /// script), or `InvalidTransaction` for a bad index.
    pub fn correctly_spends(
        &self,
        input_index: usize,
        script_pubkey: &Script,
        amount: u64,
        flags: VerifyFlags,
    ) -> Result<(), TransactionError> {
        let input = self.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                self.inputs.len()
            ))
        })?;

        let script_sig = input.parse_unlocking_script()?;
        let ctx = TransactionContext::new(self, amount);
        verify_script(
            &script_sig,
            script_pubkey,
            &input.witness,
            flags,
            Some(&ctx),
            input_index,
        )?;
        Ok(())
    }
}

/// Read a varint count followed by that many inputs.
fn read_inputs(reader: &mut ByteReader) -> Result<Vec<TransactionInput>, TransactionError> {
    let count = reader.read_varint().map_err(|e| {
        TransactionError::SerializationError(format!("reading input count: {}", e))
    })?;
    let mut inputs = Vec::with_capacity(bounded_capacity(count, reader));
    for _ in 0..count.value() {
        inputs.push(TransactionInput::read_from(reader)?);
    }
    Ok(inputs)
}

/// Read a varint count followed by that many outputs.
fn read_outputs(reader: &mut ByteReader) -> Result<Vec<TransactionOutput>, TransactionError> {
    let count = reader.read_varint().map_err(|e| {
        TransactionError::SerializationError(format!("reading output count: {}", e))
    })?;
    let mut outputs = Vec::with_capacity(bounded_capacity(count, reader));
    for _ in 0..count.value() {
        outputs.push(TransactionOutput::read_from(reader)?);
    }
    Ok(outputs)
}

/// A declared count can never exceed the bytes left to read.
fn bounded_capacity(count: VarInt, reader: &ByteReader) -> usize {
    count.value().min(reader.remaining() as u64) as usize
}

fn display_hex(mut hash: [u8; 32]) -> String {
    hash.reverse();
    hex::encode(hash)
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
