//! Transaction input referencing a previous output.
//!
//! Contains the source transaction ID, output index, unlocking script,
//! sequence number and the segregated witness stack. Provides binary
//! serialization/deserialization following the Bitcoin wire format.

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::{Script, ScriptError};

use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a Bitcoin transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction ID (`source_txid`) and output index (`source_tx_out_index`).
/// The `unlocking_script` (scriptSig) and `witness` supply the data
/// required to satisfy the referenced output's locking script.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
///
/// The witness is not part of the input record; segwit serialization
/// writes every input's witness after the outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The 32-byte transaction ID of the output being spent, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_tx_out_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    /// The unlocking script (scriptSig) program bytes. Empty for native
    /// witness spends. Kept unparsed; a malformed scriptSig is a script
    /// failure at verification, not a decoding error.
    pub unlocking_script: Vec<u8>,

    /// Witness stack items, bottom to top.
    pub witness: Vec<Vec<u8>>,
}

impl TransactionInput {
    /// Create a new `TransactionInput` with default values.
    ///
    /// The source txid is zeroed, output index is 0, sequence is finalized,
    /// and the unlocking script and witness are empty.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: Vec::new(),
            witness: Vec::new(),
        }
    }

    /// Create an input spending output `vout` of the transaction `source_txid`.
    ///
    /// # Arguments
    /// * `source_txid` - The spent transaction's ID in internal byte order.
    /// * `vout` - The spent output index.
    pub fn spending(source_txid: [u8; 32], vout: u32) -> Self {
        TransactionInput {
            source_txid,
            source_tx_out_index: vout,
            ..Self::new()
        }
    }

    /// Parse the unlocking script.
    ///
    /// # Returns
    /// The parsed `Script`, or `ScriptError::MalformedPush` if a push runs
    /// past the end of the program.
    pub fn parse_unlocking_script(&self) -> Result<Script, ScriptError> {
        Script::parse(&self.unlocking_script)
    }

    /// Return `true` if this input carries any witness data.
    pub fn has_witness(&self) -> bool {
        !self.witness.is_empty()
    }

    /// Deserialize a `TransactionInput` from a `ByteReader`.
    ///
    /// Reads the wire format: 32-byte txid, 4-byte output index,
    /// varint-prefixed unlocking script, and 4-byte sequence number. The
    /// witness is left empty.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` on success, or a `TransactionError` if the
    /// data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let source_txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script: script_bytes.to_vec(),
            witness: Vec::new(),
        })
    }

    /// Read this input's witness stack (item count, then varint-prefixed items).
    pub fn read_witness(&mut self, reader: &mut ByteReader) -> Result<(), TransactionError> {
        let count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading witness item count: {}", e))
        })?;

        let mut witness = Vec::new();
        for _ in 0..count.value() {
            let item = reader.read_var_bytes().map_err(|e| {
                TransactionError::SerializationError(format!("reading witness item: {}", e))
            })?;
            witness.push(item.to_vec());
        }
        self.witness = witness;
        Ok(())
    }

    /// Serialize this `TransactionInput` into a `ByteWriter`.
    ///
    /// Writes txid, output index, varint script length, script bytes, and
    /// sequence number.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        self.write_outpoint(writer);
        writer.write_var_bytes(&self.unlocking_script);
        writer.write_u32_le(self.sequence_number);
    }

    /// Write the 36-byte outpoint (txid followed by output index).
    pub fn write_outpoint(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
    }

    /// Write this input's witness stack.
    pub fn write_witness(&self, writer: &mut ByteWriter) {
        writer.write_varint(VarInt::from(self.witness.len()));
        for item in &self.witness {
            writer.write_var_bytes(item);
        }
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
