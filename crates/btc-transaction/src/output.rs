//! Transaction output with a value and locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization/deserialization following the Bitcoin wire format.

use btc_primitives::util::{ByteReader, ByteWriter};
use btc_script::{Script, ScriptError};

use crate::TransactionError;

/// A single output in a Bitcoin transaction.
///
/// Each output specifies a `satoshis` value and a `locking_script`
/// (scriptPubKey) that defines the conditions under which the funds
/// may be spent. The script is kept as raw bytes: unspendable outputs on
/// chain may carry programs that do not parse.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The number of satoshis locked by this output.
    pub satoshis: u64,

    /// The locking script (scriptPubKey) program bytes.
    pub locking_script: Vec<u8>,
}

impl TransactionOutput {
    /// Create a new `TransactionOutput` with zero satoshis and an empty script.
    pub fn new() -> Self {
        TransactionOutput {
            satoshis: 0,
            locking_script: Vec::new(),
        }
    }

    /// Create an output paying `satoshis` to `locking_script`.
    pub fn with_script(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script: locking_script.into_program(),
        }
    }

    /// Parse the locking script.
    ///
    /// # Returns
    /// The parsed `Script`, or `ScriptError::MalformedPush` if a push runs
    /// past the end of the program.
    pub fn parse_locking_script(&self) -> Result<Script, ScriptError> {
        Script::parse(&self.locking_script)
    }

    /// Deserialize a `TransactionOutput` from a `ByteReader`.
    ///
    /// Reads 8-byte LE satoshis, a varint script length, and the script bytes.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TransactionOutput)` on success, or a `TransactionError` if the
    /// data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            satoshis,
            locking_script: script_bytes.to_vec(),
        })
    }

    /// Serialize this `TransactionOutput` into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(&self.locking_script);
    }

    /// Serialize this output to a byte vector.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Return the locking script as a hex-encoded string.
    pub fn locking_script_hex(&self) -> String {
        hex::encode(&self.locking_script)
    }
}

impl Default for TransactionOutput {
    fn default() -> Self {
        Self::new()
    }
}
