//! Incremental script construction and standard script factories.

use btc_primitives::ec::PublicKey;
use btc_primitives::hash::hash160;

use crate::chunk::{push_data_prefix, ScriptChunk};
use crate::interpreter::scriptnum::encode_num;
use crate::opcodes::*;
use crate::pattern::WITNESS_COMMITMENT_HEADER;
use crate::script::Script;
use crate::ScriptError;

/// Builds a `Script` chunk by chunk.
///
/// Pushes added through `data` and `number` always use the minimal
/// encoding, so built scripts pass the MINIMALDATA rule.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    chunks: Vec<ScriptChunk>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        ScriptBuilder { chunks: Vec::new() }
    }

    /// Start from the chunks of an existing script.
    pub fn from_script(script: &Script) -> Self {
        ScriptBuilder {
            chunks: script.chunks().to_vec(),
        }
    }

    /// Append a bare opcode. `OP_0` is recorded as an empty push.
    pub fn add_opcode(&mut self, opcode: u8) -> &mut Self {
        let data = if opcode == OP_0 { Some(Vec::new()) } else { None };
        self.chunks.push(ScriptChunk::new(opcode, data));
        self
    }

    /// Append a chunk as-is, without minimizing its push.
    ///
    /// # Returns
    /// `ScriptError::MalformedPush` if the chunk's opcode and data disagree.
    pub fn add_chunk(&mut self, chunk: ScriptChunk) -> Result<&mut Self, ScriptError> {
        if !chunk.is_well_formed() {
            return Err(ScriptError::MalformedPush);
        }
        self.chunks.push(chunk);
        Ok(self)
    }

    /// Append a minimal push of `data`.
    ///
    /// An empty slice becomes `OP_0`, a single byte 1..=16 becomes `OP_N`,
    /// `0x81` becomes `OP_1NEGATE` and anything else gets the shortest
    /// length prefix.
    ///
    /// # Returns
    /// `ScriptError::MalformedPush` if `data` is too long to encode.
    pub fn data(&mut self, data: &[u8]) -> Result<&mut Self, ScriptError> {
        let chunk = match data {
            [] => ScriptChunk::new(OP_0, Some(Vec::new())),
            [b @ 1..=16] => ScriptChunk::op(OP_1 + b - 1),
            [0x81] => ScriptChunk::op(OP_1NEGATE),
            _ => {
                let prefix = push_data_prefix(data.len())?;
                ScriptChunk::new(prefix[0], Some(data.to_vec()))
            }
        };
        self.chunks.push(chunk);
        Ok(self)
    }

    /// Append a number: a small-number opcode for -1..=16, otherwise a
    /// minimal script-number push.
    pub fn number(&mut self, num: i64) -> &mut Self {
        match Script::encode_to_op_n(num) {
            Ok(op) => self.add_opcode(op),
            Err(_) => {
                let encoded = encode_num(num);
                // Script numbers are at most 9 bytes, always a direct push.
                self.chunks
                    .push(ScriptChunk::new(encoded.len() as u8, Some(encoded)));
                self
            }
        }
    }

    /// Append a small-number opcode.
    ///
    /// # Returns
    /// `ScriptError::UnknownError` unless `num` is in -1..=16.
    pub fn smallnum(&mut self, num: i64) -> Result<&mut Self, ScriptError> {
        let op = Script::encode_to_op_n(num)?;
        Ok(self.add_opcode(op))
    }

    pub fn op_true(&mut self) -> &mut Self {
        self.add_opcode(OP_TRUE)
    }

    pub fn op_false(&mut self) -> &mut Self {
        self.add_opcode(OP_FALSE)
    }

    /// Serialize the chunks into a `Script`.
    pub fn build(&self) -> Script {
        Script::from_chunks(self.chunks.clone())
    }
}

// ---------------------------------------------------------------------------
// Output scripts
// ---------------------------------------------------------------------------

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn create_p2pkh_output_script(hash: &[u8; 20]) -> Script {
    Script::from_chunks(vec![
        ScriptChunk::op(OP_DUP),
        ScriptChunk::op(OP_HASH160),
        ScriptChunk::new(OP_DATA_20, Some(hash.to_vec())),
        ScriptChunk::op(OP_EQUALVERIFY),
        ScriptChunk::op(OP_CHECKSIG),
    ])
}

/// `<compressed pubkey> OP_CHECKSIG`
pub fn create_p2pk_output_script(pub_key: &PublicKey) -> Script {
    Script::from_chunks(vec![
        ScriptChunk::new(OP_DATA_33, Some(pub_key.to_compressed().to_vec())),
        ScriptChunk::op(OP_CHECKSIG),
    ])
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn create_p2sh_output_script(hash: &[u8; 20]) -> Script {
    Script::from_chunks(vec![
        ScriptChunk::op(OP_HASH160),
        ScriptChunk::new(OP_DATA_20, Some(hash.to_vec())),
        ScriptChunk::op(OP_EQUAL),
    ])
}

/// P2SH output paying to the HASH160 of `redeem_script`.
pub fn create_p2sh_output_script_for(redeem_script: &Script) -> Script {
    create_p2sh_output_script(&hash160(redeem_script.program()))
}

/// `OP_0 <20-byte key hash>`
pub fn create_p2wpkh_output_script(hash: &[u8; 20]) -> Script {
    Script::from_chunks(vec![
        ScriptChunk::new(OP_0, Some(Vec::new())),
        ScriptChunk::new(OP_DATA_20, Some(hash.to_vec())),
    ])
}

/// `OP_0 <32-byte script hash>`
pub fn create_p2wsh_output_script(hash: &[u8; 32]) -> Script {
    Script::from_chunks(vec![
        ScriptChunk::new(OP_0, Some(Vec::new())),
        ScriptChunk::new(OP_DATA_32, Some(hash.to_vec())),
    ])
}

/// Bare m-of-n multisig output: `OP_m <keys> OP_n OP_CHECKMULTISIG`.
///
/// # Arguments
/// * `threshold` - Number of signatures required (`m`).
/// * `pub_keys` - The keys, serialized compressed in the given order.
///
/// # Returns
/// `ScriptError::UnknownError` unless `1 <= m <= n <= 16`.
pub fn create_multisig_output_script(
    threshold: usize,
    pub_keys: &[PublicKey],
) -> Result<Script, ScriptError> {
    if threshold == 0 || threshold > pub_keys.len() || pub_keys.len() > 16 {
        return Err(ScriptError::UnknownError);
    }
    let mut builder = ScriptBuilder::new();
    builder.smallnum(threshold as i64)?;
    for key in pub_keys {
        builder.data(&key.to_compressed())?;
    }
    builder.smallnum(pub_keys.len() as i64)?;
    builder.add_opcode(OP_CHECKMULTISIG);
    Ok(builder.build())
}

/// The redeem script of a P2SH multisig, identical to the bare multisig
/// output for the same keys.
pub fn create_redeem_script(threshold: usize, pub_keys: &[PublicKey]) -> Result<Script, ScriptError> {
    create_multisig_output_script(threshold, pub_keys)
}

// ---------------------------------------------------------------------------
// Input scripts
// ---------------------------------------------------------------------------

/// scriptSig for P2PK (`<sig>`) or P2PKH (`<sig> <pubkey>`).
///
/// # Arguments
/// * `signature` - DER signature followed by its hash type byte.
/// * `pub_key` - The spending key for P2PKH, `None` for P2PK.
pub fn create_input_script(signature: &[u8], pub_key: Option<&PublicKey>) -> Result<Script, ScriptError> {
    let mut builder = ScriptBuilder::new();
    builder.data(signature)?;
    if let Some(key) = pub_key {
        builder.data(&key.to_compressed())?;
    }
    Ok(builder.build())
}

/// scriptSig for a bare multisig: `OP_0 <sig>...`.
///
/// The leading `OP_0` is the dummy element CHECKMULTISIG pops.
pub fn create_multisig_input_script(signatures: &[Vec<u8>]) -> Result<Script, ScriptError> {
    let mut builder = ScriptBuilder::new();
    builder.op_false();
    for sig in signatures {
        builder.data(sig)?;
    }
    Ok(builder.build())
}

/// scriptSig for a P2SH multisig: `OP_0 <sig>... <redeem script>`.
pub fn create_p2sh_multisig_input_script(
    signatures: &[Vec<u8>],
    redeem_script: &Script,
) -> Result<Script, ScriptError> {
    let mut builder = ScriptBuilder::from_script(&create_multisig_input_script(signatures)?);
    builder.data(redeem_script.program())?;
    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// Special outputs
// ---------------------------------------------------------------------------

/// Payment channel output refundable to `sender` after `expiry`.
///
/// `OP_IF <recipient> OP_CHECKSIGVERIFY OP_ELSE <expiry>
/// OP_CHECKLOCKTIMEVERIFY OP_DROP OP_ENDIF <sender> OP_CHECKSIG`
pub fn create_cltv_payment_channel_output(
    expiry: i64,
    sender: &PublicKey,
    recipient: &PublicKey,
) -> Result<Script, ScriptError> {
    let mut builder = ScriptBuilder::new();
    builder
        .add_opcode(OP_IF)
        .data(&recipient.to_compressed())?
        .add_opcode(OP_CHECKSIGVERIFY)
        .add_opcode(OP_ELSE)
        .number(expiry)
        .add_opcode(OP_CHECKLOCKTIMEVERIFY)
        .add_opcode(OP_DROP)
        .add_opcode(OP_ENDIF)
        .data(&sender.to_compressed())?
        .add_opcode(OP_CHECKSIG);
    Ok(builder.build())
}

/// `OP_RETURN <data>`
pub fn create_op_return_script(data: &[u8]) -> Result<Script, ScriptError> {
    let mut builder = ScriptBuilder::new();
    builder.add_opcode(OP_RETURN).data(data)?;
    Ok(builder.build())
}

/// Coinbase witness commitment: `OP_RETURN <aa21a9ed ‖ hash>`.
pub fn create_witness_commitment(hash: &[u8; 32]) -> Script {
    let mut payload = Vec::with_capacity(36);
    payload.extend_from_slice(&WITNESS_COMMITMENT_HEADER);
    payload.extend_from_slice(hash);
    Script::from_chunks(vec![
        ScriptChunk::op(OP_RETURN),
        ScriptChunk::new(OP_DATA_36, Some(payload)),
    ])
}
