//! Standard output template recognition.
//!
//! The predicates are total: they never fail and return `false` for any
//! script that does not match. The extractors assume the matching predicate
//! has already returned `true` and index into the chunks directly.

use crate::chunk::ScriptChunk;
use crate::interpreter::scriptnum::decode_num;
use crate::opcodes::*;
use crate::script::Script;
use crate::ScriptError;

/// Header of the segwit commitment carried in a coinbase OP_RETURN output.
pub const WITNESS_COMMITMENT_HEADER: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

/// The standard output templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptType {
    P2PKH,
    P2PK,
    P2SH,
    P2WPKH,
    P2WSH,
    MultiSig,
    CltvPaymentChannel,
    OpReturn,
    WitnessCommitment,
    NonStandard,
}

/// Classify a script. The first matching template wins.
pub fn script_type(script: &Script) -> ScriptType {
    if is_p2pkh(script) {
        ScriptType::P2PKH
    } else if is_p2pk(script) {
        ScriptType::P2PK
    } else if is_p2sh(script) {
        ScriptType::P2SH
    } else if is_p2wpkh(script) {
        ScriptType::P2WPKH
    } else if is_p2wsh(script) {
        ScriptType::P2WSH
    } else if is_sent_to_multisig(script) {
        ScriptType::MultiSig
    } else if is_sent_to_cltv_payment_channel(script) {
        ScriptType::CltvPaymentChannel
    } else if is_witness_commitment(script) {
        ScriptType::WitnessCommitment
    } else if is_op_return(script) {
        ScriptType::OpReturn
    } else {
        ScriptType::NonStandard
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Check for a Pay-to-Public-Key-Hash output.
///
/// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
pub fn is_p2pkh(script: &Script) -> bool {
    let chunks = script.chunks();
    chunks.len() == 5
        && chunks[0].equals_op_code(OP_DUP)
        && chunks[1].equals_op_code(OP_HASH160)
        && push_len(&chunks[2]) == Some(20)
        && chunks[3].equals_op_code(OP_EQUALVERIFY)
        && chunks[4].equals_op_code(OP_CHECKSIG)
}

/// Check for a Pay-to-Script-Hash output (BIP16).
///
/// This is a byte template: the program must be exactly
/// `OP_HASH160 0x14 <20 bytes> OP_EQUAL`, so a PUSHDATA1 encoding of the
/// hash does not count.
pub fn is_p2sh(script: &Script) -> bool {
    let b = script.program();
    b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
}

/// Check for a Pay-to-Public-Key output.
///
/// Pattern: <33 or 65 byte pubkey> OP_CHECKSIG
pub fn is_p2pk(script: &Script) -> bool {
    let chunks = script.chunks();
    chunks.len() == 2
        && matches!(push_len(&chunks[0]), Some(33) | Some(65))
        && chunks[1].equals_op_code(OP_CHECKSIG)
}

/// Check for a version 0 Pay-to-Witness-Public-Key-Hash output.
pub fn is_p2wpkh(script: &Script) -> bool {
    is_v0_witness_program(script, 20)
}

/// Check for a version 0 Pay-to-Witness-Script-Hash output.
pub fn is_p2wsh(script: &Script) -> bool {
    is_v0_witness_program(script, 32)
}

/// Check for either version 0 witness output.
pub fn is_p2wh(script: &Script) -> bool {
    is_p2wpkh(script) || is_p2wsh(script)
}

fn is_v0_witness_program(script: &Script, hash_len: usize) -> bool {
    let chunks = script.chunks();
    chunks.len() == 2
        && chunks[0].opcode == OP_0
        && chunks[1].opcode as usize == hash_len
        && script.len() == hash_len + 2
}

/// Split a witness program into its version and program bytes.
///
/// A witness program is a version opcode (`OP_0`, `OP_1..OP_16`) followed by
/// a single direct push of 2 to 40 bytes, 4 to 42 bytes in total.
///
/// # Returns
/// `Some((version, program))`, or `None` if the script is not a witness program.
pub fn witness_program(script: &Script) -> Option<(u8, &[u8])> {
    let b = script.program();
    if b.len() < 4 || b.len() > 42 {
        return None;
    }
    let version = match b[0] {
        OP_0 => 0,
        op @ OP_1..=OP_16 => op - OP_1 + 1,
        _ => return None,
    };
    if b[1] as usize + 2 != b.len() {
        return None;
    }
    Some((version, &b[2..]))
}

/// Check for a bare m-of-n multisig output.
///
/// Pattern: OP_m <pubkey>{n} OP_n OP_CHECKMULTISIG[VERIFY] with
/// `1 <= m <= n <= 16` and exactly `n` key pushes.
pub fn is_sent_to_multisig(script: &Script) -> bool {
    let chunks = script.chunks();
    if chunks.len() < 4 {
        return false;
    }
    let last = &chunks[chunks.len() - 1];
    if !(last.equals_op_code(OP_CHECKMULTISIG) || last.equals_op_code(OP_CHECKMULTISIGVERIFY)) {
        return false;
    }
    let n = match small_int(&chunks[chunks.len() - 2]) {
        Some(n) if n >= 1 => n,
        _ => return false,
    };
    if chunks.len() != n + 3 {
        return false;
    }
    // Key slots must be non-empty data pushes; OP_0 and empty pushes are not keys.
    if !chunks[1..chunks.len() - 2]
        .iter()
        .all(|c| c.opcode != OP_0 && push_len(c).is_some_and(|len| len > 0))
    {
        return false;
    }
    matches!(small_int(&chunks[0]), Some(m) if m >= 1 && m <= n)
}

/// Check for a CHECKLOCKTIMEVERIFY payment channel output.
///
/// Pattern: OP_IF <recipient> OP_CHECKSIGVERIFY OP_ELSE <expiry>
/// OP_CHECKLOCKTIMEVERIFY OP_DROP OP_ENDIF <sender> OP_CHECKSIG
pub fn is_sent_to_cltv_payment_channel(script: &Script) -> bool {
    let c = script.chunks();
    c.len() == 10
        && c[0].equals_op_code(OP_IF)
        && !c[1].is_op_code()
        && c[2].equals_op_code(OP_CHECKSIGVERIFY)
        && c[3].equals_op_code(OP_ELSE)
        && c[4].is_push_data()
        && c[5].equals_op_code(OP_CHECKLOCKTIMEVERIFY)
        && c[6].equals_op_code(OP_DROP)
        && c[7].equals_op_code(OP_ENDIF)
        && !c[8].is_op_code()
        && c[9].equals_op_code(OP_CHECKSIG)
}

/// Check for a provably unspendable data output.
pub fn is_op_return(script: &Script) -> bool {
    script
        .chunks()
        .first()
        .is_some_and(|c| c.equals_op_code(OP_RETURN))
}

/// Check for a segwit commitment output (BIP141).
///
/// Pattern: OP_RETURN <36 bytes starting aa21a9ed>
pub fn is_witness_commitment(script: &Script) -> bool {
    let chunks = script.chunks();
    if chunks.len() < 2 || !chunks[0].equals_op_code(OP_RETURN) {
        return false;
    }
    match chunks[1].data.as_deref() {
        Some(data) => data.len() == 36 && data[..4] == WITNESS_COMMITMENT_HEADER,
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// The 20-byte key hash of a P2PKH output.
pub fn extract_hash_from_p2pkh(script: &Script) -> &[u8] {
    push_data(&script.chunks()[2])
}

/// The 20-byte script hash of a P2SH output.
pub fn extract_hash_from_p2sh(script: &Script) -> &[u8] {
    &script.program()[2..22]
}

/// The public key of a P2PK output.
pub fn extract_key_from_p2pk(script: &Script) -> &[u8] {
    push_data(&script.chunks()[0])
}

/// The key or script hash of a version 0 witness output.
pub fn extract_hash_from_p2wh(script: &Script) -> &[u8] {
    push_data(&script.chunks()[1])
}

/// The public keys of a multisig output, in script order.
pub fn extract_multisig_pub_keys(script: &Script) -> Vec<Vec<u8>> {
    let chunks = script.chunks();
    chunks[1..chunks.len() - 2]
        .iter()
        .map(|c| push_data(c).to_vec())
        .collect()
}

/// The number of signatures (`m`) a multisig output requires.
pub fn extract_multisig_threshold(script: &Script) -> usize {
    small_int(&script.chunks()[0]).unwrap_or_default()
}

pub fn extract_cltv_recipient_pub_key(script: &Script) -> &[u8] {
    push_data(&script.chunks()[1])
}

pub fn extract_cltv_sender_pub_key(script: &Script) -> &[u8] {
    push_data(&script.chunks()[8])
}

/// The lock time of a CLTV payment channel output.
///
/// The expiry is either a small-number opcode or a script number of up to
/// 5 bytes.
///
/// # Returns
/// The expiry, or `ScriptError::UnknownError` if the operand is too long.
pub fn extract_cltv_expiry(script: &Script) -> Result<i64, ScriptError> {
    let chunk = &script.chunks()[4];
    match chunk.opcode {
        OP_1NEGATE | OP_1..=OP_16 => Script::decode_from_op_n(chunk.opcode),
        _ => decode_num(push_data(chunk), false, 5),
    }
}

/// The 32-byte witness merkle root commitment of a coinbase output.
pub fn extract_witness_commitment_hash(script: &Script) -> &[u8] {
    &push_data(&script.chunks()[1])[4..36]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn push_data(chunk: &ScriptChunk) -> &[u8] {
    chunk.data.as_deref().unwrap_or_default()
}

fn push_len(chunk: &ScriptChunk) -> Option<usize> {
    chunk.data.as_ref().map(Vec::len)
}

/// Value of an `OP_0`..`OP_16` chunk.
fn small_int(chunk: &ScriptChunk) -> Option<usize> {
    match chunk.opcode {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some((chunk.opcode - OP_1 + 1) as usize),
        _ => None,
    }
}
