//! Crypto operations for the script interpreter.

use btc_primitives::ec::public_key::{COMPRESSED_LEN, UNCOMPRESSED_LEN};
use btc_primitives::ec::{PublicKey, Signature};
use btc_primitives::hash;
use log::debug;

use crate::{Script, ScriptError};

use super::config::{MAX_OPS_PER_SCRIPT, MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_NUMBER_LENGTH};
use super::flags::VerifyFlags;
use super::thread::Thread;
use super::SigVersion;

/// SIGHASH_ANYONECANPAY modifier bit.
const SIGHASH_ANYONECANPAY: u8 = 0x80;

pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), ScriptError> {
        let buf = self.dstack.pop_byte_array()?;
        let result = match hash_type {
            HashType::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashType::Sha1 => hash::sha1(&buf).to_vec(),
            HashType::Sha256 => hash::sha256(&buf).to_vec(),
            HashType::Hash160 => hash::hash160(&buf).to_vec(),
            HashType::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push_byte_array(result);
        Ok(())
    }

    /// The script code signatures commit to: the program from just past the
    /// last executed OP_CODESEPARATOR, with every push of the given
    /// signatures removed for legacy scripts.
    pub(crate) fn script_code(&self, sigs: &[&[u8]]) -> Vec<u8> {
        let mut code = self.script.program()[self.begin_code_hash..].to_vec();
        if self.sig_version == SigVersion::Base {
            for sig in sigs {
                code = Script::remove_all_pushes_of(&code, sig);
            }
        }
        code
    }

    pub(crate) fn op_checksig(&mut self, verify: bool) -> Result<(), ScriptError> {
        self.require_depth(2)?;
        let pk_bytes = self.dstack.pop_byte_array()?;
        let sig_bytes = self.dstack.pop_byte_array()?;

        let script_code = self.script_code(&[&sig_bytes]);

        self.check_signature_encoding(&sig_bytes)?;
        self.check_pub_key_encoding(&pk_bytes)?;

        let valid = self.check_sig(&sig_bytes, &pk_bytes, &script_code)?;
        if !valid && self.has_flag(VerifyFlags::NULLFAIL) && !sig_bytes.is_empty() {
            debug!("signature not empty on failed checksig");
            return Err(ScriptError::SigNullfail);
        }

        self.dstack.push_bool(valid);
        if verify {
            return self.abstract_verify(ScriptError::CheckSigVerify);
        }
        Ok(())
    }

    /// OP_CHECKMULTISIG and OP_CHECKMULTISIGVERIFY.
    ///
    /// Stack layout from the top: key count, keys, signature count,
    /// signatures, and one extra dummy item. Signatures must appear in the
    /// same order as the keys they match; each key is tried once.
    pub(crate) fn op_checkmultisig(&mut self, verify: bool) -> Result<(), ScriptError> {
        let require_minimal = self.require_minimal();

        self.require_depth(1)?;
        let num_keys = self
            .dstack
            .peek_int(0, require_minimal, MAX_SCRIPT_NUMBER_LENGTH)?;
        if num_keys < 0 || num_keys as usize > MAX_PUBKEYS_PER_MULTISIG {
            debug!("invalid pubkey count {}", num_keys);
            return Err(ScriptError::PubkeyCount);
        }
        let num_keys = num_keys as usize;

        self.num_ops += num_keys;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(ScriptError::OpCount);
        }

        let sig_count_idx = 1 + num_keys;
        self.require_depth(sig_count_idx + 1)?;
        let num_sigs = self
            .dstack
            .peek_int(sig_count_idx, require_minimal, MAX_SCRIPT_NUMBER_LENGTH)?;
        if num_sigs < 0 || num_sigs as usize > num_keys {
            debug!("invalid signature count {} for {} keys", num_sigs, num_keys);
            return Err(ScriptError::SigCount);
        }
        let num_sigs = num_sigs as usize;

        let dummy_idx = sig_count_idx + 1 + num_sigs;
        self.require_depth(dummy_idx + 1)?;

        let pub_keys = self.peek_range(1, num_keys)?;
        let sigs = self.peek_range(sig_count_idx + 1, num_sigs)?;

        let sig_refs: Vec<&[u8]> = sigs.iter().map(Vec::as_slice).collect();
        let script_code = self.script_code(&sig_refs);

        let mut success = true;
        let mut ikey = 0;
        let mut isig = 0;
        let mut keys_left = num_keys;
        let mut sigs_left = num_sigs;
        while success && sigs_left > 0 {
            let sig = &sigs[isig];
            let pub_key = &pub_keys[ikey];

            self.check_signature_encoding(sig)?;
            self.check_pub_key_encoding(pub_key)?;

            if self.check_sig(sig, pub_key, &script_code)? {
                isig += 1;
                sigs_left -= 1;
            }
            ikey += 1;
            keys_left -= 1;

            // Not enough keys left to match the remaining signatures
            if sigs_left > keys_left {
                success = false;
            }
        }

        if !success
            && self.has_flag(VerifyFlags::NULLFAIL)
            && sigs.iter().any(|sig| !sig.is_empty())
        {
            debug!("not all signatures empty on failed checkmultisig");
            return Err(ScriptError::SigNullfail);
        }

        // Extra item consumed by the historical off-by-one
        if self.has_flag(VerifyFlags::NULLDUMMY) && !self.dstack.peek_byte_array(dummy_idx)?.is_empty() {
            debug!("multisig dummy argument is not empty");
            return Err(ScriptError::SigNulldummy);
        }

        self.dstack.drop_n(dummy_idx + 1)?;
        self.dstack.push_bool(success);
        if verify {
            return self.abstract_verify(ScriptError::CheckMultisigVerify);
        }
        Ok(())
    }

    /// Copy `count` items starting `start` positions below the top, topmost first.
    fn peek_range(&self, start: usize, count: usize) -> Result<Vec<Vec<u8>>, ScriptError> {
        (start..start + count)
            .map(|idx| self.dstack.peek_byte_array(idx).map(<[u8]>::to_vec))
            .collect()
    }

    /// Verify one signature (with its trailing hash type byte) against a
    /// public key. Malformed keys or signatures simply fail the check.
    pub(crate) fn check_sig(&self, sig: &[u8], pub_key: &[u8], script_code: &[u8]) -> Result<bool, ScriptError> {
        let ctx = match self.tx_context {
            Some(ctx) => ctx,
            None => return Ok(false),
        };
        let (hash_type, der) = match sig.split_last() {
            Some((hash_type, der)) => (*hash_type, der),
            None => return Ok(false),
        };
        let key = match PublicKey::from_bytes(pub_key) {
            Ok(key) => key,
            Err(e) => {
                debug!("unparseable public key: {}", e);
                return Ok(false);
            }
        };
        let signature = match Signature::from_der_lax(der) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("unparseable signature: {}", e);
                return Ok(false);
            }
        };

        let sighash = ctx.signature_hash(script_code, self.input_idx, hash_type, self.sig_version)?;
        Ok(signature.verify(&sighash, &key))
    }

    /// Apply the DERSIG, LOW_S and STRICTENC rules to a signature with its
    /// hash type byte. The empty signature always passes.
    pub(crate) fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), ScriptError> {
        if sig.is_empty() {
            return Ok(());
        }

        if self.has_any(&[VerifyFlags::DERSIG, VerifyFlags::LOW_S, VerifyFlags::STRICTENC])
            && !is_valid_signature_encoding(sig)
        {
            debug!("signature is not strict DER");
            return Err(ScriptError::SigDer);
        }

        if self.has_flag(VerifyFlags::LOW_S) {
            let low_s = Signature::from_der_lax(&sig[..sig.len() - 1])
                .map(|signature| signature.is_low_s())
                .unwrap_or(false);
            if !low_s {
                return Err(ScriptError::SigHighS);
            }
        }

        if self.has_flag(VerifyFlags::STRICTENC) && !is_defined_hash_type(sig[sig.len() - 1]) {
            debug!("undefined sighash type {:#04x}", sig[sig.len() - 1]);
            return Err(ScriptError::SigHashtype);
        }
        Ok(())
    }

    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), ScriptError> {
        if self.has_flag(VerifyFlags::STRICTENC) && !is_compressed_or_uncompressed(pub_key) {
            return Err(ScriptError::PubkeyType);
        }
        if self.has_flag(VerifyFlags::WITNESS_PUBKEYTYPE)
            && self.sig_version == SigVersion::WitnessV0
            && !is_compressed(pub_key)
        {
            return Err(ScriptError::WitnessPubkeyType);
        }
        Ok(())
    }
}

/// Strict DER check (BIP66) on a signature that still carries its hash
/// type byte.
///
/// Layout: `0x30 <total> 0x02 <lenR> <R> 0x02 <lenS> <S> <hashtype>`. R and S
/// must be positive and minimally encoded.
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    let len = sig.len();
    if !(9..=73).contains(&len) {
        return false;
    }
    if sig[0] != 0x30 || sig[1] as usize != len - 3 {
        return false;
    }

    let len_r = sig[3] as usize;
    if 5 + len_r >= len {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 7 != len {
        return false;
    }

    if sig[2] != 0x02 || len_r == 0 {
        return false;
    }
    if sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 || len_s == 0 {
        return false;
    }
    if sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }
    true
}

/// ALL, NONE or SINGLE, optionally with ANYONECANPAY.
fn is_defined_hash_type(hash_type: u8) -> bool {
    matches!(hash_type & !SIGHASH_ANYONECANPAY, 0x01..=0x03)
}

fn is_compressed(pub_key: &[u8]) -> bool {
    pub_key.len() == COMPRESSED_LEN && (pub_key[0] == 0x02 || pub_key[0] == 0x03)
}

fn is_compressed_or_uncompressed(pub_key: &[u8]) -> bool {
    is_compressed(pub_key) || (pub_key.len() == UNCOMPRESSED_LEN && pub_key[0] == 0x04)
}
