//! Spend verification: scriptSig, scriptPubKey, P2SH and witness programs.

use btc_primitives::hash::sha256;
use log::debug;

use crate::chunk::encode_push_data;
use crate::opcodes::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};
use crate::pattern::{is_p2sh, witness_program};
use crate::{Script, ScriptError};

use super::config::MAX_SCRIPT_ELEMENT_SIZE;
use super::flags::VerifyFlags;
use super::stack::{as_bool, Stack};
use super::{execute_script, SigVersion, TxContext};

/// Byte length of a P2WPKH program.
const WITNESS_V0_KEYHASH_LEN: usize = 20;
/// Byte length of a P2WSH program.
const WITNESS_V0_SCRIPTHASH_LEN: usize = 32;

/// Verify that `script_sig` and `witness` satisfy `script_pubkey`.
///
/// # Arguments
/// * `script_sig` - The spending input's unlocking script.
/// * `script_pubkey` - The locking script of the output being spent.
/// * `witness` - The input's witness stack, bottom to top. Empty for
///   legacy inputs.
/// * `flags` - Verification flags.
/// * `ctx` - Transaction context for signature and lock time checks.
/// * `input_index` - The input being verified.
///
/// # Returns
/// `Ok(())` if the spend is valid, otherwise the `ScriptError` explaining
/// the failure.
pub fn verify_script(
    script_sig: &Script,
    script_pubkey: &Script,
    witness: &[Vec<u8>],
    flags: VerifyFlags,
    ctx: Option<&dyn TxContext>,
    input_index: usize,
) -> Result<(), ScriptError> {
    let result = Verifier {
        flags,
        ctx,
        input_index,
    }
    .verify(script_sig, script_pubkey, witness);
    if let Err(e) = result {
        debug!("input {} failed verification: {}", input_index, e.name());
    }
    result
}

struct Verifier<'a> {
    flags: VerifyFlags,
    ctx: Option<&'a dyn TxContext>,
    input_index: usize,
}

impl<'a> Verifier<'a> {
    fn verify(&self, script_sig: &Script, script_pubkey: &Script, witness: &[Vec<u8>]) -> Result<(), ScriptError> {
        let mut had_witness = false;

        if self.flags.has_flag(VerifyFlags::SIGPUSHONLY) && !script_sig.is_push_only() {
            return Err(ScriptError::SigPushonly);
        }

        let mut stack = Stack::new();
        self.execute(script_sig, &mut stack, SigVersion::Base)?;
        let p2sh_stack = stack.clone();

        self.execute(script_pubkey, &mut stack, SigVersion::Base)?;
        require_true_top(&stack)?;

        // Native witness program
        if self.flags.has_flag(VerifyFlags::WITNESS) {
            if let Some((version, program)) = witness_program(script_pubkey) {
                had_witness = true;
                if !script_sig.is_empty() {
                    return Err(ScriptError::WitnessMalleated);
                }
                self.verify_witness_program(witness, version, program)?;
                // Leave a single item so CLEANSTACK passes
                stack = Stack::from_items(vec![vec![1]]);
            }
        }

        // Pay to script hash
        if self.flags.has_flag(VerifyFlags::P2SH) && is_p2sh(script_pubkey) {
            if !script_sig.is_push_only() {
                return Err(ScriptError::SigPushonly);
            }

            stack = p2sh_stack;
            let serialized = stack.pop_byte_array().map_err(|_| ScriptError::EvalFalse)?;
            let redeem_script = Script::parse(&serialized).map_err(|_| ScriptError::MalformedPush)?;

            self.execute(&redeem_script, &mut stack, SigVersion::Base)?;
            require_true_top(&stack)?;

            if self.flags.has_flag(VerifyFlags::WITNESS) {
                if let Some((version, program)) = witness_program(&redeem_script) {
                    had_witness = true;
                    // The scriptSig must be exactly one push of the redeem script
                    if script_sig.program() != encode_push_data(&serialized)?.as_slice() {
                        return Err(ScriptError::WitnessMalleatedP2sh);
                    }
                    self.verify_witness_program(witness, version, program)?;
                    stack = Stack::from_items(vec![vec![1]]);
                }
            }
        }

        if self.flags.has_flag(VerifyFlags::CLEANSTACK) && stack.depth() != 1 {
            return Err(ScriptError::CleanStack);
        }

        if self.flags.has_flag(VerifyFlags::WITNESS) && !had_witness && !witness.is_empty() {
            return Err(ScriptError::WitnessUnexpected);
        }

        Ok(())
    }

    fn execute(&self, script: &Script, stack: &mut Stack, sig_version: SigVersion) -> Result<(), ScriptError> {
        execute_script(self.ctx, self.input_index, script, stack, self.flags, sig_version)
    }

    /// Run a witness program against the witness stack.
    fn verify_witness_program(&self, witness: &[Vec<u8>], version: u8, program: &[u8]) -> Result<(), ScriptError> {
        if version != 0 {
            if self.flags.has_flag(VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
                return Err(ScriptError::DiscourageUpgradableWitnessProgram);
            }
            // Future versions are anyone-can-spend
            return Ok(());
        }

        let (script, items) = match program.len() {
            WITNESS_V0_SCRIPTHASH_LEN => {
                let (witness_script, items) = witness
                    .split_last()
                    .ok_or(ScriptError::WitnessProgramWitnessEmpty)?;
                if sha256(witness_script).as_slice() != program {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                let script = Script::parse(witness_script).map_err(|_| ScriptError::MalformedPush)?;
                (script, items)
            }
            WITNESS_V0_KEYHASH_LEN => {
                if witness.len() != 2 {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                (pay_to_key_hash_script(program)?, witness)
            }
            len => {
                debug!("witness v0 program of length {}", len);
                return Err(ScriptError::WitnessProgramWrongLength);
            }
        };

        if items.iter().any(|item| item.len() > MAX_SCRIPT_ELEMENT_SIZE) {
            return Err(ScriptError::PushSize);
        }

        let mut stack = Stack::from_items(items.to_vec());
        self.execute(&script, &mut stack, SigVersion::WitnessV0)?;

        // Witness scripts always require a clean stack
        if stack.depth() != 1 {
            return Err(ScriptError::CleanStack);
        }
        require_true_top(&stack)
    }
}

/// Fail with `EvalFalse` unless the top stack item is true.
fn require_true_top(stack: &Stack) -> Result<(), ScriptError> {
    match stack.peek_byte_array(0) {
        Ok(top) if as_bool(top) => Ok(()),
        _ => Err(ScriptError::EvalFalse),
    }
}

/// The script executed for a P2WPKH program.
fn pay_to_key_hash_script(key_hash: &[u8]) -> Result<Script, ScriptError> {
    let mut program = vec![OP_DUP, OP_HASH160];
    program.extend(encode_push_data(key_hash)?);
    program.extend([OP_EQUALVERIFY, OP_CHECKSIG]);
    Script::parse(&program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{
        create_p2pkh_output_script, create_p2sh_output_script_for, create_p2wpkh_output_script,
        create_p2wsh_output_script,
    };
    use crate::ScriptBuilder;
    use btc_primitives::ec::PrivateKey;
    use btc_primitives::hash::hash160;

    const ALL: VerifyFlags = VerifyFlags::STANDARD;

    fn asm(s: &str) -> Script {
        Script::from_asm(s).unwrap()
    }

    /// Push-only scriptSig pushing each item with a minimal push.
    fn pushes(items: &[&[u8]]) -> Script {
        let mut builder = ScriptBuilder::new();
        for item in items {
            builder.data(item).unwrap();
        }
        builder.build()
    }

    /// Context whose signature hash is the SHA-256 of the script code.
    struct HashScriptCode;

    impl TxContext for HashScriptCode {
        fn signature_hash(&self, script_code: &[u8], _: usize, _: u8, _: SigVersion) -> Result<[u8; 32], ScriptError> {
            Ok(sha256(script_code))
        }

        fn lock_time(&self) -> u32 {
            0
        }

        fn tx_version(&self) -> u32 {
            2
        }

        fn input_sequence(&self, _: usize) -> u32 {
            0
        }
    }

    // -----------------------------------------------------------------------
    // Legacy
    // -----------------------------------------------------------------------

    #[test]
    fn test_simple_spend() {
        assert!(verify_script(&asm("OP_1"), &asm("OP_1 OP_EQUAL"), &[], ALL, None, 0).is_ok());
        assert_eq!(
            verify_script(&asm("OP_1"), &asm("OP_2 OP_EQUAL"), &[], ALL, None, 0),
            Err(ScriptError::EvalFalse)
        );
        assert_eq!(
            verify_script(&Script::default(), &Script::default(), &[], VerifyFlags::NONE, None, 0),
            Err(ScriptError::EvalFalse)
        );
    }

    #[test]
    fn test_sig_push_only() {
        let script_sig = asm("OP_1 OP_DUP");
        let script_pubkey = asm("OP_EQUAL");
        assert!(verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::NONE, None, 0).is_ok());
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::SIGPUSHONLY, None, 0),
            Err(ScriptError::SigPushonly)
        );
    }

    /// The scriptSig cannot leave an open conditional for the scriptPubKey.
    #[test]
    fn test_scripts_run_separately() {
        assert_eq!(
            verify_script(&asm("OP_0 OP_IF"), &asm("OP_ENDIF OP_1"), &[], VerifyFlags::NONE, None, 0),
            Err(ScriptError::UnbalancedConditional)
        );
    }

    #[test]
    fn test_clean_stack() {
        let script_sig = asm("OP_1 OP_1");
        let script_pubkey = asm("OP_1");
        assert!(verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::P2SH, None, 0).is_ok());
        assert_eq!(
            verify_script(
                &script_sig,
                &script_pubkey,
                &[],
                VerifyFlags::P2SH | VerifyFlags::CLEANSTACK,
                None,
                0
            ),
            Err(ScriptError::CleanStack)
        );
    }

    #[test]
    fn test_p2pkh_spend() {
        let key = PrivateKey::from_bytes(&[7; 32]).unwrap();
        let pub_key = key.pub_key().to_compressed();
        let script_pubkey = create_p2pkh_output_script(&hash160(&pub_key));
        let sig = key.sign_with_hash_type(&sha256(script_pubkey.program()), 0x01).unwrap();
        let script_sig = pushes(&[&sig, &pub_key]);

        let ctx = HashScriptCode;
        assert!(verify_script(&script_sig, &script_pubkey, &[], ALL, Some(&ctx), 0).is_ok());

        let other = PrivateKey::from_bytes(&[8; 32]).unwrap().pub_key().to_compressed();
        let wrong_key = pushes(&[&sig, &other]);
        assert_eq!(
            verify_script(&wrong_key, &script_pubkey, &[], ALL, Some(&ctx), 0),
            Err(ScriptError::EqualVerify)
        );
    }

    // -----------------------------------------------------------------------
    // P2SH
    // -----------------------------------------------------------------------

    #[test]
    fn test_p2sh_redeem_script() {
        let redeem = asm("OP_2 OP_EQUAL");
        let script_pubkey = create_p2sh_output_script_for(&redeem);
        let script_sig = pushes(&[&[2], redeem.program()]);
        assert!(verify_script(&script_sig, &script_pubkey, &[], ALL, None, 0).is_ok());

        // Redeem script evaluates to false
        let bad = pushes(&[&[3], redeem.program()]);
        assert_eq!(
            verify_script(&bad, &script_pubkey, &[], ALL, None, 0),
            Err(ScriptError::EvalFalse)
        );
        // Without P2SH only the hash is checked
        assert!(verify_script(&bad, &script_pubkey, &[], VerifyFlags::NONE, None, 0).is_ok());
    }

    #[test]
    fn test_p2sh_requires_push_only() {
        let redeem = asm("OP_1");
        let script_pubkey = create_p2sh_output_script_for(&redeem);
        let mut builder = ScriptBuilder::new();
        builder.add_opcode(crate::opcodes::OP_NOP);
        builder.data(redeem.program()).unwrap();
        let script_sig = builder.build();
        assert_eq!(
            verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::P2SH, None, 0),
            Err(ScriptError::SigPushonly)
        );
    }

    // -----------------------------------------------------------------------
    // Witness
    // -----------------------------------------------------------------------

    #[test]
    fn test_p2wsh_spend() {
        let witness_script = asm("OP_2 OP_EQUAL");
        let script_pubkey = create_p2wsh_output_script(&sha256(witness_script.program()));
        let witness = vec![vec![2], witness_script.program().to_vec()];
        assert!(verify_script(&Script::default(), &script_pubkey, &witness, ALL, None, 0).is_ok());

        let wrong = vec![vec![3], witness_script.program().to_vec()];
        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &wrong, ALL, None, 0),
            Err(ScriptError::EvalFalse)
        );

        let mismatch = vec![vec![2], asm("OP_3 OP_EQUAL").program().to_vec()];
        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &mismatch, ALL, None, 0),
            Err(ScriptError::WitnessProgramMismatch)
        );

        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &[], ALL, None, 0),
            Err(ScriptError::WitnessProgramWitnessEmpty)
        );
    }

    /// Witness scripts must leave exactly one item.
    #[test]
    fn test_p2wsh_implicit_clean_stack() {
        let witness_script = asm("OP_1");
        let script_pubkey = create_p2wsh_output_script(&sha256(witness_script.program()));
        let witness = vec![vec![1], witness_script.program().to_vec()];
        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &witness, VerifyFlags::P2SH | VerifyFlags::WITNESS, None, 0),
            Err(ScriptError::CleanStack)
        );
    }

    #[test]
    fn test_witness_malleated() {
        let witness_script = asm("OP_1");
        let script_pubkey = create_p2wsh_output_script(&sha256(witness_script.program()));
        let witness = vec![witness_script.program().to_vec()];
        assert!(verify_script(&Script::default(), &script_pubkey, &witness, ALL, None, 0).is_ok());
        assert_eq!(
            verify_script(&asm("OP_0"), &script_pubkey, &witness, ALL, None, 0),
            Err(ScriptError::WitnessMalleated)
        );
    }

    #[test]
    fn test_p2wpkh_spend() {
        let key = PrivateKey::from_bytes(&[9; 32]).unwrap();
        let pub_key = key.pub_key().to_compressed();
        let key_hash = hash160(&pub_key);
        let script_pubkey = create_p2wpkh_output_script(&key_hash);

        let script_code = pay_to_key_hash_script(&key_hash).unwrap();
        let sig = key.sign_with_hash_type(&sha256(script_code.program()), 0x01).unwrap();

        let ctx = HashScriptCode;
        let witness = vec![sig.clone(), pub_key.to_vec()];
        assert!(verify_script(&Script::default(), &script_pubkey, &witness, ALL, Some(&ctx), 0).is_ok());

        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &[sig], ALL, Some(&ctx), 0),
            Err(ScriptError::WitnessProgramMismatch)
        );
    }

    #[test]
    fn test_p2sh_wrapped_witness() {
        let witness_script = asm("OP_1");
        let redeem = create_p2wsh_output_script(&sha256(witness_script.program()));
        let script_pubkey = create_p2sh_output_script_for(&redeem);
        let witness = vec![witness_script.program().to_vec()];

        let script_sig = pushes(&[redeem.program()]);
        assert!(verify_script(&script_sig, &script_pubkey, &witness, ALL, None, 0).is_ok());

        // Extra push in front of the redeem script
        let padded = pushes(&[&[5], redeem.program()]);
        assert_eq!(
            verify_script(&padded, &script_pubkey, &witness, ALL, None, 0),
            Err(ScriptError::WitnessMalleatedP2sh)
        );
    }

    #[test]
    fn test_witness_wrong_length_and_unexpected() {
        let script_pubkey = asm("OP_0 aabbccddeeff00112233aabbccddeeff0011223344");
        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &[vec![1]], ALL, None, 0),
            Err(ScriptError::WitnessProgramWrongLength)
        );

        assert_eq!(
            verify_script(&asm("OP_1"), &asm("OP_1 OP_EQUAL"), &[vec![1]], ALL, None, 0),
            Err(ScriptError::WitnessUnexpected)
        );
    }

    #[test]
    fn test_future_witness_version() {
        let script_pubkey = asm("OP_1 0001020304050607080910111213141516171819");
        let flags = VerifyFlags::P2SH | VerifyFlags::WITNESS;
        assert!(verify_script(&Script::default(), &script_pubkey, &[], flags, None, 0).is_ok());
        assert_eq!(
            verify_script(
                &Script::default(),
                &script_pubkey,
                &[],
                flags | VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
                None,
                0
            ),
            Err(ScriptError::DiscourageUpgradableWitnessProgram)
        );
    }

    #[test]
    fn test_witness_element_size() {
        let witness_script = asm("OP_SIZE OP_NIP 0902 OP_EQUAL");
        let script_pubkey = create_p2wsh_output_script(&sha256(witness_script.program()));
        let witness = vec![vec![0; 521], witness_script.program().to_vec()];
        assert_eq!(
            verify_script(&Script::default(), &script_pubkey, &witness, ALL, None, 0),
            Err(ScriptError::PushSize)
        );
    }
}
