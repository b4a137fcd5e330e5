//! Bitcoin script interpreter.
//!
//! Executes scripts against a stack under a set of [`VerifyFlags`], and
//! verifies complete spends (scriptSig, scriptPubKey, P2SH redeem scripts
//! and version 0 witness programs) through [`verify_script`].
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers provide
//! a [`TxContext`] implementation that computes signature hashes and exposes
//! lock time data; ECDSA verification itself happens here.
//!
//! # Example
//!
//! ```
//! use btc_script::interpreter::{execute_script, SigVersion, Stack, VerifyFlags};
//! use btc_script::Script;
//!
//! let script = Script::from_asm("OP_2 OP_3 OP_ADD OP_5 OP_EQUAL").unwrap();
//! let mut stack = Stack::new();
//! execute_script(None, 0, &script, &mut stack, VerifyFlags::NONE, SigVersion::Base).unwrap();
//! assert_eq!(stack.items(), &[vec![1u8]]);
//! ```

pub mod config;
pub mod flags;
pub mod operation;
pub mod scriptnum;
pub mod stack;
pub mod verify;

mod ops_arithmetic;
mod ops_crypto;
mod ops_equality;
mod ops_flow;
mod ops_stack;
mod thread;

pub use flags::VerifyFlags;
pub use operation::Operation;
pub use ops_crypto::is_valid_signature_encoding;
pub use stack::{as_bool as cast_to_bool, Stack};
pub use verify::verify_script;

use log::debug;

use crate::{Script, ScriptError};
use thread::Thread;

/// Which signature hashing rules a script runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigVersion {
    /// Legacy scripts: scriptSig, scriptPubKey and P2SH redeem scripts.
    Base,
    /// Version 0 witness scripts (BIP143 signature hashing).
    WitnessV0,
}

/// Transaction data needed by OP_CHECKSIG, OP_CHECKMULTISIG,
/// OP_CHECKLOCKTIMEVERIFY and OP_CHECKSEQUENCEVERIFY.
///
/// Implemented by the transaction layer so this crate stays independent
/// of transaction serialization.
pub trait TxContext {
    /// Compute the 32-byte digest a signature on `input_idx` commits to.
    ///
    /// # Arguments
    /// * `script_code` - The script code, already cut at the last executed
    ///   OP_CODESEPARATOR and, for legacy scripts, stripped of the signature.
    /// * `input_idx` - The input being verified.
    /// * `hash_type` - The sighash byte taken from the end of the signature.
    /// * `sig_version` - Legacy or BIP143 hashing.
    fn signature_hash(
        &self,
        script_code: &[u8],
        input_idx: usize,
        hash_type: u8,
        sig_version: SigVersion,
    ) -> Result<[u8; 32], ScriptError>;

    /// The transaction lock time.
    fn lock_time(&self) -> u32;

    /// The transaction version.
    fn tx_version(&self) -> u32;

    /// The sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// Execute one script against `stack`.
///
/// The stack is only updated when execution succeeds; on failure it is
/// left as it was.
///
/// # Arguments
/// * `ctx` - Transaction context. Without one, signature checks evaluate
///   to false and lock time checks fail.
/// * `input_index` - The input being verified.
/// * `script` - The script to execute.
/// * `stack` - The stack to execute on, bottom to top.
/// * `flags` - Verification flags.
/// * `sig_version` - Legacy or witness v0 rules.
///
/// # Returns
/// `Ok(())` or the first `ScriptError` raised.
pub fn execute_script(
    ctx: Option<&dyn TxContext>,
    input_index: usize,
    script: &Script,
    stack: &mut Stack,
    flags: VerifyFlags,
    sig_version: SigVersion,
) -> Result<(), ScriptError> {
    let mut thread = Thread::new(script, stack.clone(), flags, sig_version, ctx, input_index);
    match thread.execute() {
        Ok(()) => {
            *stack = thread.into_stack();
            Ok(())
        }
        Err(e) => {
            debug!("input {}: script {} failed: {}", input_index, script, e.name());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::*;
    use crate::ScriptChunk;
    use btc_primitives::ec::PrivateKey;
    use btc_primitives::hash::sha256;

    /// Run an ASM script on an empty stack and return the final items.
    fn run(asm: &str, flags: VerifyFlags) -> Result<Vec<Vec<u8>>, ScriptError> {
        run_with(None, asm, flags)
    }

    fn run_with(ctx: Option<&dyn TxContext>, asm: &str, flags: VerifyFlags) -> Result<Vec<Vec<u8>>, ScriptError> {
        let script = Script::from_asm(asm).unwrap();
        let mut stack = Stack::new();
        execute_script(ctx, 0, &script, &mut stack, flags, SigVersion::Base)?;
        Ok(stack.into_items())
    }

    fn assert_true(asm: &str) {
        let items = run(asm, VerifyFlags::NONE).unwrap_or_else(|e| panic!("{}: {}", asm, e));
        assert_eq!(items.len(), 1, "{}", asm);
        assert!(cast_to_bool(&items[0]), "{}", asm);
    }

    fn assert_err(asm: &str, flags: VerifyFlags, err: ScriptError) {
        assert_eq!(run(asm, flags), Err(err), "{}", asm);
    }

    /// Context whose signature hash is the SHA-256 of the script code.
    struct MockContext {
        lock_time: u32,
        version: u32,
        sequence: u32,
    }

    impl Default for MockContext {
        fn default() -> Self {
            MockContext {
                lock_time: 0,
                version: 2,
                sequence: 0,
            }
        }
    }

    impl TxContext for MockContext {
        fn signature_hash(
            &self,
            script_code: &[u8],
            _input_idx: usize,
            _hash_type: u8,
            _sig_version: SigVersion,
        ) -> Result<[u8; 32], ScriptError> {
            Ok(sha256(script_code))
        }

        fn lock_time(&self) -> u32 {
            self.lock_time
        }

        fn tx_version(&self) -> u32 {
            self.version
        }

        fn input_sequence(&self, _input_idx: usize) -> u32 {
            self.sequence
        }
    }

    fn key(n: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[n; 32]).unwrap()
    }

    /// Sign the given script code the way `MockContext` hashes it.
    fn sign(key: &PrivateKey, script_code: &[u8]) -> Vec<u8> {
        key.sign_with_hash_type(&sha256(script_code), 0x01).unwrap()
    }

    // -----------------------------------------------------------------------
    // Basic execution
    // -----------------------------------------------------------------------

    #[test]
    fn test_op_1_op_1_op_equal() {
        assert_true("OP_1 OP_1 OP_EQUAL");
    }

    #[test]
    fn test_op_1_op_2_op_equal_is_false() {
        let items = run("OP_1 OP_2 OP_EQUAL", VerifyFlags::NONE).unwrap();
        assert_eq!(items, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_stack_left_untouched_on_failure() {
        let script = Script::from_asm("OP_DROP OP_DROP").unwrap();
        let mut stack = Stack::from_items(vec![vec![7]]);
        let result = execute_script(None, 0, &script, &mut stack, VerifyFlags::NONE, SigVersion::Base);
        assert_eq!(result, Err(ScriptError::InvalidStackOperation));
        assert_eq!(stack.items(), &[vec![7u8]]);
    }

    #[test]
    fn test_empty_script_keeps_stack() {
        let script = Script::default();
        let mut stack = Stack::from_items(vec![vec![1], vec![2]]);
        execute_script(None, 0, &script, &mut stack, VerifyFlags::NONE, SigVersion::Base).unwrap();
        assert_eq!(stack.depth(), 2);
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    #[test]
    fn test_arithmetic() {
        assert_true("OP_2 OP_3 OP_ADD OP_5 OP_EQUAL");
        assert_true("OP_2 OP_3 OP_SUB OP_1NEGATE OP_EQUAL");
        assert_true("OP_5 OP_1ADD OP_6 OP_NUMEQUAL");
        assert_true("OP_5 OP_1SUB OP_4 OP_NUMEQUAL");
        assert_true("OP_5 OP_NEGATE OP_ABS OP_5 OP_NUMEQUAL");
        assert_true("OP_0 OP_NOT");
        assert_true("OP_7 OP_0NOTEQUAL");
        assert_true("OP_1 OP_0 OP_BOOLOR");
        assert_true("OP_1 OP_1 OP_BOOLAND");
        assert_true("OP_1 OP_2 OP_NUMNOTEQUAL");
        assert_true("OP_1 OP_2 OP_LESSTHAN");
        assert_true("OP_2 OP_1 OP_GREATERTHAN");
        assert_true("OP_2 OP_2 OP_LESSTHANOREQUAL");
        assert_true("OP_2 OP_2 OP_GREATERTHANOREQUAL");
        assert_true("OP_3 OP_9 OP_MIN OP_3 OP_EQUAL");
        assert_true("OP_3 OP_9 OP_MAX OP_9 OP_EQUAL");
        assert_true("OP_2 OP_2 OP_NUMEQUALVERIFY OP_1");
    }

    /// WITHIN is inclusive of the lower bound and exclusive of the upper.
    #[test]
    fn test_op_within() {
        assert_true("OP_2 OP_2 OP_5 OP_WITHIN");
        assert_true("OP_5 OP_2 OP_5 OP_WITHIN OP_NOT");
        assert_true("OP_1 OP_2 OP_5 OP_WITHIN OP_NOT");
    }

    #[test]
    fn test_numeric_operand_limits() {
        // 5-byte operand
        assert_err("0000000001 OP_1ADD", VerifyFlags::NONE, ScriptError::UnknownError);
        // Results may exceed 4 bytes as long as they are not reused as numbers
        assert_true("ffffff7f OP_1ADD 0000008000 OP_EQUAL");
        // Non-minimal operand only fails under MINIMALDATA
        assert_true("0100 OP_1 OP_NUMEQUAL");
        assert_err("0100 OP_1 OP_NUMEQUAL", VerifyFlags::MINIMALDATA, ScriptError::UnknownError);
        assert_err("OP_1 OP_NUMEQUALVERIFY", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
        assert_err("OP_1 OP_2 OP_NUMEQUALVERIFY", VerifyFlags::NONE, ScriptError::NumEqualVerify);
    }

    // -----------------------------------------------------------------------
    // Stack operations
    // -----------------------------------------------------------------------

    #[test]
    fn test_stack_ops() {
        assert_true("OP_1 OP_2 OP_SWAP OP_1 OP_EQUALVERIFY OP_2 OP_EQUAL");
        assert_true("OP_1 OP_2 OP_3 OP_ROT OP_1 OP_EQUALVERIFY OP_2DROP OP_1");
        assert_true("OP_1 OP_2 OP_TUCK OP_2 OP_EQUALVERIFY OP_1 OP_EQUALVERIFY OP_2 OP_EQUAL");
        assert_true("OP_1 OP_2 OP_2DUP OP_DEPTH OP_4 OP_EQUALVERIFY OP_2DROP OP_2DROP OP_1");
        assert_true("OP_1 OP_2 OP_3 OP_3DUP OP_DEPTH OP_6 OP_EQUALVERIFY OP_2DROP OP_2DROP OP_2DROP OP_1");
        assert_true("OP_1 OP_2 OP_3 OP_4 OP_2OVER OP_2 OP_EQUALVERIFY OP_1 OP_EQUALVERIFY OP_2DROP OP_2DROP OP_1");
        assert_true("OP_1 OP_2 OP_3 OP_4 OP_5 OP_6 OP_2ROT OP_2 OP_EQUALVERIFY OP_1 OP_EQUALVERIFY OP_2DROP OP_2DROP OP_1");
        assert_true("OP_1 OP_2 OP_3 OP_4 OP_2SWAP OP_2 OP_EQUALVERIFY OP_1 OP_EQUALVERIFY OP_2DROP OP_1");
        assert_true("OP_1 OP_2 OP_NIP OP_2 OP_EQUAL");
        assert_true("OP_1 OP_2 OP_OVER OP_1 OP_EQUALVERIFY OP_2DROP OP_1");
        assert_true("OP_1 OP_DUP OP_EQUAL");
        assert_true("aabbcc OP_SIZE OP_3 OP_EQUALVERIFY OP_DROP OP_1");
    }

    #[test]
    fn test_op_pick_roll() {
        assert_true("OP_1 OP_2 OP_3 OP_2 OP_PICK OP_1 OP_EQUALVERIFY OP_DEPTH OP_3 OP_EQUALVERIFY OP_2DROP");
        assert_true("OP_1 OP_2 OP_3 OP_2 OP_ROLL OP_1 OP_EQUALVERIFY OP_DEPTH OP_2 OP_EQUALVERIFY OP_DROP");
        assert_err("OP_1 OP_1 OP_PICK", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
        assert_err("OP_1 OP_1NEGATE OP_ROLL", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
        assert_err("OP_0 OP_PICK", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
    }

    #[test]
    fn test_op_ifdup() {
        assert_true("OP_1 OP_IFDUP OP_DEPTH OP_2 OP_EQUALVERIFY OP_DROP");
        assert_true("OP_0 OP_IFDUP OP_DEPTH OP_1 OP_EQUALVERIFY OP_NOT");
    }

    #[test]
    fn test_alt_stack() {
        assert_true("OP_1 OP_TOALTSTACK OP_FROMALTSTACK");
        assert_err("OP_FROMALTSTACK", VerifyFlags::NONE, ScriptError::InvalidAltstackOperation);
        assert_err("OP_TOALTSTACK", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
    }

    #[test]
    fn test_hash_ops() {
        let items = run("OP_0 OP_SHA256", VerifyFlags::NONE).unwrap();
        assert_eq!(
            hex::encode(&items[0]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let items = run("OP_0 OP_HASH160", VerifyFlags::NONE).unwrap();
        assert_eq!(hex::encode(&items[0]), "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb");
        let items = run("OP_0 OP_RIPEMD160 OP_SIZE OP_NIP", VerifyFlags::NONE).unwrap();
        assert_eq!(items[0], vec![20]);
        let items = run("OP_0 OP_SHA1 OP_SIZE OP_NIP", VerifyFlags::NONE).unwrap();
        assert_eq!(items[0], vec![20]);
        let items = run("OP_0 OP_HASH256 OP_SIZE OP_NIP", VerifyFlags::NONE).unwrap();
        assert_eq!(items[0], vec![32]);
    }

    // -----------------------------------------------------------------------
    // Flow control
    // -----------------------------------------------------------------------

    #[test]
    fn test_if_else_endif() {
        assert_true("OP_1 OP_IF OP_1 OP_ELSE OP_0 OP_ENDIF");
        assert_true("OP_0 OP_IF OP_0 OP_ELSE OP_1 OP_ENDIF");
        assert_true("OP_0 OP_NOTIF OP_1 OP_ENDIF");
        assert_true("OP_1 OP_1 OP_IF OP_IF OP_1 OP_ELSE OP_0 OP_ENDIF OP_ENDIF");
    }

    /// ELSE may appear more than once and toggles each time.
    #[test]
    fn test_multiple_else() {
        assert_true("OP_1 OP_IF OP_1 OP_ELSE OP_0 OP_ELSE OP_1 OP_ENDIF OP_EQUAL");
    }

    #[test]
    fn test_unbalanced_conditionals() {
        assert_err("OP_1 OP_IF", VerifyFlags::NONE, ScriptError::UnbalancedConditional);
        assert_err("OP_ELSE", VerifyFlags::NONE, ScriptError::UnbalancedConditional);
        assert_err("OP_1 OP_ENDIF", VerifyFlags::NONE, ScriptError::UnbalancedConditional);
        assert_err("OP_IF OP_ENDIF", VerifyFlags::NONE, ScriptError::UnbalancedConditional);
    }

    /// Unexecuted branches skip everything except conditionals and
    /// disabled or VERIF-style opcodes.
    #[test]
    fn test_unexecuted_branch() {
        assert_true("OP_0 OP_IF OP_RETURN OP_RESERVED OP_NOP10 ff OP_ENDIF OP_1");
        assert_err("OP_0 OP_IF OP_CAT OP_ENDIF OP_1", VerifyFlags::NONE, ScriptError::DisabledOpcode);
        assert_err("OP_0 OP_IF OP_VERIF OP_ENDIF OP_1", VerifyFlags::NONE, ScriptError::BadOpcode);
    }

    #[test]
    fn test_verify_and_return() {
        assert_err("OP_0 OP_VERIFY", VerifyFlags::NONE, ScriptError::Verify);
        assert_err("OP_RETURN", VerifyFlags::NONE, ScriptError::OpReturn);
        assert_err("OP_1 OP_2 OP_EQUALVERIFY", VerifyFlags::NONE, ScriptError::EqualVerify);
        assert_err("OP_RESERVED", VerifyFlags::NONE, ScriptError::BadOpcode);
    }

    #[test]
    fn test_nops() {
        assert_true("OP_NOP OP_NOP1 OP_NOP4 OP_NOP10 OP_1");
        assert_err("OP_NOP1", VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS, ScriptError::DiscourageUpgradableNops);
        assert_true("OP_CHECKLOCKTIMEVERIFY OP_CHECKSEQUENCEVERIFY OP_1");
        assert_err(
            "OP_CHECKLOCKTIMEVERIFY",
            VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS,
            ScriptError::DiscourageUpgradableNops,
        );
    }

    #[test]
    fn test_minimal_if_only_in_witness() {
        let script = Script::from_asm("02 OP_IF OP_1 OP_ENDIF").unwrap();
        let mut stack = Stack::new();
        let result = execute_script(None, 0, &script, &mut stack, VerifyFlags::MINIMALIF, SigVersion::Base);
        assert!(result.is_ok());

        let mut stack = Stack::new();
        let result = execute_script(
            None,
            0,
            &script,
            &mut stack,
            VerifyFlags::MINIMALIF,
            SigVersion::WitnessV0,
        );
        assert_eq!(result, Err(ScriptError::MinimalIf));
    }

    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    #[test]
    fn test_disabled_opcodes() {
        for op in [OP_CAT, OP_SUBSTR, OP_MUL, OP_LSHIFT, OP_INVERT] {
            let script = Script::from_chunks(vec![ScriptChunk::op(op)]);
            let mut stack = Stack::new();
            let result = execute_script(None, 0, &script, &mut stack, VerifyFlags::NONE, SigVersion::Base);
            assert_eq!(result, Err(ScriptError::DisabledOpcode), "{}", opcode_to_string(op));
        }
    }

    #[test]
    fn test_op_count_limit() {
        let ok = vec!["OP_NOP"; 201].join(" ");
        assert!(run(&ok, VerifyFlags::NONE).is_ok());
        let too_many = vec!["OP_NOP"; 202].join(" ");
        assert_err(&too_many, VerifyFlags::NONE, ScriptError::OpCount);
        // Push opcodes do not count
        let pushes = vec!["OP_1"; 300].join(" ");
        assert!(run(&pushes, VerifyFlags::NONE).is_ok());
    }

    #[test]
    fn test_stack_size_limit() {
        let ok = vec!["OP_1"; 1000].join(" ");
        assert!(run(&ok, VerifyFlags::NONE).is_ok());
        let too_deep = vec!["OP_1"; 1001].join(" ");
        assert_err(&too_deep, VerifyFlags::NONE, ScriptError::StackSize);
        // The alt stack counts too
        let mixed = format!("{} OP_TOALTSTACK OP_1", vec!["OP_1"; 1000].join(" "));
        assert_err(&mixed, VerifyFlags::NONE, ScriptError::StackSize);
    }

    #[test]
    fn test_push_size_limit() {
        let ok = format!("{} OP_SIZE", hex::encode([0u8; 520]));
        assert!(run(&ok, VerifyFlags::NONE).is_ok());
        let too_big = hex::encode([0u8; 521]);
        assert_err(&too_big, VerifyFlags::NONE, ScriptError::PushSize);
    }

    #[test]
    fn test_script_size_limit() {
        let mut program = vec![OP_NOP; 10_001];
        program[0] = OP_1;
        let script = Script::parse(&program).unwrap();
        let mut stack = Stack::new();
        let result = execute_script(None, 0, &script, &mut stack, VerifyFlags::NONE, SigVersion::Base);
        assert_eq!(result, Err(ScriptError::ScriptSize));
    }

    #[test]
    fn test_minimal_data() {
        assert_true("01 OP_1 OP_EQUAL");
        assert_err("01", VerifyFlags::MINIMALDATA, ScriptError::MinimalData);
        assert!(run("0102", VerifyFlags::MINIMALDATA).is_ok());
        // Not checked in an unexecuted branch
        assert!(run("OP_0 OP_IF 01 OP_ENDIF", VerifyFlags::MINIMALDATA).is_ok());
    }

    // -----------------------------------------------------------------------
    // Lock time
    // -----------------------------------------------------------------------

    #[test]
    fn test_checklocktimeverify() {
        let flags = VerifyFlags::CHECKLOCKTIMEVERIFY;
        let ctx = MockContext {
            lock_time: 100,
            ..Default::default()
        };
        assert!(run_with(Some(&ctx), "64 OP_CHECKLOCKTIMEVERIFY", flags).is_ok());
        assert_eq!(
            run_with(Some(&ctx), "65 OP_CHECKLOCKTIMEVERIFY", flags),
            Err(ScriptError::UnsatisfiedLocktime)
        );
        assert_eq!(
            run_with(Some(&ctx), "OP_1NEGATE OP_CHECKLOCKTIMEVERIFY", flags),
            Err(ScriptError::NegativeLocktime)
        );
        assert_eq!(
            run_with(Some(&ctx), "OP_CHECKLOCKTIMEVERIFY", flags),
            Err(ScriptError::InvalidStackOperation)
        );
        // The operand stays on the stack
        assert_eq!(run_with(Some(&ctx), "64 OP_CHECKLOCKTIMEVERIFY", flags).unwrap(), vec![vec![0x64]]);

        let final_ctx = MockContext {
            lock_time: 100,
            sequence: 0xffff_ffff,
            ..Default::default()
        };
        assert_eq!(
            run_with(Some(&final_ctx), "64 OP_CHECKLOCKTIMEVERIFY", flags),
            Err(ScriptError::UnsatisfiedLocktime)
        );
        assert_eq!(run("64 OP_CHECKLOCKTIMEVERIFY", flags), Err(ScriptError::UnsatisfiedLocktime));
    }

    #[test]
    fn test_checksequenceverify() {
        let flags = VerifyFlags::CHECKSEQUENCEVERIFY;
        let ctx = MockContext {
            sequence: 10,
            ..Default::default()
        };
        assert!(run_with(Some(&ctx), "0a OP_CHECKSEQUENCEVERIFY", flags).is_ok());
        assert_eq!(
            run_with(Some(&ctx), "0b OP_CHECKSEQUENCEVERIFY", flags),
            Err(ScriptError::UnsatisfiedLocktime)
        );

        // Version 1 transactions have no relative lock time
        let v1 = MockContext {
            sequence: 10,
            version: 1,
            ..Default::default()
        };
        assert_eq!(
            run_with(Some(&v1), "0a OP_CHECKSEQUENCEVERIFY", flags),
            Err(ScriptError::UnsatisfiedLocktime)
        );

        // Disable flag on the operand turns the check into a NOP
        assert!(run_with(Some(&v1), "0000008000 OP_CHECKSEQUENCEVERIFY", flags).is_ok());

        // Time-based requirement against a height-based sequence
        assert_eq!(
            run_with(Some(&ctx), "0a0040 OP_CHECKSEQUENCEVERIFY", flags),
            Err(ScriptError::UnsatisfiedLocktime)
        );
    }

    // -----------------------------------------------------------------------
    // Signatures
    // -----------------------------------------------------------------------

    #[test]
    fn test_checksig_pay_to_pubkey() {
        let priv_key = key(1);
        let pub_key = priv_key.pub_key().to_compressed();
        let lock = Script::from_asm(&format!("{} OP_CHECKSIG", hex::encode(pub_key))).unwrap();
        let sig = sign(&priv_key, lock.program());

        let ctx = MockContext::default();
        let mut stack = Stack::from_items(vec![sig.clone()]);
        execute_script(Some(&ctx), 0, &lock, &mut stack, VerifyFlags::STANDARD, SigVersion::Base).unwrap();
        assert_eq!(stack.items(), &[vec![1u8]]);

        // Wrong key: false, then NULLFAIL rejects the non-empty signature
        let other = Script::from_asm(&format!(
            "{} OP_CHECKSIG",
            hex::encode(key(2).pub_key().to_compressed())
        ))
        .unwrap();
        let mut stack = Stack::from_items(vec![sig.clone()]);
        execute_script(Some(&ctx), 0, &other, &mut stack, VerifyFlags::NONE, SigVersion::Base).unwrap();
        assert_eq!(stack.items(), &[Vec::<u8>::new()]);
        let mut stack = Stack::from_items(vec![sig]);
        let result = execute_script(Some(&ctx), 0, &other, &mut stack, VerifyFlags::NULLFAIL, SigVersion::Base);
        assert_eq!(result, Err(ScriptError::SigNullfail));
    }

    #[test]
    fn test_checksig_without_context_is_false() {
        let items = run("OP_0 OP_0 OP_CHECKSIG", VerifyFlags::NONE).unwrap();
        assert_eq!(items, vec![Vec::<u8>::new()]);
        assert_err("OP_0 OP_0 OP_CHECKSIGVERIFY", VerifyFlags::NONE, ScriptError::CheckSigVerify);
        assert_err("OP_0 OP_CHECKSIG", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
    }

    /// OP_CODESEPARATOR moves the start of the signed script code.
    #[test]
    fn test_codeseparator_script_code() {
        let priv_key = key(3);
        let pub_key = hex::encode(priv_key.pub_key().to_compressed());
        let lock = Script::from_asm(&format!("OP_NOP OP_CODESEPARATOR {} OP_CHECKSIG", pub_key)).unwrap();
        let sig = sign(&priv_key, &lock.program()[2..]);

        let ctx = MockContext::default();
        let mut stack = Stack::from_items(vec![sig]);
        execute_script(Some(&ctx), 0, &lock, &mut stack, VerifyFlags::NONE, SigVersion::Base).unwrap();
        assert_eq!(stack.items(), &[vec![1u8]]);
    }

    #[test]
    fn test_signature_encoding_flags() {
        let pub_key = hex::encode(key(1).pub_key().to_compressed());
        // Not DER at all
        let asm = format!("0102 {} OP_CHECKSIG", pub_key);
        assert!(run(&asm, VerifyFlags::NONE).is_ok());
        assert_err(&asm, VerifyFlags::DERSIG, ScriptError::SigDer);

        // Strict DER with an undefined hash type
        let sig = key(1).sign_with_hash_type(&[0u8; 32], 0x04).unwrap();
        let asm = format!("{} {} OP_CHECKSIG", hex::encode(&sig), pub_key);
        assert!(run(&asm, VerifyFlags::DERSIG).is_ok());
        assert_err(&asm, VerifyFlags::STRICTENC, ScriptError::SigHashtype);

        // Hybrid-looking key under STRICTENC
        let mut bad_key = vec![0x06];
        bad_key.extend([0x11; 64]);
        let asm = format!("OP_0 {} OP_CHECKSIG", hex::encode(&bad_key));
        assert_err(&asm, VerifyFlags::STRICTENC, ScriptError::PubkeyType);
    }

    #[test]
    fn test_high_s_rejected_under_low_s() {
        let mut sig = key(1).sign(&[1u8; 32]).unwrap();
        // Flip S to N - S
        let n = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap();
        let mut high = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut v = n[i] as i16 - sig.s()[i] as i16 - borrow;
            borrow = if v < 0 {
                v += 256;
                1
            } else {
                0
            };
            high[i] = v as u8;
        }
        sig = btc_primitives::ec::Signature::new(*sig.r(), high);
        assert!(!sig.is_low_s());

        // to_der normalizes S, so encode the high-S signature by hand
        let encode_int = |v: &[u8; 32]| {
            let mut out: Vec<u8> = v.iter().copied().skip_while(|b| *b == 0).collect();
            if out[0] & 0x80 != 0 {
                out.insert(0, 0);
            }
            out
        };
        let r = encode_int(sig.r());
        let s = encode_int(sig.s());
        let mut der = vec![0x30, (4 + r.len() + s.len()) as u8, 0x02, r.len() as u8];
        der.extend(&r);
        der.extend([0x02, s.len() as u8]);
        der.extend(&s);
        der.push(0x01);

        let pub_key = hex::encode(key(1).pub_key().to_compressed());
        let asm = format!("{} {} OP_CHECKSIG", hex::encode(&der), pub_key);
        assert!(run(&asm, VerifyFlags::DERSIG).is_ok());
        assert_err(&asm, VerifyFlags::LOW_S, ScriptError::SigHighS);
    }

    #[test]
    fn test_witness_pubkey_type() {
        let uncompressed = hex::encode(key(1).pub_key().to_uncompressed());
        let script = Script::from_asm(&format!("OP_0 {} OP_CHECKSIG", uncompressed)).unwrap();
        let mut stack = Stack::new();
        let flags = VerifyFlags::WITNESS_PUBKEYTYPE;
        assert!(execute_script(None, 0, &script, &mut stack, flags, SigVersion::Base).is_ok());
        let mut stack = Stack::new();
        assert_eq!(
            execute_script(None, 0, &script, &mut stack, flags, SigVersion::WitnessV0),
            Err(ScriptError::WitnessPubkeyType)
        );
    }

    // -----------------------------------------------------------------------
    // Multisig
    // -----------------------------------------------------------------------

    fn multisig_lock(m: u8, keys: &[PrivateKey]) -> Script {
        let mut asm = format!("OP_{}", m);
        for k in keys {
            asm.push(' ');
            asm.push_str(&hex::encode(k.pub_key().to_compressed()));
        }
        asm.push_str(&format!(" OP_{} OP_CHECKMULTISIG", keys.len()));
        Script::from_asm(&asm).unwrap()
    }

    #[test]
    fn test_checkmultisig_two_of_three() {
        let keys = [key(1), key(2), key(3)];
        let lock = multisig_lock(2, &keys);
        let ctx = MockContext::default();

        // Signatures in key order succeed
        let sigs = vec![Vec::new(), sign(&keys[0], lock.program()), sign(&keys[2], lock.program())];
        let mut stack = Stack::from_items(sigs);
        execute_script(Some(&ctx), 0, &lock, &mut stack, VerifyFlags::STANDARD, SigVersion::Base).unwrap();
        assert_eq!(stack.items(), &[vec![1u8]]);

        // Out of order fails
        let sigs = vec![Vec::new(), sign(&keys[2], lock.program()), sign(&keys[0], lock.program())];
        let mut stack = Stack::from_items(sigs.clone());
        execute_script(Some(&ctx), 0, &lock, &mut stack, VerifyFlags::NONE, SigVersion::Base).unwrap();
        assert_eq!(stack.items(), &[Vec::<u8>::new()]);

        let mut stack = Stack::from_items(sigs);
        assert_eq!(
            execute_script(Some(&ctx), 0, &lock, &mut stack, VerifyFlags::NULLFAIL, SigVersion::Base),
            Err(ScriptError::SigNullfail)
        );
    }

    #[test]
    fn test_checkmultisig_dummy_and_counts() {
        assert_true("OP_0 OP_0 OP_0 OP_CHECKMULTISIG");
        assert_true("OP_1 OP_0 OP_0 OP_CHECKMULTISIG");
        assert_err("OP_1 OP_0 OP_0 OP_CHECKMULTISIG", VerifyFlags::NULLDUMMY, ScriptError::SigNulldummy);
        assert_err("OP_0 OP_0 OP_CHECKMULTISIG", VerifyFlags::NONE, ScriptError::InvalidStackOperation);
        assert_err("OP_0 OP_1NEGATE OP_CHECKMULTISIG", VerifyFlags::NONE, ScriptError::PubkeyCount);
        assert_err("OP_0 15 OP_CHECKMULTISIG", VerifyFlags::NONE, ScriptError::PubkeyCount);
        assert_err("OP_0 OP_1 OP_0 OP_CHECKMULTISIG", VerifyFlags::NONE, ScriptError::SigCount);
        assert_err(
            "OP_0 OP_0 OP_1 OP_0 OP_1 OP_CHECKMULTISIGVERIFY",
            VerifyFlags::NONE,
            ScriptError::CheckMultisigVerify,
        );
    }

    /// Each CHECKMULTISIG adds its key count to the operation count.
    #[test]
    fn test_checkmultisig_op_count() {
        let multisig = format!("OP_0 OP_0 {} 14 OP_CHECKMULTISIG", vec!["OP_1"; 20].join(" "));
        // 180 NOPs + CHECKMULTISIG + 20 keys = 201
        let at_limit = format!("{} {}", vec!["OP_NOP"; 180].join(" "), multisig);
        assert_true(&at_limit);
        let over_limit = format!("{} {}", vec!["OP_NOP"; 181].join(" "), multisig);
        assert_err(&over_limit, VerifyFlags::NONE, ScriptError::OpCount);
    }
}
