/// Failure reasons produced by script parsing, execution and spend
/// verification.
///
/// The set is closed: every failed verification yields exactly one of
/// these values and success is `Ok(())`. `name()` returns the canonical
/// upper-case identifier used by the standard script test vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ScriptError {
    /// A failure with no more specific code, including out-of-range script numbers.
    #[error("unknown error")]
    UnknownError,

    /// Execution finished with an empty stack or a false top element.
    #[error("script evaluated without error but finished with a false/empty top stack element")]
    EvalFalse,

    #[error("OP_RETURN was encountered")]
    OpReturn,

    /// Script larger than the 10,000 byte limit.
    #[error("script is too big")]
    ScriptSize,

    /// A single push or stack element larger than 520 bytes.
    #[error("push value size limit exceeded")]
    PushSize,

    /// More than 201 non-push operations.
    #[error("operation limit exceeded")]
    OpCount,

    /// Main plus alt stack larger than 1000 elements.
    #[error("stack size limit exceeded")]
    StackSize,

    #[error("signature count negative or greater than pubkey count")]
    SigCount,

    #[error("pubkey count negative or limit exceeded")]
    PubkeyCount,

    #[error("script failed an OP_VERIFY operation")]
    Verify,

    #[error("script failed an OP_EQUALVERIFY operation")]
    EqualVerify,

    #[error("script failed an OP_CHECKMULTISIGVERIFY operation")]
    CheckMultisigVerify,

    #[error("script failed an OP_CHECKSIGVERIFY operation")]
    CheckSigVerify,

    #[error("script failed an OP_NUMEQUALVERIFY operation")]
    NumEqualVerify,

    /// An undefined or reserved opcode was executed.
    #[error("opcode missing or not understood")]
    BadOpcode,

    #[error("attempted to use a disabled opcode")]
    DisabledOpcode,

    #[error("operation not valid with the current stack size")]
    InvalidStackOperation,

    #[error("operation not valid with the current altstack size")]
    InvalidAltstackOperation,

    #[error("invalid OP_IF construction")]
    UnbalancedConditional,

    #[error("negative locktime")]
    NegativeLocktime,

    #[error("locktime requirement not satisfied")]
    UnsatisfiedLocktime,

    #[error("signature hash type missing or not understood")]
    SigHashtype,

    #[error("non-canonical DER signature")]
    SigDer,

    #[error("data push larger than necessary")]
    MinimalData,

    #[error("only push operators allowed in signatures")]
    SigPushonly,

    #[error("non-canonical signature: S value is unnecessarily high")]
    SigHighS,

    #[error("dummy CHECKMULTISIG argument must be zero")]
    SigNulldummy,

    #[error("public key is neither compressed or uncompressed")]
    PubkeyType,

    #[error("stack size must be exactly one after execution")]
    CleanStack,

    #[error("OP_IF/NOTIF argument must be minimal")]
    MinimalIf,

    #[error("signature must be zero for failed CHECK(MULTI)SIG operation")]
    SigNullfail,

    #[error("NOPx reserved for soft-fork upgrades")]
    DiscourageUpgradableNops,

    #[error("witness version reserved for soft-fork upgrades")]
    DiscourageUpgradableWitnessProgram,

    #[error("witness program has incorrect length")]
    WitnessProgramWrongLength,

    #[error("witness program was passed an empty witness")]
    WitnessProgramWitnessEmpty,

    #[error("witness program hash mismatch")]
    WitnessProgramMismatch,

    #[error("witness requires empty scriptSig")]
    WitnessMalleated,

    #[error("witness requires only-redeemscript scriptSig")]
    WitnessMalleatedP2sh,

    #[error("witness provided for non-witness script")]
    WitnessUnexpected,

    #[error("using non-compressed keys in segwit")]
    WitnessPubkeyType,

    /// A push length runs past the end of the program.
    #[error("malformed push: data extends past end of script")]
    MalformedPush,
}

impl ScriptError {
    /// Every variant, in declaration order.
    pub const ALL: [ScriptError; 41] = [
        ScriptError::UnknownError,
        ScriptError::EvalFalse,
        ScriptError::OpReturn,
        ScriptError::ScriptSize,
        ScriptError::PushSize,
        ScriptError::OpCount,
        ScriptError::StackSize,
        ScriptError::SigCount,
        ScriptError::PubkeyCount,
        ScriptError::Verify,
        ScriptError::EqualVerify,
        ScriptError::CheckMultisigVerify,
        ScriptError::CheckSigVerify,
        ScriptError::NumEqualVerify,
        ScriptError::BadOpcode,
        ScriptError::DisabledOpcode,
        ScriptError::InvalidStackOperation,
        ScriptError::InvalidAltstackOperation,
        ScriptError::UnbalancedConditional,
        ScriptError::NegativeLocktime,
        ScriptError::UnsatisfiedLocktime,
        ScriptError::SigHashtype,
        ScriptError::SigDer,
        ScriptError::MinimalData,
        ScriptError::SigPushonly,
        ScriptError::SigHighS,
        ScriptError::SigNulldummy,
        ScriptError::PubkeyType,
        ScriptError::CleanStack,
        ScriptError::MinimalIf,
        ScriptError::SigNullfail,
        ScriptError::DiscourageUpgradableNops,
        ScriptError::DiscourageUpgradableWitnessProgram,
        ScriptError::WitnessProgramWrongLength,
        ScriptError::WitnessProgramWitnessEmpty,
        ScriptError::WitnessProgramMismatch,
        ScriptError::WitnessMalleated,
        ScriptError::WitnessMalleatedP2sh,
        ScriptError::WitnessUnexpected,
        ScriptError::WitnessPubkeyType,
        ScriptError::MalformedPush,
    ];

    /// Canonical upper-case name, e.g. `"EVAL_FALSE"`.
    pub fn name(&self) -> &'static str {
        match self {
            ScriptError::UnknownError => "UNKNOWN_ERROR",
            ScriptError::EvalFalse => "EVAL_FALSE",
            ScriptError::OpReturn => "OP_RETURN",
            ScriptError::ScriptSize => "SCRIPT_SIZE",
            ScriptError::PushSize => "PUSH_SIZE",
            ScriptError::OpCount => "OP_COUNT",
            ScriptError::StackSize => "STACK_SIZE",
            ScriptError::SigCount => "SIG_COUNT",
            ScriptError::PubkeyCount => "PUBKEY_COUNT",
            ScriptError::Verify => "VERIFY",
            ScriptError::EqualVerify => "EQUALVERIFY",
            ScriptError::CheckMultisigVerify => "CHECKMULTISIGVERIFY",
            ScriptError::CheckSigVerify => "CHECKSIGVERIFY",
            ScriptError::NumEqualVerify => "NUMEQUALVERIFY",
            ScriptError::BadOpcode => "BAD_OPCODE",
            ScriptError::DisabledOpcode => "DISABLED_OPCODE",
            ScriptError::InvalidStackOperation => "INVALID_STACK_OPERATION",
            ScriptError::InvalidAltstackOperation => "INVALID_ALTSTACK_OPERATION",
            ScriptError::UnbalancedConditional => "UNBALANCED_CONDITIONAL",
            ScriptError::NegativeLocktime => "NEGATIVE_LOCKTIME",
            ScriptError::UnsatisfiedLocktime => "UNSATISFIED_LOCKTIME",
            ScriptError::SigHashtype => "SIG_HASHTYPE",
            ScriptError::SigDer => "SIG_DER",
            ScriptError::MinimalData => "MINIMALDATA",
            ScriptError::SigPushonly => "SIG_PUSHONLY",
            ScriptError::SigHighS => "SIG_HIGH_S",
            ScriptError::SigNulldummy => "SIG_NULLDUMMY",
            ScriptError::PubkeyType => "PUBKEYTYPE",
            ScriptError::CleanStack => "CLEANSTACK",
            ScriptError::MinimalIf => "MINIMALIF",
            ScriptError::SigNullfail => "NULLFAIL",
            ScriptError::DiscourageUpgradableNops => "DISCOURAGE_UPGRADABLE_NOPS",
            ScriptError::DiscourageUpgradableWitnessProgram => {
                "DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM"
            }
            ScriptError::WitnessProgramWrongLength => "WITNESS_PROGRAM_WRONG_LENGTH",
            ScriptError::WitnessProgramWitnessEmpty => "WITNESS_PROGRAM_WITNESS_EMPTY",
            ScriptError::WitnessProgramMismatch => "WITNESS_PROGRAM_MISMATCH",
            ScriptError::WitnessMalleated => "WITNESS_MALLEATED",
            ScriptError::WitnessMalleatedP2sh => "WITNESS_MALLEATED_P2SH",
            ScriptError::WitnessUnexpected => "WITNESS_UNEXPECTED",
            ScriptError::WitnessPubkeyType => "WITNESS_PUBKEYTYPE",
            ScriptError::MalformedPush => "MALFORMED_PUSH",
        }
    }

    /// Parse a canonical name back into an error.
    ///
    /// `"OK"` and unknown names return `None`. `"SIG_NULLFAIL"` is accepted
    /// as an alias of `"NULLFAIL"`.
    pub fn from_name(name: &str) -> Option<ScriptError> {
        if name == "SIG_NULLFAIL" {
            return Some(ScriptError::SigNullfail);
        }
        ScriptError::ALL.iter().copied().find(|e| e.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for err in ScriptError::ALL {
            assert_eq!(ScriptError::from_name(err.name()), Some(err));
        }
    }

    #[test]
    fn test_from_name_ok_and_unknown() {
        assert_eq!(ScriptError::from_name("OK"), None);
        assert_eq!(ScriptError::from_name("NOT_A_CODE"), None);
        assert_eq!(
            ScriptError::from_name("SIG_NULLFAIL"),
            Some(ScriptError::SigNullfail)
        );
    }

    /// Each variant has a distinct name.
    #[test]
    fn test_names_unique() {
        let mut names: Vec<&str> = ScriptError::ALL.iter().map(|e| e.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ScriptError::ALL.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(ScriptError::OpCount.to_string(), "operation limit exceeded");
    }
}
