//! Opcode bytes mapped to the operations the interpreter dispatches on.

use crate::opcodes::*;

/// What the interpreter does for an opcode byte.
///
/// Every byte maps to exactly one variant, so dispatch over `Operation` is
/// exhaustive without a catch-all arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `OP_0`, direct pushes and `OP_PUSHDATA1/2/4`: push the chunk data.
    PushData,
    /// `OP_1NEGATE` and `OP_1..OP_16`.
    PushNumber(i64),
    /// `OP_RESERVED`, `OP_VER`, `OP_RESERVED1`, `OP_RESERVED2`.
    Reserved,
    /// `OP_VERIF`, `OP_VERNOTIF`: invalid even in an unexecuted branch.
    VerConditional,
    /// Splice, bitwise and multiply/divide/shift opcodes.
    Disabled,
    /// Any byte above `OP_NOP10`.
    Invalid,

    Nop,
    /// `OP_NOP1`, `OP_NOP4..OP_NOP10`.
    UpgradableNop,
    If,
    NotIf,
    Else,
    EndIf,
    Verify,
    Return,

    ToAltStack,
    FromAltStack,
    TwoDrop,
    TwoDup,
    ThreeDup,
    TwoOver,
    TwoRot,
    TwoSwap,
    IfDup,
    Depth,
    Drop,
    Dup,
    Nip,
    Over,
    Pick,
    Roll,
    Rot,
    Swap,
    Tuck,
    Size,

    Equal,
    EqualVerify,

    OneAdd,
    OneSub,
    Negate,
    Abs,
    Not,
    ZeroNotEqual,
    Add,
    Sub,
    BoolAnd,
    BoolOr,
    NumEqual,
    NumEqualVerify,
    NumNotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Min,
    Max,
    Within,

    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
    CodeSeparator,
    CheckSig,
    CheckSigVerify,
    CheckMultisig,
    CheckMultisigVerify,
    CheckLockTimeVerify,
    CheckSequenceVerify,
}

impl Operation {
    /// Map an opcode byte to its operation.
    pub fn from_byte(opcode: u8) -> Operation {
        match opcode {
            OP_0..=OP_PUSHDATA4 => Operation::PushData,
            OP_1NEGATE => Operation::PushNumber(-1),
            OP_1..=OP_16 => Operation::PushNumber((opcode - OP_1 + 1) as i64),
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => Operation::Reserved,
            OP_VERIF | OP_VERNOTIF => Operation::VerConditional,
            OP_CAT | OP_SUBSTR | OP_LEFT | OP_RIGHT | OP_INVERT | OP_AND | OP_OR | OP_XOR
            | OP_2MUL | OP_2DIV | OP_MUL | OP_DIV | OP_MOD | OP_LSHIFT | OP_RSHIFT => {
                Operation::Disabled
            }

            OP_NOP => Operation::Nop,
            OP_NOP1 | OP_NOP4..=OP_NOP10 => Operation::UpgradableNop,
            OP_IF => Operation::If,
            OP_NOTIF => Operation::NotIf,
            OP_ELSE => Operation::Else,
            OP_ENDIF => Operation::EndIf,
            OP_VERIFY => Operation::Verify,
            OP_RETURN => Operation::Return,

            OP_TOALTSTACK => Operation::ToAltStack,
            OP_FROMALTSTACK => Operation::FromAltStack,
            OP_2DROP => Operation::TwoDrop,
            OP_2DUP => Operation::TwoDup,
            OP_3DUP => Operation::ThreeDup,
            OP_2OVER => Operation::TwoOver,
            OP_2ROT => Operation::TwoRot,
            OP_2SWAP => Operation::TwoSwap,
            OP_IFDUP => Operation::IfDup,
            OP_DEPTH => Operation::Depth,
            OP_DROP => Operation::Drop,
            OP_DUP => Operation::Dup,
            OP_NIP => Operation::Nip,
            OP_OVER => Operation::Over,
            OP_PICK => Operation::Pick,
            OP_ROLL => Operation::Roll,
            OP_ROT => Operation::Rot,
            OP_SWAP => Operation::Swap,
            OP_TUCK => Operation::Tuck,
            OP_SIZE => Operation::Size,

            OP_EQUAL => Operation::Equal,
            OP_EQUALVERIFY => Operation::EqualVerify,

            OP_1ADD => Operation::OneAdd,
            OP_1SUB => Operation::OneSub,
            OP_NEGATE => Operation::Negate,
            OP_ABS => Operation::Abs,
            OP_NOT => Operation::Not,
            OP_0NOTEQUAL => Operation::ZeroNotEqual,
            OP_ADD => Operation::Add,
            OP_SUB => Operation::Sub,
            OP_BOOLAND => Operation::BoolAnd,
            OP_BOOLOR => Operation::BoolOr,
            OP_NUMEQUAL => Operation::NumEqual,
            OP_NUMEQUALVERIFY => Operation::NumEqualVerify,
            OP_NUMNOTEQUAL => Operation::NumNotEqual,
            OP_LESSTHAN => Operation::LessThan,
            OP_GREATERTHAN => Operation::GreaterThan,
            OP_LESSTHANOREQUAL => Operation::LessThanOrEqual,
            OP_GREATERTHANOREQUAL => Operation::GreaterThanOrEqual,
            OP_MIN => Operation::Min,
            OP_MAX => Operation::Max,
            OP_WITHIN => Operation::Within,

            OP_RIPEMD160 => Operation::Ripemd160,
            OP_SHA1 => Operation::Sha1,
            OP_SHA256 => Operation::Sha256,
            OP_HASH160 => Operation::Hash160,
            OP_HASH256 => Operation::Hash256,
            OP_CODESEPARATOR => Operation::CodeSeparator,
            OP_CHECKSIG => Operation::CheckSig,
            OP_CHECKSIGVERIFY => Operation::CheckSigVerify,
            OP_CHECKMULTISIG => Operation::CheckMultisig,
            OP_CHECKMULTISIGVERIFY => Operation::CheckMultisigVerify,
            OP_CHECKLOCKTIMEVERIFY => Operation::CheckLockTimeVerify,
            OP_CHECKSEQUENCEVERIFY => Operation::CheckSequenceVerify,

            0xba..=0xff => Operation::Invalid,
        }
    }

    /// Whether this operation runs even inside an unexecuted branch.
    ///
    /// These are the conditional opcodes `OP_IF` through `OP_ENDIF`, which
    /// includes `OP_VERIF`/`OP_VERNOTIF`.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Operation::If
                | Operation::NotIf
                | Operation::VerConditional
                | Operation::Else
                | Operation::EndIf
        )
    }
}
