//! Consensus limits enforced by the interpreter.

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum combined size of the main and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum script program size in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Maximum size of a single pushed element in bytes.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Maximum byte length of a numeric operand.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
/// Byte length allowed for CHECKLOCKTIMEVERIFY / CHECKSEQUENCEVERIFY operands.
pub const LOCKTIME_NUMBER_LENGTH: usize = 5;
/// Maximum number of public keys in a CHECKMULTISIG.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Lock times below this are block heights, at or above are UNIX timestamps.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000;
/// An input sequence that disables its lock time.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
/// Set on a sequence number to disable its relative lock time (BIP68).
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;
/// Set on a sequence number when the relative lock time is in 512-second units.
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;
/// Bits of a sequence number that carry the relative lock time value.
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;
