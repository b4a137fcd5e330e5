//! Script verification flags (bitmask).

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
///
/// Each flag enables one soft-fork or policy rule. Flags are combined with
/// `|` and never change during a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VerifyFlags(pub u32);

impl VerifyFlags {
    pub const NONE: VerifyFlags = VerifyFlags(0);
    /// Evaluate P2SH redeem scripts (BIP16).
    pub const P2SH: VerifyFlags = VerifyFlags(1 << 0);
    /// Require strict signature and pubkey encodings and defined hash types.
    pub const STRICTENC: VerifyFlags = VerifyFlags(1 << 1);
    /// Require strict DER signatures (BIP66).
    pub const DERSIG: VerifyFlags = VerifyFlags(1 << 2);
    /// Require low-S signatures (BIP62 rule 5).
    pub const LOW_S: VerifyFlags = VerifyFlags(1 << 3);
    /// Require the CHECKMULTISIG dummy element to be empty (BIP147).
    pub const NULLDUMMY: VerifyFlags = VerifyFlags(1 << 4);
    /// Require scriptSig to contain only pushes.
    pub const SIGPUSHONLY: VerifyFlags = VerifyFlags(1 << 5);
    /// Require minimal pushes and minimally encoded numbers.
    pub const MINIMALDATA: VerifyFlags = VerifyFlags(1 << 6);
    /// Fail on the upgradable NOP opcodes.
    pub const DISCOURAGE_UPGRADABLE_NOPS: VerifyFlags = VerifyFlags(1 << 7);
    /// Require exactly one stack element after evaluation.
    pub const CLEANSTACK: VerifyFlags = VerifyFlags(1 << 8);
    /// Enable OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub const CHECKLOCKTIMEVERIFY: VerifyFlags = VerifyFlags(1 << 9);
    /// Enable OP_CHECKSEQUENCEVERIFY (BIP112).
    pub const CHECKSEQUENCEVERIFY: VerifyFlags = VerifyFlags(1 << 10);
    /// Evaluate witness programs (BIP141).
    pub const WITNESS: VerifyFlags = VerifyFlags(1 << 11);
    /// Fail on witness versions 1..16.
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: VerifyFlags = VerifyFlags(1 << 12);
    /// Require IF/NOTIF arguments in witness scripts to be empty or `0x01`.
    pub const MINIMALIF: VerifyFlags = VerifyFlags(1 << 13);
    /// Require failed signature checks to use empty signatures.
    pub const NULLFAIL: VerifyFlags = VerifyFlags(1 << 14);
    /// Require compressed public keys in witness scripts.
    pub const WITNESS_PUBKEYTYPE: VerifyFlags = VerifyFlags(1 << 15);

    /// The consensus rules every node must enforce.
    pub const MANDATORY: VerifyFlags = VerifyFlags::P2SH;

    /// Every flag, matching current mainnet relay policy.
    pub const STANDARD: VerifyFlags = VerifyFlags(0xffff);

    const NAMES: [(&'static str, VerifyFlags); 16] = [
        ("P2SH", VerifyFlags::P2SH),
        ("STRICTENC", VerifyFlags::STRICTENC),
        ("DERSIG", VerifyFlags::DERSIG),
        ("LOW_S", VerifyFlags::LOW_S),
        ("NULLDUMMY", VerifyFlags::NULLDUMMY),
        ("SIGPUSHONLY", VerifyFlags::SIGPUSHONLY),
        ("MINIMALDATA", VerifyFlags::MINIMALDATA),
        ("DISCOURAGE_UPGRADABLE_NOPS", VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS),
        ("CLEANSTACK", VerifyFlags::CLEANSTACK),
        ("CHECKLOCKTIMEVERIFY", VerifyFlags::CHECKLOCKTIMEVERIFY),
        ("CHECKSEQUENCEVERIFY", VerifyFlags::CHECKSEQUENCEVERIFY),
        ("WITNESS", VerifyFlags::WITNESS),
        (
            "DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM",
            VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
        ),
        ("MINIMALIF", VerifyFlags::MINIMALIF),
        ("NULLFAIL", VerifyFlags::NULLFAIL),
        ("WITNESS_PUBKEYTYPE", VerifyFlags::WITNESS_PUBKEYTYPE),
    ];

    /// All defined flags.
    pub fn all() -> VerifyFlags {
        VerifyFlags::STANDARD
    }

    pub fn has_flag(self, flag: VerifyFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn has_any(self, flags: &[VerifyFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    /// Look up a single flag by its canonical name, e.g. `"NULLDUMMY"`.
    pub fn from_name(name: &str) -> Option<VerifyFlags> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| *flag)
    }

    /// Parse a comma-separated list of flag names.
    ///
    /// Empty input and the name `NONE` yield no flags.
    ///
    /// # Returns
    /// The combined flags, or the first unknown name as the error.
    pub fn parse(names: &str) -> Result<VerifyFlags, String> {
        let mut flags = VerifyFlags::NONE;
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name == "NONE" {
                continue;
            }
            flags |= Self::from_name(name).ok_or_else(|| name.to_string())?;
        }
        Ok(flags)
    }
}

impl BitOr for VerifyFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        VerifyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for VerifyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for VerifyFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        VerifyFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for VerifyFlags {
    /// Comma-separated flag names in bit order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(_, flag)| self.has_flag(*flag))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "{}", names.join(","))
    }
}
