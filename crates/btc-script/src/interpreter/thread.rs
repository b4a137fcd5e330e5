//! Script execution thread - the core interpreter loop.

use log::trace;

use crate::chunk::ScriptChunk;
use crate::opcodes::opcode_to_string;
use crate::{Script, ScriptError};

use super::config::{MAX_OPS_PER_SCRIPT, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE, MAX_STACK_SIZE};
use super::flags::VerifyFlags;
use super::operation::Operation;
use super::ops_crypto::HashType;
use super::stack::Stack;
use super::{SigVersion, TxContext};

/// The execution state of a single script.
///
/// Holds everything that lives only for one `execute_script` call; the
/// caller gets the main stack back through `into_stack`.
pub(crate) struct Thread<'a> {
    /// The main data stack.
    pub dstack: Stack,
    /// The alternate stack used by OP_TOALTSTACK and OP_FROMALTSTACK.
    pub astack: Stack,
    /// One entry per open IF; `false` marks a branch that is not executing.
    pub cond_stack: Vec<bool>,
    /// Running count of non-push opcodes, including CHECKMULTISIG keys.
    pub num_ops: usize,
    /// Program offset just past the last executed OP_CODESEPARATOR.
    pub begin_code_hash: usize,
    /// The script being executed.
    pub script: &'a Script,
    pub flags: VerifyFlags,
    pub sig_version: SigVersion,
    /// Transaction context for signature and lock time checks.
    pub tx_context: Option<&'a dyn TxContext>,
    /// The transaction input index being verified.
    pub input_idx: usize,
}

impl<'a> Thread<'a> {
    pub fn new(
        script: &'a Script,
        stack: Stack,
        flags: VerifyFlags,
        sig_version: SigVersion,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Self {
        Thread {
            dstack: stack,
            astack: Stack::new_alt(),
            cond_stack: Vec::new(),
            num_ops: 0,
            begin_code_hash: 0,
            script,
            flags,
            sig_version,
            tx_context,
            input_idx,
        }
    }

    /// Check if a specific script verification flag is set.
    pub fn has_flag(&self, flag: VerifyFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Check if any of the given script verification flags are set.
    pub fn has_any(&self, flags: &[VerifyFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// Whether numeric operands must be minimally encoded.
    pub fn require_minimal(&self) -> bool {
        self.has_flag(VerifyFlags::MINIMALDATA)
    }

    /// Return true if every enclosing conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&executing| executing)
    }

    /// Fail with `InvalidStackOperation` unless the main stack holds at
    /// least `n` items.
    pub fn require_depth(&self, n: usize) -> Result<(), ScriptError> {
        if self.dstack.depth() < n {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(())
    }

    /// Execute every chunk of the script.
    pub fn execute(&mut self) -> Result<(), ScriptError> {
        if self.script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }

        let script = self.script;
        for chunk in script.chunks() {
            self.step(chunk)?;
        }

        if !self.cond_stack.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        Ok(())
    }

    /// Consume the thread, returning the main stack.
    pub fn into_stack(self) -> Stack {
        self.dstack
    }

    /// Execute one chunk.
    fn step(&mut self, chunk: &ScriptChunk) -> Result<(), ScriptError> {
        let executing = self.is_branch_executing();

        // Element size check
        if chunk
            .data
            .as_ref()
            .is_some_and(|data| data.len() > MAX_SCRIPT_ELEMENT_SIZE)
        {
            return Err(ScriptError::PushSize);
        }

        // Count non-push operations
        if chunk.opcode > crate::opcodes::OP_16 {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(ScriptError::OpCount);
            }
        }

        let operation = Operation::from_byte(chunk.opcode);

        // Disabled opcodes fail even in an unexecuted branch
        if operation == Operation::Disabled {
            return Err(ScriptError::DisabledOpcode);
        }

        if executing || operation.is_conditional() {
            trace!(
                "input {} offset {}: {}",
                self.input_idx,
                chunk.start_location_in_program,
                opcode_to_string(chunk.opcode)
            );
            if executing
                && operation == Operation::PushData
                && self.require_minimal()
                && !chunk.is_shortest_possible_push_data()
            {
                return Err(ScriptError::MinimalData);
            }
            self.dispatch(operation, chunk)?;
        }

        if self.dstack.depth() + self.astack.depth() > MAX_STACK_SIZE {
            return Err(ScriptError::StackSize);
        }
        Ok(())
    }

    fn dispatch(&mut self, operation: Operation, chunk: &ScriptChunk) -> Result<(), ScriptError> {
        match operation {
            Operation::PushData => {
                self.dstack
                    .push_byte_array(chunk.data.clone().unwrap_or_default());
                Ok(())
            }
            Operation::PushNumber(n) => {
                self.dstack.push_int(n);
                Ok(())
            }
            Operation::Reserved | Operation::VerConditional | Operation::Invalid => {
                Err(ScriptError::BadOpcode)
            }
            Operation::Disabled => Err(ScriptError::DisabledOpcode),

            // Flow control
            Operation::Nop => Ok(()),
            Operation::UpgradableNop => self.op_upgradable_nop(),
            Operation::If => self.op_if(false),
            Operation::NotIf => self.op_if(true),
            Operation::Else => self.op_else(),
            Operation::EndIf => self.op_endif(),
            Operation::Verify => self.op_verify(),
            Operation::Return => Err(ScriptError::OpReturn),

            // Stack ops
            Operation::ToAltStack => self.op_to_alt_stack(),
            Operation::FromAltStack => self.op_from_alt_stack(),
            Operation::TwoDrop => self.dstack.drop_n(2),
            Operation::TwoDup => self.dstack.dup_n(2),
            Operation::ThreeDup => self.dstack.dup_n(3),
            Operation::TwoOver => self.dstack.over_n(2),
            Operation::TwoRot => self.dstack.rot_n(2),
            Operation::TwoSwap => self.dstack.swap_n(2),
            Operation::IfDup => self.op_ifdup(),
            Operation::Depth => {
                let depth = self.dstack.depth() as i64;
                self.dstack.push_int(depth);
                Ok(())
            }
            Operation::Drop => self.dstack.drop_n(1),
            Operation::Dup => self.dstack.dup_n(1),
            Operation::Nip => self.dstack.nip_n(1).map(drop),
            Operation::Over => self.dstack.over_n(1),
            Operation::Pick => self.op_pick(),
            Operation::Roll => self.op_roll(),
            Operation::Rot => self.dstack.rot_n(1),
            Operation::Swap => self.dstack.swap_n(1),
            Operation::Tuck => self.dstack.tuck(),
            Operation::Size => self.op_size(),

            // Equality
            Operation::Equal => self.op_equal(),
            Operation::EqualVerify => self.op_equalverify(),

            // Arithmetic
            Operation::OneAdd => self.op_unary_int(|n| n + 1),
            Operation::OneSub => self.op_unary_int(|n| n - 1),
            Operation::Negate => self.op_unary_int(|n| -n),
            Operation::Abs => self.op_unary_int(i64::abs),
            Operation::Not => self.op_unary_int(|n| (n == 0) as i64),
            Operation::ZeroNotEqual => self.op_unary_int(|n| (n != 0) as i64),
            Operation::Add => self.op_binary_int(|a, b| a + b),
            Operation::Sub => self.op_binary_int(|a, b| a - b),
            Operation::BoolAnd => self.op_binary_int(|a, b| (a != 0 && b != 0) as i64),
            Operation::BoolOr => self.op_binary_int(|a, b| (a != 0 || b != 0) as i64),
            Operation::NumEqual => self.op_binary_int(|a, b| (a == b) as i64),
            Operation::NumEqualVerify => self.op_numequalverify(),
            Operation::NumNotEqual => self.op_binary_int(|a, b| (a != b) as i64),
            Operation::LessThan => self.op_binary_int(|a, b| (a < b) as i64),
            Operation::GreaterThan => self.op_binary_int(|a, b| (a > b) as i64),
            Operation::LessThanOrEqual => self.op_binary_int(|a, b| (a <= b) as i64),
            Operation::GreaterThanOrEqual => self.op_binary_int(|a, b| (a >= b) as i64),
            Operation::Min => self.op_binary_int(i64::min),
            Operation::Max => self.op_binary_int(i64::max),
            Operation::Within => self.op_within(),

            // Crypto
            Operation::Ripemd160 => self.op_hash(HashType::Ripemd160),
            Operation::Sha1 => self.op_hash(HashType::Sha1),
            Operation::Sha256 => self.op_hash(HashType::Sha256),
            Operation::Hash160 => self.op_hash(HashType::Hash160),
            Operation::Hash256 => self.op_hash(HashType::Hash256),
            Operation::CodeSeparator => {
                self.begin_code_hash = chunk.start_location_in_program + 1;
                Ok(())
            }
            Operation::CheckSig => self.op_checksig(false),
            Operation::CheckSigVerify => self.op_checksig(true),
            Operation::CheckMultisig => self.op_checkmultisig(false),
            Operation::CheckMultisigVerify => self.op_checkmultisig(true),

            // Lock time
            Operation::CheckLockTimeVerify => self.op_check_locktime_verify(),
            Operation::CheckSequenceVerify => self.op_check_sequence_verify(),
        }
    }
}
