//! Flow control and lock time operations for the script interpreter.

use log::debug;

use crate::ScriptError;

use super::config::{
    LOCKTIME_NUMBER_LENGTH, LOCKTIME_THRESHOLD, MAX_STACK_SIZE, SEQUENCE_FINAL,
    SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK, SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use super::flags::VerifyFlags;
use super::stack::as_bool;
use super::thread::Thread;
use super::SigVersion;

impl<'a> Thread<'a> {
    /// Pop the IF/NOTIF condition, enforcing MINIMALIF inside witness scripts.
    pub(crate) fn pop_if_bool(&mut self) -> Result<bool, ScriptError> {
        let b = self
            .dstack
            .pop_byte_array()
            .map_err(|_| ScriptError::UnbalancedConditional)?;
        if self.sig_version == SigVersion::WitnessV0
            && self.has_flag(VerifyFlags::MINIMALIF)
            && (b.len() > 1 || (b.len() == 1 && b[0] != 1))
        {
            debug!("conditional operand {:02x?} is not minimal", b);
            return Err(ScriptError::MinimalIf);
        }
        Ok(as_bool(&b))
    }

    /// OP_IF and OP_NOTIF. Inside an unexecuted branch nothing is popped and
    /// the new branch is unexecuted too.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), ScriptError> {
        let mut value = false;
        if self.is_branch_executing() {
            value = self.pop_if_bool()? != negate;
        }
        if self.cond_stack.len() >= MAX_STACK_SIZE {
            return Err(ScriptError::StackSize);
        }
        self.cond_stack.push(value);
        Ok(())
    }

    pub(crate) fn op_else(&mut self) -> Result<(), ScriptError> {
        match self.cond_stack.last_mut() {
            Some(top) => {
                *top = !*top;
                Ok(())
            }
            None => Err(ScriptError::UnbalancedConditional),
        }
    }

    pub(crate) fn op_endif(&mut self) -> Result<(), ScriptError> {
        self.cond_stack
            .pop()
            .map(drop)
            .ok_or(ScriptError::UnbalancedConditional)
    }

    pub(crate) fn op_verify(&mut self) -> Result<(), ScriptError> {
        self.abstract_verify(ScriptError::Verify)
    }

    /// Pop the top item and fail with `err` unless it is true.
    pub(crate) fn abstract_verify(&mut self, err: ScriptError) -> Result<(), ScriptError> {
        let verified = self.dstack.pop_bool()?;
        if !verified {
            return Err(err);
        }
        Ok(())
    }

    /// OP_NOP1 and OP_NOP4..OP_NOP10 are reserved for soft forks.
    pub(crate) fn op_upgradable_nop(&mut self) -> Result<(), ScriptError> {
        if self.has_flag(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(ScriptError::DiscourageUpgradableNops);
        }
        Ok(())
    }

    /// Read the lock time operand on top of the stack without popping it.
    fn peek_lock_operand(&self) -> Result<i64, ScriptError> {
        let lock = self
            .dstack
            .peek_int(0, self.require_minimal(), LOCKTIME_NUMBER_LENGTH)?;
        if lock < 0 {
            debug!("negative lock time operand {}", lock);
            return Err(ScriptError::NegativeLocktime);
        }
        Ok(lock)
    }

    /// OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), ScriptError> {
        if !self.has_flag(VerifyFlags::CHECKLOCKTIMEVERIFY) {
            return self.op_upgradable_nop();
        }

        let lock_time = self.peek_lock_operand()?;
        let ctx = self.tx_context.ok_or(ScriptError::UnsatisfiedLocktime)?;

        verify_lock_time(ctx.lock_time() as i64, LOCKTIME_THRESHOLD, lock_time)?;

        if ctx.input_sequence(self.input_idx) == SEQUENCE_FINAL {
            debug!("input {} is final, lock time not enforced", self.input_idx);
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        Ok(())
    }

    /// OP_CHECKSEQUENCEVERIFY (BIP112).
    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), ScriptError> {
        if !self.has_flag(VerifyFlags::CHECKSEQUENCEVERIFY) {
            return self.op_upgradable_nop();
        }

        let sequence = self.peek_lock_operand()?;

        // Disable flag set on the operand: behaves as a NOP
        if sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 != 0 {
            return Ok(());
        }

        let ctx = self.tx_context.ok_or(ScriptError::UnsatisfiedLocktime)?;

        if ctx.tx_version() < 2 {
            debug!("transaction version {} does not support relative lock time", ctx.tx_version());
            return Err(ScriptError::UnsatisfiedLocktime);
        }

        let tx_sequence = ctx.input_sequence(self.input_idx);
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            debug!("input sequence {:#x} has relative lock time disabled", tx_sequence);
            return Err(ScriptError::UnsatisfiedLocktime);
        }

        let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
        verify_lock_time(
            tx_sequence as i64 & mask,
            SEQUENCE_LOCKTIME_TYPE_FLAG as i64,
            sequence & mask,
        )
    }
}

/// Compare a required lock time against the transaction's.
///
/// Both values must be on the same side of `threshold` (height vs time, or
/// blocks vs 512-second units) and the required value must not exceed the
/// transaction's.
pub(crate) fn verify_lock_time(tx_lock_time: i64, threshold: i64, lock_time: i64) -> Result<(), ScriptError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        debug!(
            "mismatched lock time types: tx {}, required {}",
            tx_lock_time, lock_time
        );
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    if lock_time > tx_lock_time {
        debug!("lock time {} not reached: tx {}", lock_time, tx_lock_time);
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    Ok(())
}
