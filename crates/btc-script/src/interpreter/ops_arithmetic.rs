//! Arithmetic operations for the script interpreter.
//!
//! Operands are at most 4 bytes, so every intermediate result fits an
//! `i64` and is pushed back without range checks.

use crate::ScriptError;

use super::config::MAX_SCRIPT_NUMBER_LENGTH;
use super::thread::Thread;

impl<'a> Thread<'a> {
    /// Read the item `idx` positions below the top as a numeric operand.
    fn peek_num(&self, idx: usize) -> Result<i64, ScriptError> {
        self.dstack
            .peek_int(idx, self.require_minimal(), MAX_SCRIPT_NUMBER_LENGTH)
    }

    pub(crate) fn op_unary_int(&mut self, f: impl FnOnce(i64) -> i64) -> Result<(), ScriptError> {
        self.require_depth(1)?;
        let m = self.peek_num(0)?;
        self.dstack.drop_n(1)?;
        self.dstack.push_int(f(m));
        Ok(())
    }

    /// Apply `f(a, b)` where `b` is the top item and `a` the one below it.
    pub(crate) fn op_binary_int(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<(), ScriptError> {
        self.require_depth(2)?;
        let a = self.peek_num(1)?;
        let b = self.peek_num(0)?;
        self.dstack.drop_n(2)?;
        self.dstack.push_int(f(a, b));
        Ok(())
    }

    pub(crate) fn op_numequalverify(&mut self) -> Result<(), ScriptError> {
        self.op_binary_int(|a, b| (a == b) as i64)?;
        self.abstract_verify(ScriptError::NumEqualVerify)
    }

    /// `x min max -> (min <= x < max)`
    pub(crate) fn op_within(&mut self) -> Result<(), ScriptError> {
        self.require_depth(3)?;
        let x = self.peek_num(2)?;
        let min = self.peek_num(1)?;
        let max = self.peek_num(0)?;
        self.dstack.drop_n(3)?;
        self.dstack.push_bool(min <= x && x < max);
        Ok(())
    }
}
