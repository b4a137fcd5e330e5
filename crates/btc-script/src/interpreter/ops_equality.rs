//! Byte equality operations for the script interpreter.

use crate::ScriptError;

use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_equal(&mut self) -> Result<(), ScriptError> {
        self.require_depth(2)?;
        let a = self.dstack.pop_byte_array()?;
        let b = self.dstack.pop_byte_array()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }

    pub(crate) fn op_equalverify(&mut self) -> Result<(), ScriptError> {
        self.op_equal()?;
        self.abstract_verify(ScriptError::EqualVerify)
    }
}
