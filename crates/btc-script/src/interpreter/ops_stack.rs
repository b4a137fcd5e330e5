//! Stack manipulation operations for the script interpreter.

use crate::ScriptError;

use super::config::MAX_SCRIPT_NUMBER_LENGTH;
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), ScriptError> {
        let data = self.dstack.pop_byte_array()?;
        self.astack.push_byte_array(data);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), ScriptError> {
        let data = self.astack.pop_byte_array()?;
        self.dstack.push_byte_array(data);
        Ok(())
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), ScriptError> {
        let so = self.dstack.peek_byte_array(0)?;
        if as_bool(so) {
            let so = so.to_vec();
            self.dstack.push_byte_array(so);
        }
        Ok(())
    }

    /// Pop the PICK/ROLL depth operand and check it addresses an item
    /// still on the stack.
    fn pop_depth_operand(&mut self) -> Result<usize, ScriptError> {
        self.require_depth(2)?;
        let n = self
            .dstack
            .pop_int(self.require_minimal(), MAX_SCRIPT_NUMBER_LENGTH)?;
        if n < 0 || n as usize >= self.dstack.depth() {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(n as usize)
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), ScriptError> {
        let n = self.pop_depth_operand()?;
        self.dstack.pick_n(n)
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), ScriptError> {
        let n = self.pop_depth_operand()?;
        self.dstack.roll_n(n)
    }

    /// Push the byte length of the top item without removing it.
    pub(crate) fn op_size(&mut self) -> Result<(), ScriptError> {
        let len = self.dstack.peek_byte_array(0)?.len();
        self.dstack.push_int(len as i64);
        Ok(())
    }
}
