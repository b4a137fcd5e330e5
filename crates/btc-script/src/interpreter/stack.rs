//! Script execution stack.

use super::scriptnum::{decode_num, encode_num};
use crate::ScriptError;

/// Convert byte array to boolean (Bitcoin consensus rules).
pub fn as_bool(t: &[u8]) -> bool {
    for (i, &b) in t.iter().enumerate() {
        if b != 0 {
            // Negative 0 is also considered false
            return !(i == t.len() - 1 && b == 0x80);
        }
    }
    false
}

/// Convert boolean to byte array.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

/// The main data/alt stack used by the script interpreter.
///
/// Index 0 is the top of the stack in every `peek`/`nip` style accessor.
/// Underflow is reported with the stack's `underflow` error so the alt
/// stack can fail with `InvalidAltstackOperation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    stk: Vec<Vec<u8>>,
    underflow: ScriptError,
}

impl Stack {
    /// Create an empty main stack.
    pub fn new() -> Self {
        Stack::from_items(Vec::new())
    }

    /// Create an empty alt stack.
    pub fn new_alt() -> Self {
        Stack {
            stk: Vec::new(),
            underflow: ScriptError::InvalidAltstackOperation,
        }
    }

    /// Create a main stack from items ordered bottom to top.
    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Stack {
            stk: items,
            underflow: ScriptError::InvalidStackOperation,
        }
    }

    pub fn depth(&self) -> usize {
        self.stk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stk.is_empty()
    }

    pub fn push_byte_array(&mut self, data: Vec<u8>) {
        self.stk.push(data);
    }

    pub fn push_int(&mut self, n: i64) {
        self.push_byte_array(encode_num(n));
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push_byte_array(from_bool(val));
    }

    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.stk.pop().ok_or(self.underflow)
    }

    /// Pop a script number of at most `max_len` bytes.
    pub fn pop_int(&mut self, require_minimal: bool, max_len: usize) -> Result<i64, ScriptError> {
        let data = self.pop_byte_array()?;
        decode_num(&data, require_minimal, max_len)
    }

    pub fn pop_bool(&mut self) -> Result<bool, ScriptError> {
        let data = self.pop_byte_array()?;
        Ok(as_bool(&data))
    }

    /// Borrow the item `idx` positions below the top.
    pub fn peek_byte_array(&self, idx: usize) -> Result<&[u8], ScriptError> {
        if idx >= self.stk.len() {
            return Err(self.underflow);
        }
        Ok(&self.stk[self.stk.len() - idx - 1])
    }

    /// Read the item `idx` positions below the top as a script number.
    pub fn peek_int(&self, idx: usize, require_minimal: bool, max_len: usize) -> Result<i64, ScriptError> {
        decode_num(self.peek_byte_array(idx)?, require_minimal, max_len)
    }

    /// Remove and return the item `idx` positions below the top.
    pub fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, ScriptError> {
        if idx >= self.stk.len() {
            return Err(self.underflow);
        }
        let pos = self.stk.len() - idx - 1;
        Ok(self.stk.remove(pos))
    }

    /// Copy the top item below the second item: `x1 x2 -> x2 x1 x2`.
    pub fn tuck(&mut self) -> Result<(), ScriptError> {
        let so2 = self.pop_byte_array()?;
        let so1 = self.pop_byte_array()?;
        self.push_byte_array(so2.clone());
        self.push_byte_array(so1);
        self.push_byte_array(so2);
        Ok(())
    }

    /// Remove the top `n` items.
    pub fn drop_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n > self.stk.len() {
            return Err(self.underflow);
        }
        self.stk.truncate(self.stk.len() - n);
        Ok(())
    }

    /// Duplicate the top `n` items.
    pub fn dup_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n > self.stk.len() {
            return Err(self.underflow);
        }
        let start = self.stk.len() - n;
        self.stk.extend_from_within(start..);
        Ok(())
    }

    /// Move the `n` items starting `2n` below the top to the top.
    pub fn rot_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let entry = 3 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so);
        }
        Ok(())
    }

    /// Swap the top `n` items with the `n` items below them.
    pub fn swap_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so);
        }
        Ok(())
    }

    /// Copy the `n` items below the top `n` items to the top.
    pub fn over_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.peek_byte_array(entry)?.to_vec();
            self.push_byte_array(so);
        }
        Ok(())
    }

    /// Copy the item `n` positions below the top to the top.
    pub fn pick_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let so = self.peek_byte_array(n)?.to_vec();
        self.push_byte_array(so);
        Ok(())
    }

    /// Move the item `n` positions below the top to the top.
    pub fn roll_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let so = self.nip_n(n)?;
        self.push_byte_array(so);
        Ok(())
    }

    /// Stack contents, bottom to top.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.stk
    }

    /// Consume the stack, returning its items bottom to top.
    pub fn into_items(self) -> Vec<Vec<u8>> {
        self.stk
    }

    pub fn clear(&mut self) {
        self.stk.clear();
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
