//! Binding between a transaction and the script interpreter.

use btc_script::{ScriptError, SigVersion, TxContext};
use log::debug;

use crate::input::DEFAULT_SEQUENCE_NUMBER;
use crate::sighash::{self, SigHashCache};
use crate::transaction::Transaction;

/// Exposes one transaction to the interpreter's signature and lock time
/// checks.
///
/// `amount` is the value of the output spent by the input under
/// verification; only BIP143 hashing uses it.
pub struct TransactionContext<'a> {
    tx: &'a Transaction,
    cache: SigHashCache<'a>,
    amount: u64,
}

impl<'a> TransactionContext<'a> {
    /// Create a context for verifying an input of `tx` that spends `amount`.
    pub fn new(tx: &'a Transaction, amount: u64) -> Self {
        TransactionContext {
            tx,
            cache: SigHashCache::new(tx),
            amount,
        }
    }
}

impl TxContext for TransactionContext<'_> {
    fn signature_hash(
        &self,
        script_code: &[u8],
        input_idx: usize,
        hash_type: u8,
        sig_version: SigVersion,
    ) -> Result<[u8; 32], ScriptError> {
        match sig_version {
            SigVersion::Base => Ok(sighash::signature_hash_raw(
                self.tx,
                input_idx,
                script_code,
                hash_type,
            )),
            SigVersion::WitnessV0 => self
                .cache
                .witness_signature_hash(input_idx, script_code, self.amount, hash_type)
                .map_err(|e| {
                    debug!("witness signature hash failed: {}", e);
                    ScriptError::UnknownError
                }),
        }
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx
            .inputs
            .get(input_idx)
            .map_or(DEFAULT_SEQUENCE_NUMBER, |input| input.sequence_number)
    }
}
