/// Bitcoin transactions - wire codec, signature hashing and spend verification.
///
/// Provides the Transaction type with inputs, outputs and witnesses, legacy
/// and BIP144 serialization, legacy and BIP143 signature hashes, and the
/// `TxContext` binding that lets the script interpreter check signatures
/// and lock times against a transaction.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod context;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use context::TransactionContext;
pub use sighash::{SigHashCache, SigHashType};
