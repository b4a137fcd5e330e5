#![deny(missing_docs)]

//! Bitcoin Script engine SDK.
//!
//! Re-exports all components for convenient single-crate usage.

pub use btc_primitives as primitives;
pub use btc_script as script;
pub use btc_transaction as transaction;
