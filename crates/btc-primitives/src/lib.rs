/// Bitcoin primitives - hashing, secp256k1 keys, and wire encoding.
///
/// This crate provides the foundational building blocks for the script engine:
/// - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, HASH160)
/// - secp256k1 private/public keys and DER-encoded ECDSA signatures
/// - Variable-length integer encoding and little-endian byte readers/writers

pub mod hash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
