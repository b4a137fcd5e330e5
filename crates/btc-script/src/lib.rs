/// Bitcoin Script - parsing, building, template matching and interpretation.
///
/// Provides the Bitcoin Script type, opcode definitions, script chunk parsing,
/// a script builder with standard output/input factories, standard template
/// recognition, and a script interpreter with full spend verification
/// (P2SH and version 0 witness programs).

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod builder;
pub mod pattern;
pub mod interpreter;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use chunk::ScriptChunk;
pub use builder::ScriptBuilder;
pub use pattern::ScriptType;
pub use interpreter::{execute_script, verify_script, SigVersion, TxContext, VerifyFlags};
