//! The Intent Parser & Validator: the
//! closed `Intent` type and the single async entry point that turns a user
//! utterance plus a prompt bundle into exactly one of its variants.

pub mod error;
pub mod intent;
pub mod parser;

pub use error::{IntentError, Result};
pub use intent::{Intent, IdOrOrdinal, MutateOp};
pub use parser::IntentParser;
