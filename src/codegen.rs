//! C# code generation.
//!
//! - emitter: target tree → C# text
//! - idiom: textual rewriting of runtime-library calls in emitted expressions

pub mod emitter;
pub mod idiom;

#[cfg(test)]
mod tests_codegen;

pub use emitter::{CodesStyle, EmitConfig, EmitError, Emitter, emit};
pub use idiom::{IdentityRewriter, IdiomRewriter, TableRewriter, split_params};
