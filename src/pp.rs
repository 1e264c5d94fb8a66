//! Conditional-compilation preprocessor for `{$ifdef}`-style directives.

pub mod preprocessor;
#[cfg(test)]
mod tests_preprocessor;

pub use preprocessor::{Conditional, DEFAULT_DEFINES, DirectiveNode, PPConfig, PPError, Preprocessor, preprocess};
