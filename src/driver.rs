//! Translation driver
//!
//! - cli: command-line parsing and [`TranslateConfig`]
//! - compiler: the [`CompilerDriver`] running the phases in order
//! - artifact: per-phase outputs collected by the pipeline

pub mod artifact;
pub mod cli;
pub mod compiler;

#[cfg(test)]
mod tests_compiler;

pub use artifact::{CompilePhase, PipelineOutputs, TranslationArtifact};
pub use cli::{Cli, InputSource, TranslateConfig};
pub use compiler::{CompilerDriver, DriverError, PipelineError};
