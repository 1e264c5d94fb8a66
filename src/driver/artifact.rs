use indexmap::IndexMap;

use crate::ast::Ast;
use crate::target::CsTree;

/// translation outputs for all inputs, keyed by input name in input order
pub struct PipelineOutputs {
    pub units: IndexMap<String, TranslationArtifact>,
}

/// Last phase to run. Phases are ordered; stopping after one keeps the outputs of it
/// and every phase before it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CompilePhase {
    Preprocess,
    Parse,
    Resolve,
    Lower,
    #[default]
    Emit,
}

/// outputs for a single input
#[derive(Default)]
pub struct TranslationArtifact {
    /// Text with directives and inactive branches removed.
    pub preprocessed: Option<String>,
    /// Source tree; resolved when the pipeline got past `Resolve`.
    pub ast: Option<Ast>,
    pub tree: Option<CsTree>,
    pub csharp: Option<String>,
}
