//! Translation pipeline orchestration module
//!
//! This module contains the driver that runs the phases in order: preprocessing,
//! parsing, name resolution, lowering and emission. Each phase reports into the
//! driver's [`DiagnosticEngine`]; the first error stops the input being translated.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};

use crate::ast::Ast;
use crate::ast::dumper::AstDumper;
use crate::codegen::{EmitConfig, IdentityRewriter, emit};
use crate::diagnostic::{Diagnostic, DiagnosticEngine, DiagnosticLevel, ErrorFormatter};
use crate::lowering::lower_unit;
use crate::parser::parse_unit;
use crate::pp::Preprocessor;
use crate::semantic::resolve_unit;
use crate::source::SourceText;
use crate::target::CsTree;

use super::artifact::{CompilePhase, PipelineOutputs, TranslationArtifact};
use super::cli::{Cli, InputSource, TranslateConfig};

/// Main translation driver
pub struct CompilerDriver {
    config: TranslateConfig,
    diagnostics: DiagnosticEngine,
    /// Text the current diagnostics point into.
    source: Option<SourceText>,
}

/// Decodes a source file. Units are often saved in a legacy 8-bit code page; bytes that
/// are not valid UTF-8 are read as Latin-1.
fn decode_source(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| char::from(b)).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

impl CompilerDriver {
    /// Create a new driver from CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self::from_config(cli.into_config())
    }

    /// Create a new driver from configuration
    pub fn from_config(config: TranslateConfig) -> Self {
        CompilerDriver {
            diagnostics: DiagnosticEngine::with_notes(config.report_unresolved),
            source: None,
            config,
        }
    }

    /// Runs every input up to and including `stop_after`.
    pub fn run_pipeline(&mut self, stop_after: CompilePhase) -> Result<PipelineOutputs, PipelineError> {
        let mut outputs = PipelineOutputs { units: IndexMap::new() };

        let inputs = std::mem::take(&mut self.config.inputs);
        for input in inputs {
            let (name, artifact) = self.run_input(input, stop_after)?;
            outputs.units.insert(name, artifact);
        }

        Ok(outputs)
    }

    fn load(&self, input: InputSource) -> Result<SourceText, PipelineError> {
        match input {
            InputSource::Path(path) => match fs::read(&path) {
                Ok(bytes) => Ok(SourceText::new(path.display().to_string(), decode_source(bytes))),
                Err(e) => Err(PipelineError::IoError(path, e)),
            },
            InputSource::Buffer { name, text } => Ok(SourceText::new(name, text)),
        }
    }

    fn run_input(
        &mut self,
        input: InputSource,
        stop_after: CompilePhase,
    ) -> Result<(String, TranslationArtifact), PipelineError> {
        let source = self.load(input)?;
        let name = source.path().to_string();
        debug!("translating {}", name);
        self.source = Some(source.clone());
        let mut out = TranslationArtifact::default();

        // Preprocessing phase
        let clean = self.run_preprocessor(source.text())?;
        // later positions refer to the clean text
        self.source = Some(SourceText::new(name.clone(), clean.clone()));
        out.preprocessed = Some(clean);
        if stop_after == CompilePhase::Preprocess {
            return Ok((name, out));
        }

        // Parsing phase
        let clean = out.preprocessed.as_deref().unwrap_or_default();
        let mut ast = self.run_parser(clean)?;
        if stop_after == CompilePhase::Parse {
            out.ast = Some(ast);
            return Ok((name, out));
        }

        // Name resolution
        self.run_resolver(&mut ast);
        if stop_after == CompilePhase::Resolve {
            out.ast = Some(ast);
            return Ok((name, out));
        }

        // Lowering to the C# tree
        let tree = self.run_lowering(&ast);
        out.ast = Some(ast);
        if stop_after == CompilePhase::Lower {
            out.tree = Some(tree);
            return Ok((name, out));
        }

        // Emission
        out.csharp = Some(self.run_emitter(&tree)?);
        out.tree = Some(tree);
        Ok((name, out))
    }

    fn run_preprocessor(&mut self, text: &str) -> Result<String, PipelineError> {
        debug!("phase: preprocess");
        let mut preprocessor = Preprocessor::new(&self.config.preprocessor);
        match preprocessor.process(text) {
            Ok(clean) => Ok(clean),
            Err(e) => {
                self.diagnostics.report_diagnostic(e.into());
                Err(PipelineError::Fatal)
            }
        }
    }

    fn run_parser(&mut self, text: &str) -> Result<Ast, PipelineError> {
        debug!("phase: parse");
        match parse_unit(text, &self.config.parser) {
            Ok(ast) => Ok(ast),
            Err(e) => {
                self.diagnostics.report_diagnostic(e.into());
                Err(PipelineError::Fatal)
            }
        }
    }

    fn run_resolver(&mut self, ast: &mut Ast) {
        debug!("phase: resolve");
        let gaps = resolve_unit(ast);
        debug!("{} unresolved references", gaps.len());
        for gap in gaps {
            self.diagnostics.report_note(gap.to_string(), Some(gap.location));
        }
    }

    fn run_lowering(&mut self, ast: &Ast) -> CsTree {
        debug!("phase: lower");
        let lowered = lower_unit(ast);
        for gap in lowered.gaps {
            self.diagnostics.report_note(gap.to_string(), Some(gap.location));
        }
        lowered.tree
    }

    fn run_emitter(&mut self, tree: &CsTree) -> Result<String, PipelineError> {
        debug!("phase: emit");
        let config = if self.config.idioms {
            EmitConfig::default()
        } else {
            EmitConfig::default().with_rewriter(IdentityRewriter)
        };
        match emit(tree, &config) {
            Ok(text) => Ok(text),
            Err(e) => {
                self.diagnostics.report_diagnostic(Diagnostic {
                    level: DiagnosticLevel::Error,
                    message: e.to_string(),
                    ..Default::default()
                });
                Err(PipelineError::Fatal)
            }
        }
    }

    /// Translate every input and write the outputs. Diagnostics are printed after each
    /// input; the first input that fails stops the run.
    pub fn run(&mut self) -> Result<(), DriverError> {
        let stop_after = self.config.stop_after;
        let inputs = std::mem::take(&mut self.config.inputs);
        if inputs.len() > 1 && self.config.output_path.is_some() {
            return Err(DriverError::OutputForManyInputs);
        }

        for input in inputs {
            let input_path = match &input {
                InputSource::Path(path) => Some(path.clone()),
                InputSource::Buffer { .. } => None,
            };
            match self.run_input(input, stop_after) {
                Ok((_, artifact)) => {
                    self.print_diagnostics();
                    self.diagnostics.clear();
                    self.write_artifact(input_path.as_deref(), artifact)?;
                }
                Err(PipelineError::IoError(path, e)) => {
                    return Err(DriverError::IoError(format!("failed to read {}: {}", path.display(), e)));
                }
                Err(PipelineError::Fatal) => {
                    self.print_diagnostics();
                    return Err(DriverError::TranslationFailed);
                }
            }
        }

        Ok(())
    }

    fn write_artifact(&self, input_path: Option<&Path>, artifact: TranslationArtifact) -> Result<(), DriverError> {
        if let Some(csharp) = artifact.csharp {
            match self.output_path(input_path) {
                Some(path) => {
                    fs::write(&path, csharp)
                        .map_err(|e| DriverError::IoError(format!("failed to write {}: {}", path.display(), e)))?;
                    info!("wrote {}", path.display());
                }
                None => print!("{}", csharp),
            }
        } else if let Some(ast) = artifact.ast {
            print!("{}", AstDumper::new(&ast).with_bindings().dump());
        } else if let Some(preprocessed) = artifact.preprocessed {
            print!("{}", preprocessed);
        }
        Ok(())
    }

    /// `-o FILE`, else the input path with a `.cs` extension; `None` means stdout.
    fn output_path(&self, input_path: Option<&Path>) -> Option<PathBuf> {
        match &self.config.output_path {
            Some(path) if path.as_os_str() == "-" => None,
            Some(path) => Some(path.clone()),
            None => input_path.map(|p| p.with_extension("cs")),
        }
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    /// Print accumulated diagnostics without returning an error
    pub fn print_diagnostics(&self) {
        let formatter = ErrorFormatter::default();
        formatter.print_diagnostics(self.diagnostics.diagnostics(), self.source.as_ref());
    }
}

/// Error types for the translation driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("translation failed due to errors")]
    TranslationFailed,

    #[error("--output needs a single input file")]
    OutputForManyInputs,
}

/// Error that will stop the translation pipeline
#[derive(Debug)]
pub enum PipelineError {
    Fatal,
    IoError(PathBuf, std::io::Error),
}
