//! CLI parsing and configuration module
//!
//! This module handles command-line argument parsing using clap and
//! provides the configuration consumed by the driver.

use clap::Parser as CliParser;
use std::path::PathBuf;

use crate::parser::ParserConfig;
use crate::pp::{DEFAULT_DEFINES, PPConfig};

use super::artifact::CompilePhase;

/// CLI interface using clap
#[derive(CliParser, Debug)]
#[clap(name = "pas2cs", about = "Object Pascal unit to C# translator")]
pub struct Cli {
    /// Input Pascal units or programs
    #[clap(value_parser, required = true)]
    pub input_files: Vec<PathBuf>,

    /// Output file for the C# text (`-` writes to stdout)
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Conditional symbol to define, in addition to the define list
    #[clap(short = 'D', long = "define", value_name = "SYMBOL", action = clap::ArgAction::Append)]
    pub defines: Vec<String>,

    /// Semicolon-separated define list
    #[clap(long = "defines", value_name = "LIST", default_value = DEFAULT_DEFINES)]
    pub define_list: String,

    /// Preprocess only, output the clean text to stdout
    #[clap(short = 'E')]
    pub preprocess_only: bool,

    /// Dump the resolved source tree to stdout
    #[clap(long)]
    pub dump_ast: bool,

    /// Emit without rewriting runtime-library idioms
    #[clap(long)]
    pub no_idioms: bool,

    /// Report unresolved names and untranslated constructs as notes
    #[clap(long)]
    pub report_unresolved: bool,

    /// Maximum nesting of statements, expressions, types and conditionals
    #[clap(long, default_value = "256")]
    pub max_depth: usize,

    /// Enable debug logging
    #[clap(short, long)]
    pub verbose: bool,
}

/// Where a unit's text comes from
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    /// In-memory text with a display name.
    Buffer { name: String, text: String },
}

/// Configuration for a translation run
#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub inputs: Vec<InputSource>,
    pub output_path: Option<PathBuf>,
    pub stop_after: CompilePhase,
    pub preprocessor: PPConfig,
    pub parser: ParserConfig,
    /// Rewrite runtime-library idioms during emission.
    pub idioms: bool,
    pub report_unresolved: bool,
    pub verbose: bool,
}

impl TranslateConfig {
    /// Configuration translating `source` from memory with the default define set.
    pub fn from_source_code(source: impl Into<String>, stop_after: CompilePhase) -> Self {
        TranslateConfig {
            inputs: vec![InputSource::Buffer {
                name: "<input>".to_string(),
                text: source.into(),
            }],
            output_path: None,
            stop_after,
            preprocessor: PPConfig::from_define_list(DEFAULT_DEFINES),
            parser: ParserConfig::default(),
            idioms: true,
            report_unresolved: false,
            verbose: false,
        }
    }
}

impl Cli {
    /// Convert CLI arguments into a translation configuration
    pub fn into_config(self) -> TranslateConfig {
        let mut preprocessor = PPConfig::from_define_list(&self.define_list);
        preprocessor.defines.extend(self.defines);
        preprocessor.max_depth = self.max_depth;

        let stop_after = if self.preprocess_only {
            CompilePhase::Preprocess
        } else if self.dump_ast {
            CompilePhase::Resolve
        } else {
            CompilePhase::Emit
        };

        TranslateConfig {
            inputs: self.input_files.into_iter().map(InputSource::Path).collect(),
            output_path: self.output,
            stop_after,
            preprocessor,
            parser: ParserConfig {
                max_depth: self.max_depth,
            },
            idioms: !self.no_idioms,
            report_unresolved: self.report_unresolved,
            verbose: self.verbose,
        }
    }
}
