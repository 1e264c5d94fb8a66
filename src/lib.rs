//! An Object Pascal unit to C# source translator.
//!
//! The pipeline runs in five phases: the conditional preprocessor ([`pp`]) strips
//! `{$IFDEF}` branches, the [`parser`] builds the source tree ([`ast`]), the
//! [`semantic`] resolver binds names and infers expression types, [`lowering`]
//! converts the tree into the C# tree ([`target`]), and [`codegen`] renders it.
//! The [`driver`] wires the phases together for the `pas2cs` binary.

pub mod ast;
/// Contains the C# emitter and idiom rewriter.
pub mod codegen;
pub mod cursor;
pub mod diagnostic;
pub mod driver;
/// Contains the error types for the application.
pub mod error;
pub mod lowering;
pub mod parser;
/// Contains the conditional preprocessor.
pub mod pp;
/// Contains the resolver and type inference.
pub mod semantic;
pub mod source;
pub mod target;


pub use error::Error;

use codegen::{EmitConfig, emit};
use lowering::lower_unit;
use parser::{ParserConfig, parse_unit};
use pp::{PPConfig, Preprocessor};
use semantic::resolve_unit;

/// Translates one unit's text with the given semicolon-separated define list, using
/// the default parser limits and idiom table.
pub fn translate(source: &str, defines: &str) -> Result<String, Error> {
    let pp_config = PPConfig::from_define_list(defines);
    let clean = Preprocessor::new(&pp_config).process(source)?;
    let mut ast = parse_unit(&clean, &ParserConfig::default())?;
    resolve_unit(&mut ast);
    let lowered = lower_unit(&ast);
    Ok(emit(&lowered.tree, &EmitConfig::default())?)
}
