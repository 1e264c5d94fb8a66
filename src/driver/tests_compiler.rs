use super::*;
use crate::diagnostic::DiagnosticLevel;
use clap::Parser;

const SAMPLE: &str = "unit Sample;
interface
{$IFDEF DEBUG}
const Level = 2;
{$ELSE}
const Level = 1;
{$ENDIF}
function Twice(X: Integer): Integer;
implementation
function Twice(X: Integer): Integer;
begin
  Twice := X * Level;
end;
end.";

fn setup_driver(source: &str, phase: CompilePhase) -> CompilerDriver {
    let _ = env_logger::builder().is_test(true).try_init();
    CompilerDriver::from_config(TranslateConfig::from_source_code(source, phase))
}

#[test]
fn test_pipeline_keeps_every_phase_output() {
    let mut driver = setup_driver(SAMPLE, CompilePhase::Emit);
    let outputs = driver.run_pipeline(CompilePhase::Emit).expect("pipeline should succeed");
    let artifact = outputs.units.get("<input>").expect("artifact for the buffer");

    let clean = artifact.preprocessed.as_deref().unwrap();
    assert!(clean.contains("const Level = 1;"));
    assert!(!clean.contains("Level = 2"));
    assert!(artifact.ast.is_some());
    assert!(artifact.tree.is_some());

    let csharp = artifact.csharp.as_deref().unwrap();
    assert!(csharp.contains("public const int Level = 1;"), "{}", csharp);
    assert!(csharp.contains("Result = X * Level;"), "{}", csharp);
    assert!(driver.diagnostics().is_empty());
}

#[test]
fn test_pipeline_stops_after_requested_phase() {
    let mut driver = setup_driver(SAMPLE, CompilePhase::Preprocess);
    let outputs = driver.run_pipeline(CompilePhase::Preprocess).unwrap();
    let artifact = &outputs.units[0];
    assert!(artifact.preprocessed.is_some());
    assert!(artifact.ast.is_none());
    assert!(artifact.csharp.is_none());

    let mut driver = setup_driver(SAMPLE, CompilePhase::Resolve);
    let outputs = driver.run_pipeline(CompilePhase::Resolve).unwrap();
    let artifact = &outputs.units[0];
    assert!(artifact.ast.is_some());
    assert!(artifact.tree.is_none());
}

#[test]
fn test_defines_from_config_select_branches() {
    let mut config = TranslateConfig::from_source_code(SAMPLE, CompilePhase::Preprocess);
    config.preprocessor.add_define_list("debug");
    let mut driver = CompilerDriver::from_config(config);
    let outputs = driver.run_pipeline(CompilePhase::Preprocess).unwrap();
    let clean = outputs.units[0].preprocessed.as_deref().unwrap();
    assert!(clean.contains("const Level = 2;"));
}

#[test]
fn test_syntax_error_is_fatal_with_location() {
    let mut driver = setup_driver("unit Broken;\ninterface\nvar X: ;\nimplementation\nend.", CompilePhase::Emit);
    let result = driver.run_pipeline(CompilePhase::Emit);
    assert!(matches!(result, Err(PipelineError::Fatal)));

    let errors: Vec<_> = driver
        .diagnostics()
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location.map(|l| l.line), Some(3));
}

#[test]
fn test_directive_error_is_fatal() {
    let mut driver = setup_driver("unit Odd;\n{$ELSE}\ninterface\nimplementation\nend.", CompilePhase::Emit);
    assert!(matches!(driver.run_pipeline(CompilePhase::Emit), Err(PipelineError::Fatal)));
    assert!(driver.diagnostics()[0].message.contains("without"));
}

#[test]
fn test_gaps_are_notes_only_when_requested() {
    let source = "unit Gaps;
interface
procedure Run;
implementation
procedure Run;
begin
  Missing(1);
end;
end.";
    let mut quiet = setup_driver(source, CompilePhase::Emit);
    quiet.run_pipeline(CompilePhase::Emit).unwrap();
    assert!(quiet.diagnostics().is_empty());

    let mut config = TranslateConfig::from_source_code(source, CompilePhase::Emit);
    config.report_unresolved = true;
    let mut verbose = CompilerDriver::from_config(config);
    verbose.run_pipeline(CompilePhase::Emit).unwrap();
    let notes = verbose.diagnostics();
    assert!(!notes.is_empty());
    assert!(notes.iter().all(|d| d.level == DiagnosticLevel::Note));
    assert!(notes.iter().any(|d| d.message.contains("Missing")));
}

#[test]
fn test_cli_into_config() {
    let cli = Cli::parse_from(["pas2cs", "unit1.pas", "-D", "TRACE", "--defines", "A;B", "--no-idioms", "--dump-ast"]);
    let config = cli.into_config();
    assert_eq!(config.preprocessor.defines, vec!["A", "B", "TRACE"]);
    assert_eq!(config.stop_after, CompilePhase::Resolve);
    assert!(!config.idioms);
    assert_eq!(config.parser.max_depth, 256);

    let cli = Cli::parse_from(["pas2cs", "unit1.pas", "-E", "--max-depth", "8"]);
    let config = cli.into_config();
    assert_eq!(config.stop_after, CompilePhase::Preprocess);
    assert_eq!(config.preprocessor.max_depth, 8);
    assert!(
        config
            .preprocessor
            .defines
            .iter()
            .any(|d| d == "MSWINDOWS")
    );
}

#[test]
fn test_latin1_sources_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin.pas");
    let mut bytes = b"unit Latin;\ninterface\nconst Sign = '".to_vec();
    bytes.push(0xA7);
    bytes.extend_from_slice(b"';\nimplementation\nend.");
    std::fs::write(&path, bytes).unwrap();

    let mut config = TranslateConfig::from_source_code("", CompilePhase::Emit);
    config.inputs = vec![InputSource::Path(path.clone())];
    let mut driver = CompilerDriver::from_config(config);
    let outputs = driver.run_pipeline(CompilePhase::Emit).unwrap();
    let csharp = outputs.units[0].csharp.as_deref().unwrap();
    assert!(csharp.contains(r#""\x00A7""#), "{}", csharp);
}

#[test]
fn test_run_writes_cs_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Sample.pas");
    std::fs::write(&path, SAMPLE).unwrap();

    let cli = Cli::parse_from([std::ffi::OsStr::new("pas2cs"), path.as_os_str()]);
    let mut driver = CompilerDriver::new(cli);
    driver.run().expect("run should succeed");

    let written = std::fs::read_to_string(dir.path().join("Sample.cs")).unwrap();
    assert!(written.starts_with("namespace Sample"));
}
