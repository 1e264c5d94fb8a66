use clap::Parser as ClapParser;
use log::LevelFilter;
use pas2cs::driver::{Cli, CompilerDriver, DriverError};
use std::process::exit;

/// The main entry point for the application.
///
/// Parses command-line arguments and runs the translator.
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut driver = CompilerDriver::new(cli);
    if let Err(e) = driver.run() {
        // diagnostics were already printed
        if !matches!(e, DriverError::TranslationFailed) {
            eprintln!("error: {}", e);
        }
        exit(1);
    }
}

/// `RUST_LOG` governs logging unless `-v` asks for debug output.
fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}
