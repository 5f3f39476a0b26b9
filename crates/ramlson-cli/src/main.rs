//! # ramlson CLI Entry Point
//!
//! Parses arguments and dispatches to the subcommand modules.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use ramlson_cli::{render, validate};

/// Render and validate documents with the ramlson serializers.
#[derive(Parser, Debug)]
#[command(name = "ramlson", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Render a JSON document as JSON or XML.
    Render(render::RenderArgs),
    /// Validate a document against a JSON Schema or XSD.
    Validate(validate::ValidateArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => {
            let output = render::run(&args)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output)?;
            writeln!(stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate(args) => {
            let report = validate::run(&args)?;
            if report.is_valid() {
                println!("{}: valid against '{}'", args.input.display(), report.schema);
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "{}: {} violation(s) against '{}'",
                    args.input.display(),
                    report.violations.len(),
                    report.schema
                );
                println!("{}", report.violations);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
