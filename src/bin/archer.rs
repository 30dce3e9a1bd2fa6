//! Command-line driver: instrument a textual PIR file.

use std::path::PathBuf;
use std::process::ExitCode;

use bumpalo::Bump;
use clap::Parser;

use archer::core::InstrSession;
use archer::ir::Module;
use archer::pass::{InstrumentationPass, UnitOutcome};

#[derive(Parser)]
#[command(name = "archer", about = "Insert race-detection hooks into a PIR module")]
struct Args {
    /// Input .pir file.
    input: PathBuf,

    /// Write the instrumented module here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print per-unit statistics to stderr.
    #[arg(long)]
    stats: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let mut module = match Module::parse(&text) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("error: {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    let mut pass = InstrumentationPass::new();
    let outcome = match pass.run_unit(&session, &mut module) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    for diagnostic in session.diagnostics() {
        eprintln!("{diagnostic}");
    }
    if let UnitOutcome::Refused = outcome {
        eprintln!("error: refusing to instrument twice");
        return ExitCode::FAILURE;
    }

    let printed = module.print();
    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &printed) {
                eprintln!("error: cannot write {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
        None => print!("{printed}"),
    }

    if args.stats {
        eprintln!("{}", session.stats());
    }
    ExitCode::SUCCESS
}
