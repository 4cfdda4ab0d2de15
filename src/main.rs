use std::process::ExitCode;

use clap::Parser;
use sketchpad::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::set_echo(args.verbose);
    logger::init();
    if args.verbose
        && let Some(path) = logger::log_path()
    {
        eprintln!("log: {}", path.display());
    }

    cli::run(args)
}
