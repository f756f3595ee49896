use std::process::ExitCode;

use clap::Parser;
use visionary::cli::{self, CliArgs};

fn main() -> ExitCode {
    cli::run(CliArgs::parse())
}
