use std::process::ExitCode;

use clap::Parser;
use rasterpad::cli::{self, CliArgs};

fn main() -> ExitCode {
    cli::run(CliArgs::parse())
}
