//! audiodupe - Acoustic duplicate audio finder
//!
//! Entry point for the audiodupe CLI application.

use audiodupe::cli::Cli;
use audiodupe::error::ExitCode;
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    match audiodupe::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    }
}
