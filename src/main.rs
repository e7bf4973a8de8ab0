use clap::Parser;
use quantagent::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
