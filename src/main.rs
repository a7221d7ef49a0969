use clap::Parser;
use dcatrader::cli::{init_tracing, run, Cli};

fn main() -> std::process::ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("warning: {err}");
    }
    run(Cli::parse())
}
