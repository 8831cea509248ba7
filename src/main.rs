use clap::Parser;
use desktidy::cli::{Args, run_cli};
use desktidy::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    match run_cli(args.organize_command(), &args.source, &args.options()) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
