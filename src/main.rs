// src/main.rs

use pipebuild::cli::{self, Command};
use pipebuild::{logging, run};
use tracing::Level;

fn main() {
    match run_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pipebuild error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let default_level = match args.command {
        Command::Wrap { .. } => Level::WARN,
        _ => Level::INFO,
    };
    logging::init_logging(args.log_level, default_level)?;
    run(args)
}
