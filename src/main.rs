use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

mod args;
mod checks;

fn main() {
    let args = args::Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match checks::run_checks(&args) {
        Ok(true) => {
            info!("All the checks passed");
        }
        Ok(false) => {
            eprintln!("Some checks failed");
            std::process::exit(1);
        }
        Err(e) => {
            warn!("Error occured {:?}", e);
            eprintln!("An error occured: {}", e);
            for cause in ErrorCompat::iter_chain(&e).skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
