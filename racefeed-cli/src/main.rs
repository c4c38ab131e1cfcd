//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use racefeed_cli::CliError;

fn main() {
    racefeed_cli::init_logging();
    if let Err(err) = racefeed_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = &err {
            clap_err.exit();
        }
        eprintln!("racefeed: {err}");
        std::process::exit(1);
    }
}
