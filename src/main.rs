//! garlic CLI entry point
//!
//! This is a minimal entrypoint that:
//! 1. Installs logging on stderr
//! 2. Parses CLI arguments and dispatches (via cli::run)
//! 3. Prints errors to stderr
//! 4. Exits with non-zero on failure

use garlic::{cli, logging};

fn main() {
    logging::init();
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
