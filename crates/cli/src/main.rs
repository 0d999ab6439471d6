//! monorail CLI Application

// The binary reports startup failures before tracing exists.
#![allow(clippy::print_stderr)]

use monorail::cli::{self, EXIT_OK, exit_code_for, render_error};
use monorail::tracing::init_tracing;

fn main() {
    let cli = cli::parse();

    if let Err(e) = init_tracing(cli.log_level) {
        eprintln!("{e:?}");
    }

    let exit_code = match monorail::run(&cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    };

    std::process::exit(exit_code);
}
