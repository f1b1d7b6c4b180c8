// SPDX-License-Identifier: GPL-3.0-or-later

use std::process::exit;

use clap::Parser;
use nsdc::{cli::MainArgs, logs};
use tracing::{debug, error, trace};

fn main() {
    let args = MainArgs::parse();
    logs::init(args.verbose, args.quiet);
    debug!(
        "Running {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    trace!("Arguments:\n{:#?}", args);

    match nsdc::run(args) {
        Ok(_) => (),
        Err(e) => {
            // Display errors with logger
            // Use `{:#}` formatter to get the error chain
            error!("{:#}", e);
            exit(1);
        }
    }
}
