// SPDX-License-Identifier: GPL-3.0-or-later

//! Output of the generator CLI
//!
//! The style is heavily inspired from cargo/rustc.

use std::fmt::Display;

use colored::Colorize;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Subscriber;
use tracing_subscriber::{fmt, EnvFilter};

/// Output a successful step
pub fn ok_output<T: Display>(step: &'static str, message: T) {
    info!("{:>12} {message}", step.green().bold(),);
}

pub fn init(verbose: u8, quiet: bool) {
    let level = match (verbose, quiet) {
        (0, true) => LevelFilter::WARN,
        (0, false) => LevelFilter::INFO,
        (1, _) => LevelFilter::DEBUG,
        (_, _) => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .from_env_lossy()
        .add_directive(level.into());

    let format = fmt::format().compact();

    let builder = Subscriber::builder()
        .event_format(format)
        .without_time()
        .with_env_filter(filter);
    builder.init();
}
