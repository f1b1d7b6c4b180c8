// SPDX-License-Identifier: GPL-3.0-or-later

//! Code generation engine for Nassi-Shneiderman structured diagrams.
//!
//! One diagram tree, many targets: linear source code (Java, C#, Python,
//! PHP, StrukTeX) or a PAP flowchart graph. The engine walks the read-only
//! element tree, analyzes jumps and variables, and hands emission to a
//! backend selected at run time.

use std::{
    fs::{self, read_to_string},
    io::{self, Write},
};

use anyhow::{Context, Result};

use crate::{
    backends::session::ExportOptions, cli::MainArgs, ir::keywords::KeywordTable,
    logs::ok_output,
};

pub mod analysis;
pub mod backends;
pub mod cli;
pub mod compiler;
pub mod frontends;
pub mod ir;
pub mod lexer;
pub mod logs;

/// We want to only compile the regex once
///
/// Use once_cell as showed in its documentation
/// https://docs.rs/once_cell/1.2.0/once_cell/index.html#building-block
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

pub(crate) use regex;

/// Main entry point for nsdc
///
/// # Error management
///
/// The current process is to stop at first error, and move it up to `main()` where it will
/// be displayed.
pub fn run(args: MainArgs) -> Result<()> {
    let options: ExportOptions = match &args.options {
        Some(path) => {
            let content = read_to_string(path)
                .with_context(|| format!("Failed to read options {}", path.display()))?;
            serde_yaml::from_str(&content)?
        }
        None => ExportOptions::default(),
    };
    let keywords: KeywordTable = match &args.keywords {
        Some(path) => {
            let content = read_to_string(path)
                .with_context(|| format!("Failed to read keyword table {}", path.display()))?;
            serde_yaml::from_str(&content)?
        }
        None => KeywordTable::default(),
    };

    if args.check {
        return compiler::check(&args.input, keywords);
    }

    let target = args.target()?;
    let artifact = compiler::compile(&args.input, target, options, keywords)?;
    match &args.output {
        Some(output) => {
            fs::write(output, artifact.as_bytes())
                .with_context(|| format!("Failed to write output {}", output.display()))?;
            ok_output("Wrote", output.display());
        }
        None => io::stdout().write_all(artifact.as_bytes())?,
    }
    Ok(())
}
