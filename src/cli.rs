// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Error, Result};
use clap::Parser;

use crate::backends::Target;

/// Generate source code from structured diagrams
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct MainArgs {
    /// Diagram file to export (YAML stream, first document is the program)
    pub input: PathBuf,

    /// Output file, stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output target language
    #[arg(short, long)]
    pub target: Option<Target>,

    /// Export options file (YAML)
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Keyword table file (YAML)
    #[arg(long)]
    pub keywords: Option<PathBuf>,

    /// Parse and analyze only, write nothing
    #[arg(short, long)]
    pub check: bool,

    /// Verbose
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet
    #[arg(short, long)]
    pub quiet: bool,
}

impl MainArgs {
    /// Compute target from CLI arguments
    pub fn target(&self) -> Result<Target> {
        self.target
            .ok_or_else(|| anyhow!("No target specified"))
            // Guess from file extension
            .or_else(|_| match &self.output {
                Some(output) => output.as_path().try_into(),
                None => Err(anyhow!(
                    "No target specified and no output file to guess it from"
                )),
            })
    }
}

impl TryFrom<&Path> for Target {
    type Error = Error;

    fn try_from(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("Could not read extension of {}", path.display()))?;
        extension.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_guesses_the_target_from_the_output_extension() {
        let args = MainArgs::parse_from(["nsdc", "demo.yml", "-o", "Demo.java"]);
        assert_eq!(args.target().unwrap(), Target::Java);
        let args = MainArgs::parse_from(["nsdc", "demo.yml", "-o", "demo.py", "-t", "php"]);
        assert_eq!(args.target().unwrap(), Target::Php);
    }

    #[test]
    fn it_requires_some_target_indication() {
        let args = MainArgs::parse_from(["nsdc", "demo.yml"]);
        assert!(args.target().is_err());
    }
}
