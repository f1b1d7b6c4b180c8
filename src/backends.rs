// SPDX-License-Identifier: GPL-3.0-or-later

//! Target back ends.
//!
//! A back end is something that can generate final code for a given target
//! notation from a diagram tree. Linear-text back ends are values plugged
//! into the shared [`text::TextBackend`] engine; the PAP back end emits a
//! flowchart graph instead of linear text.

use std::{fmt, str::FromStr};

use anyhow::{bail, Error, Result};
use serde::Serialize;

use crate::{backends::session::Session, ir::Program};

pub mod buffer;
pub mod csharp;
pub mod dedup;
pub mod java;
pub mod latex;
pub mod pap;
pub mod php;
pub mod python;
pub mod session;
pub mod text;

pub use self::text::{Dialect, TextBackend};

pub trait Backend {
    /// Generate the complete artifact for one export unit.
    fn generate(&self, program: &Program, session: &mut Session) -> Result<String>;
}

/// Select the right backend
pub fn backend(target: Target) -> Box<dyn Backend> {
    match target {
        Target::Java => Box::new(TextBackend(java::Java)),
        Target::CSharp => Box::new(TextBackend(csharp::CSharp)),
        Target::Python => Box::new(TextBackend(python::Python)),
        Target::Php => Box::new(TextBackend(php::Php)),
        Target::Latex => Box::new(TextBackend(latex::Latex)),
        Target::Pap => Box::new(pap::Pap),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Java,
    #[clap(alias = "cs")]
    CSharp,
    #[clap(alias = "py")]
    Python,
    Php,
    #[clap(alias = "tex")]
    Latex,
    #[clap(alias = "xml")]
    Pap,
}

pub const ALL_TARGETS: &[Target] = &[
    Target::Java,
    Target::CSharp,
    Target::Python,
    Target::Php,
    Target::Latex,
    Target::Pap,
];

impl Target {
    /// Extension of the generated artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Target::Java => "java",
            Target::CSharp => "cs",
            Target::Python => "py",
            Target::Php => "php",
            Target::Latex => "tex",
            Target::Pap => "xml",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Target::Java => "java",
                Target::CSharp => "csharp",
                Target::Python => "python",
                Target::Php => "php",
                Target::Latex => "latex",
                Target::Pap => "pap",
            }
        )
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(target: &str) -> Result<Self> {
        match target.to_ascii_lowercase().as_str() {
            "java" => Ok(Target::Java),
            "cs" | "csharp" => Ok(Target::CSharp),
            "py" | "python" => Ok(Target::Python),
            "php" => Ok(Target::Php),
            "tex" | "latex" => Ok(Target::Latex),
            "pap" | "xml" => Ok(Target::Pap),
            _ => bail!("Could not parse target {}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_parses_targets() {
        assert_eq!(Target::from_str("cs").unwrap(), Target::CSharp);
        assert_eq!(Target::from_str("LaTeX").unwrap(), Target::Latex);
        assert!(Target::from_str("cobol").is_err());
        assert_eq!(Target::Python.extension(), "py");
    }
}
