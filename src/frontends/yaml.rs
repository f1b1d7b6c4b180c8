// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagram trees represented in YAML format.
//!
//! An export unit is a YAML stream: the first document is the top-level
//! diagram, every following document joins the routine pool for call
//! resolution and multi-routine export.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::trace;

use crate::ir::{Program, Root};

pub fn read(input: &str) -> Result<Program> {
    let mut roots = Vec::new();
    for (i, doc) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let root = Root::deserialize(doc)
            .with_context(|| format!("Failed to parse diagram document {}", i + 1))?;
        roots.push(root);
    }
    if roots.is_empty() {
        bail!("Input contains no diagram");
    }
    trace!("Parsed input:\n{:#?}", roots);

    let main = roots.remove(0);
    Ok(Program {
        main,
        routines: roots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_reads_a_single_diagram() {
        let program = read("name: demo\nbody: []\n").unwrap();
        assert_eq!(program.main.name, "demo");
        assert!(program.routines.is_empty());
    }

    #[test]
    fn it_splits_a_stream_into_main_and_pool() {
        let input = r#"
name: demo
body:
  - kind: call
    lines: ["x <- double(2)"]
---
name: double
kind: subroutine
parameters:
  - name: n
    type: int
result_type: int
body:
  - kind: jump
    text: "return n * 2"
"#;
        let program = read(input).unwrap();
        assert_eq!(program.main.name, "demo");
        assert_eq!(program.routines.len(), 1);
        assert_eq!(program.routines[0].name, "double");
    }

    #[test]
    fn it_rejects_empty_input() {
        assert!(read("").is_err());
    }
}
