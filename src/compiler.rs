// SPDX-License-Identifier: GPL-3.0-or-later

//! Export driver: read the diagram stream, build a session, run a backend.

use std::{fs::read_to_string, path::Path};

use anyhow::{Context, Result};

use crate::{
    analysis,
    backends::{
        backend,
        session::{ExportOptions, Session},
        Target,
    },
    frontends::yaml,
    ir::keywords::KeywordTable,
    logs::ok_output,
};

/// Compute the generated artifact for one export unit.
pub fn compile(
    input: &Path,
    target: Target,
    options: ExportOptions,
    keywords: KeywordTable,
) -> Result<String> {
    let content = read_to_string(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    let program = yaml::read(&content)?;

    ok_output(
        "Generating",
        format!("{} [{}] ({})", program.main.name, target, input.display()),
    );

    let mut session =
        Session::new(options, keywords).with_routines(program.routines.clone());
    backend(target).generate(&program, &mut session)
}

/// Parse and analyze without producing an artifact.
pub fn check(input: &Path, keywords: KeywordTable) -> Result<()> {
    let content = read_to_string(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    let program = yaml::read(&content)?;
    for root in std::iter::once(&program.main).chain(program.routines.iter()) {
        let jumps = analysis::analyze(&root.body, &keywords, true);
        let vars = analysis::collect_var_names(&root.body, &keywords);
        ok_output(
            "Checked",
            format!(
                "{} ({} variables, {} loop labels)",
                root.name,
                vars.len(),
                jumps.label_count()
            ),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Program;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_exports_the_same_program_identically() {
        let root: crate::ir::Root = serde_yaml::from_str(
            "name: twice\nbody:\n  - kind: instruction\n    lines: [\"x <- 1\"]\n",
        )
        .unwrap();
        let program = Program::from(root);
        let run = || {
            backend(Target::Java)
                .generate(
                    &program,
                    &mut Session::new(ExportOptions::default(), KeywordTable::default()),
                )
                .unwrap()
        };
        assert_eq!(run(), run());
    }
}
