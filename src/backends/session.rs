// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-export session context.
//!
//! Everything mutable an export run needs travels in one explicit value, so
//! independent exports are fully isolated and trivially testable.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    backends::dedup::DeclTracker,
    ir::{keywords::KeywordTable, Root},
};

fn default_true() -> bool {
    true
}

fn default_array_size() -> u32 {
    100
}

/// Per-export option set, deserializable from a YAML options file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Emit element comments as target-language comments.
    #[serde(default = "default_true")]
    pub include_comments: bool,
    /// Array size used in declarations when a bound is unknown.
    #[serde(default = "default_array_size")]
    pub default_array_size: u32,
    /// Put opening braces on their own line (brace-placement style).
    #[serde(default)]
    pub brace_next_line: bool,
    /// Emit an author/date banner at the top of the artifact.
    #[serde(default = "default_true")]
    pub banner: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            default_array_size: default_array_size(),
            brace_next_line: false,
            banner: true,
        }
    }
}

/// Routine-lookup collaborator: resolves a call's textual name and argument
/// count to a candidate diagram, for cross-routine signature propagation.
#[derive(Debug, Default)]
pub struct RoutinePool {
    routines: Vec<Root>,
}

impl RoutinePool {
    pub fn new(routines: Vec<Root>) -> Self {
        Self { routines }
    }

    pub fn lookup(&self, name: &str, arity: usize) -> Option<&Root> {
        self.routines
            .iter()
            .find(|r| r.name == name && r.parameters.len() == arity)
            .or_else(|| self.routines.iter().find(|r| r.name == name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Root> {
        self.routines.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Similar known routine names, most similar last.
    pub fn suggest(&self, name: &str) -> Vec<String> {
        did_you_mean(name, self.routines.iter().map(|r| r.name.as_str()))
    }
}

/// Find strings from an iterable of `possible_values` similar to a given
/// value `v`, sorted by ascending similarity.
pub fn did_you_mean<T, I>(v: &str, possible_values: I) -> Vec<String>
where
    T: AsRef<str>,
    I: IntoIterator<Item = T>,
{
    let mut candidates: Vec<(f64, String)> = possible_values
        .into_iter()
        .map(|pv| (strsim::jaro(v, pv.as_ref()), pv.as_ref().to_owned()))
        .filter(|(confidence, _)| *confidence > 0.7)
        .collect();
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    candidates.into_iter().map(|(_, pv)| pv).collect()
}

/// The export session: options, keyword table, dedup registry, routine pool.
#[derive(Debug)]
pub struct Session {
    pub options: ExportOptions,
    pub keywords: KeywordTable,
    pub declared: DeclTracker,
    pub routines: RoutinePool,
}

impl Session {
    pub fn new(options: ExportOptions, keywords: KeywordTable) -> Self {
        Self {
            options,
            keywords,
            declared: DeclTracker::new(),
            routines: RoutinePool::default(),
        }
    }

    pub fn with_routines(mut self, routines: Vec<Root>) -> Self {
        self.routines = RoutinePool::new(routines);
        self
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ExportOptions::default(), KeywordTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_suggests_similar_names() {
        let suggestions = did_you_mean("facotrial", ["factorial", "fibonacci"]);
        assert_eq!(suggestions, vec!["factorial".to_string()]);
    }

    #[test]
    fn it_defaults_options() {
        let options: ExportOptions = serde_yaml::from_str("{}").unwrap();
        assert_eq!(options, ExportOptions::default());
        let options: ExportOptions =
            serde_yaml::from_str("include_comments: false").unwrap();
        assert!(!options.include_comments);
        assert_eq!(options.default_array_size, 100);
    }
}
