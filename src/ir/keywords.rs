// SPDX-License-Identifier: GPL-3.0-or-later

//! Configurable keyword table (parser preferences).
//!
//! Maps logical roles to the literal keywords recognized in element text.
//! All matching is case-insensitive and at word boundaries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    pub pre_return: String,
    pub pre_leave: String,
    pub pre_exit: String,
    pub pre_throw: String,
    pub input: String,
    pub output: String,
    pub pre_for: String,
    pub post_for: String,
    pub step_for: String,
    pub pre_for_in: String,
    pub post_for_in: String,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            pre_return: "return".to_string(),
            pre_leave: "leave".to_string(),
            pre_exit: "exit".to_string(),
            pre_throw: "throw".to_string(),
            input: "INPUT".to_string(),
            output: "OUTPUT".to_string(),
            pre_for: "for".to_string(),
            post_for: "to".to_string(),
            step_for: "by".to_string(),
            pre_for_in: "foreach".to_string(),
            post_for_in: "in".to_string(),
        }
    }
}

impl KeywordTable {
    /// If `line` starts with `keyword` (case-insensitive, followed by a
    /// non-word character or the end of line), return the trimmed remainder.
    pub fn match_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
        let line = line.trim();
        if line.len() < keyword.len() {
            return None;
        }
        let (head, rest) = line.split_at(keyword.len());
        if !head.eq_ignore_ascii_case(keyword) {
            return None;
        }
        match rest.chars().next() {
            None => Some(""),
            Some(c) if !c.is_alphanumeric() && c != '_' => Some(rest.trim()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_matches_keywords_case_insensitively() {
        assert_eq!(KeywordTable::match_keyword("return x + 1", "return"), Some("x + 1"));
        assert_eq!(KeywordTable::match_keyword("RETURN", "return"), Some(""));
        assert_eq!(KeywordTable::match_keyword("returns x", "return"), None);
        assert_eq!(KeywordTable::match_keyword("leave 2", "leave"), Some("2"));
        assert_eq!(KeywordTable::match_keyword("x <- 1", "return"), None);
    }
}
