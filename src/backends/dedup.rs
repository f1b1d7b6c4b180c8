// SPDX-License-Identifier: GPL-3.0-or-later

//! Declaration/definition dedup tracker.
//!
//! A pure idempotent registry: once a (scope, name) pair is marked handled
//! it stays handled for the rest of the export session. Prevents duplicate
//! type/constant/global declarations when several routines reference the
//! same included entities.

use std::collections::HashSet;

/// Scope key for entities shared across the whole export session.
pub const GLOBAL_SCOPE: &str = "*global*";

#[derive(Debug, Default)]
pub struct DeclTracker {
    handled: HashSet<(String, String)>,
}

impl DeclTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_handled(&self, scope: &str, name: &str) -> bool {
        self.handled
            .contains(&(scope.to_string(), name.to_string()))
    }

    pub fn mark_handled(&mut self, scope: &str, name: &str) {
        self.handled.insert((scope.to_string(), name.to_string()));
    }

    /// Mark and report whether this was the first time. Callers emit the
    /// declaration only on `true`.
    pub fn first_time(&mut self, scope: &str, name: &str) -> bool {
        self.handled.insert((scope.to_string(), name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_is_idempotent() {
        let mut tracker = DeclTracker::new();
        assert!(!tracker.was_handled("main#0", "x"));
        tracker.mark_handled("main#0", "x");
        tracker.mark_handled("main#0", "x");
        assert!(tracker.was_handled("main#0", "x"));
        // scopes stay independent
        assert!(!tracker.was_handled(GLOBAL_SCOPE, "x"));
        assert!(!tracker.was_handled("main#0", "y"));
    }

    #[test]
    fn it_gates_on_first_time() {
        let mut tracker = DeclTracker::new();
        assert!(tracker.first_time(GLOBAL_SCOPE, "MAX"));
        assert!(!tracker.first_time(GLOBAL_SCOPE, "MAX"));
    }
}
