//! Diff engine: membership-based added/removed between two normalized columns

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Values that appear only in the comparison column (`added`) or only in the
/// baseline column (`removed`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ColumnDiff {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Compare `baseline` against `comparison`.
///
/// Membership, not multiplicity: a value present anywhere in the other column
/// suppresses every equal occurrence. Output order follows each source column
/// and surviving duplicates are kept.
pub fn diff(baseline: &[String], comparison: &[String]) -> ColumnDiff {
    let baseline_set: HashSet<&str> = baseline.iter().map(String::as_str).collect();
    let comparison_set: HashSet<&str> = comparison.iter().map(String::as_str).collect();

    ColumnDiff {
        added: missing_from(comparison, &baseline_set),
        removed: missing_from(baseline, &comparison_set),
    }
}

fn missing_from(values: &[String], other: &HashSet<&str>) -> Vec<String> {
    values
        .iter()
        .filter(|value| !other.contains(value.as_str()))
        .cloned()
        .collect()
}
