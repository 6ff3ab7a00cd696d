use serde::Serialize;

use crate::snapshot::Snapshot;
use crate::types::{ChangeFlag, ChangeLabel, ChangeRecord};

const PENDING_MARKER: &str = "under process";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub changed: bool,
    pub changes: Vec<ChangeRecord>,
}

impl Diff {
    /// A snapshot is written only when it differs and something is reportable.
    /// Removed keys alone make `changed` true but produce no changes.
    pub fn should_persist(&self) -> bool {
        self.changed && !self.changes.is_empty()
    }
}

/// Compares `new` against `old`. Only keys of `new` are reported, in the
/// snapshot's insertion order; keys that disappeared are ignored.
pub fn diff(new: &Snapshot, old: &Snapshot) -> Diff {
    if new == old {
        return Diff::default();
    }

    let changes = new
        .iter()
        .filter_map(|(key, value)| {
            let previous = old.get(key);
            if previous == Some(value) {
                return None;
            }
            Some(ChangeRecord {
                key: key.to_string(),
                label: ChangeLabel::from_key(key),
                old_value: previous.map(str::to_string),
                new_value: value.to_string(),
                flag: classify(previous, value),
            })
        })
        .collect();

    Diff {
        changed: true,
        changes,
    }
}

fn is_pending(value: &str) -> bool {
    value.to_lowercase().contains(PENDING_MARKER)
}

fn classify(old: Option<&str>, new: &str) -> Option<ChangeFlag> {
    match old {
        Some(old) if is_pending(old) && !is_pending(new) => Some(ChangeFlag::NewDateAssigned),
        _ => None,
    }
}
