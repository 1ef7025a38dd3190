use crate::record::{Record, Scalar};
use serde::{Deserialize, Serialize};

/// One field-level before/after pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub field: String,
    #[serde(default)]
    pub old_value: Option<Scalar>,
    #[serde(default)]
    pub new_value: Option<Scalar>,
}

/// Compares `original` and `edited` over `allow_list`, in allow-list order.
///
/// Fields outside the allow-list are never looked at, so identity columns cannot be
/// changed through this channel even when the candidate row differs there.
pub fn compute_changes(original: &Record, edited: &Record, allow_list: &[&str]) -> Vec<ChangeLogEntry> {
    allow_list
        .iter()
        .filter_map(|field| {
            let old = original.value(field);
            let new = edited.value(field);
            let same = match (old, new) {
                (None, None) => true,
                (Some(a), Some(b)) => a.same_value(b),
                _ => false,
            };
            if same {
                None
            } else {
                Some(ChangeLogEntry {
                    field: (*field).to_string(),
                    old_value: old.cloned(),
                    new_value: new.cloned(),
                })
            }
        })
        .collect()
}

/// Writes each entry's new value onto `record`, field by field, in entry order.
pub fn apply_changes(record: &mut Record, changes: &[ChangeLogEntry]) {
    for change in changes {
        record.set(change.field.clone(), change.new_value.clone());
    }
}
