//! Fusion des affectations confirmées et proposées.

use crate::model::{Assignment, WorkerId};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Concatène `existing` puis `proposed` et ne garde, pour chaque couple
/// (date, personne), que le dernier enregistrement. L'ordre relatif des
/// enregistrements conservés est préservé.
pub fn merge_assignments(existing: &[Assignment], proposed: &[Assignment]) -> Vec<Assignment> {
    let all: Vec<&Assignment> = existing.iter().chain(proposed).collect();

    let mut last: HashMap<(NaiveDate, &WorkerId), usize> = HashMap::with_capacity(all.len());
    for (pos, a) in all.iter().enumerate() {
        last.insert(a.key(), pos);
    }

    all.iter()
        .enumerate()
        .filter(|(pos, a)| last.get(&a.key()) == Some(pos))
        .map(|(_, a)| (*a).clone())
        .collect()
}
