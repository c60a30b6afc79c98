use super::index::RosterIndex;
use super::{Conflict, ConflictKind};
use crate::calendar::TargetMonth;
use crate::model::{Assignment, AvailabilityEntry, AvailabilityKind, WorkerId};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// Vérifie les invariants d'un ensemble d'affectations du mois.
pub(super) fn detect_conflicts(
    index: &RosterIndex<'_>,
    month: TargetMonth,
    assignments: &[Assignment],
    availability: &[AvailabilityEntry],
) -> Vec<Conflict> {
    let mut out = Vec::new();

    let blocked: BTreeSet<(NaiveDate, &WorkerId)> = availability
        .iter()
        .filter(|e| e.kind == AvailabilityKind::Blocked && month.contains(e.date))
        .map(|e| (e.date, &e.worker))
        .collect();

    let mut seen: BTreeSet<(NaiveDate, &WorkerId)> = BTreeSet::new();
    let mut counts: BTreeMap<&WorkerId, u32> = BTreeMap::new();

    for a in assignments.iter().filter(|a| month.contains(a.date)) {
        let conflict = |kind| Conflict {
            worker: a.worker.clone(),
            date: Some(a.date),
            kind,
        };

        let Some(worker) = index.get(&a.worker) else {
            out.push(conflict(ConflictKind::UnknownWorker));
            continue;
        };
        if !seen.insert(a.key()) {
            out.push(conflict(ConflictKind::DoubleBooking));
            continue;
        }
        *counts.entry(&a.worker).or_insert(0) += 1;

        if worker.is_day_off(a.date.weekday()) {
            out.push(conflict(ConflictKind::FixedDayOff));
        }
        if blocked.contains(&a.key()) {
            out.push(conflict(ConflictKind::Blocked));
        }
    }

    for (id, count) in counts {
        let cap = index.get(id).map_or(0, |w| w.monthly_cap);
        if count > cap {
            out.push(Conflict {
                worker: id.clone(),
                date: None,
                kind: ConflictKind::CapacityExceeded,
            });
        }
    }

    out
}
