use super::index::RosterIndex;
use super::types::{Pool, SelectionMode};
use crate::model::{EmploymentClass, Worker, WorkerId};
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Contexte d'un créneau à pourvoir.
#[derive(Debug, Clone, Copy)]
pub struct RankRequest<'r> {
    pub date: NaiveDate,
    pub mode: SelectionMode,
    pub pool: Pool,
    pub assigned_today: &'r [WorkerId],
    pub desired: &'r BTreeSet<WorkerId>,
    pub blocked: &'r BTreeSet<WorkerId>,
    /// Utilisé par le mode cuisine (règle de renfort).
    pub relief_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub worker: &'a Worker,
    pub desired: bool,
    pub assigned_count: u32,
    secondary: u8,
}

impl Candidate<'_> {
    fn sort_key(&self) -> (bool, u8, u32, &WorkerId) {
        (!self.desired, self.secondary, self.assigned_count, &self.worker.id)
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Liste ordonnée des candidats éligibles ; la tête est la personne retenue.
///
/// Exclusions : indisponible ce jour, déjà affecté ce jour, plafond mensuel
/// atteint, jour de repos fixe (salariés). Puis filtre du mode et tri par
/// (souhait, clé du mode, services déjà faits, identifiant).
pub fn rank_candidates<'a>(
    index: &RosterIndex<'a>,
    counts: &BTreeMap<WorkerId, u32>,
    req: &RankRequest<'_>,
) -> Vec<Candidate<'a>> {
    let weekday = req.date.weekday();

    let mut out: Vec<Candidate<'a>> = index
        .workers()
        .filter(|w| req.pool == Pool::Everyone || w.is_core())
        .filter(|w| !req.blocked.contains(&w.id))
        .filter(|w| !req.assigned_today.contains(&w.id))
        .filter(|w| !w.is_day_off(weekday))
        .filter_map(|w| {
            let assigned_count = counts.get(&w.id).copied().unwrap_or(0);
            (index.remaining_capacity(&w.id, assigned_count) > 0).then_some((w, assigned_count))
        })
        .filter(|(w, _)| match req.mode {
            SelectionMode::Kitchen => index.kitchen_capable(w, req.relief_present),
            SelectionMode::Hall => index.hall_eligible(w),
            SelectionMode::Generic => true,
        })
        .map(|(worker, assigned_count)| Candidate {
            worker,
            desired: req.desired.contains(&worker.id),
            assigned_count,
            secondary: secondary_key(index, worker, req.mode),
        })
        .collect();

    out.sort();
    out
}

fn secondary_key(index: &RosterIndex<'_>, worker: &Worker, mode: SelectionMode) -> u8 {
    match mode {
        SelectionMode::Kitchen => index.kitchen_rank(worker),
        SelectionMode::Hall | SelectionMode::Generic => match worker.class {
            EmploymentClass::Flexible => 0,
            EmploymentClass::Core => 1,
        },
    }
}
