use crate::model::{Capability, EmploymentClass, Roster, Worker, WorkerId};
use crate::policy::BackupCoverage;
use chrono::Weekday;
use std::collections::BTreeMap;

/// Vues en lecture seule sur l'effectif, construites une fois par calcul.
#[derive(Debug)]
pub struct RosterIndex<'a> {
    by_id: BTreeMap<&'a WorkerId, &'a Worker>,
    backup: Option<BackupCoverage>,
}

impl<'a> RosterIndex<'a> {
    pub fn new(roster: &'a Roster, backup: Option<BackupCoverage>) -> Self {
        let mut by_id = BTreeMap::new();
        for worker in &roster.workers {
            if by_id.contains_key(&worker.id) {
                tracing::warn!(worker = %worker.id, "duplicate worker id in roster, keeping first");
                continue;
            }
            by_id.insert(&worker.id, worker);
        }
        Self { by_id, backup }
    }

    pub fn get(&self, id: &WorkerId) -> Option<&'a Worker> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Tous les membres, triés par identifiant.
    pub fn workers(&self) -> impl Iterator<Item = &'a Worker> + '_ {
        self.by_id.values().copied()
    }

    pub fn by_class(&self, class: EmploymentClass) -> impl Iterator<Item = &'a Worker> + '_ {
        self.workers().filter(move |w| w.class == class)
    }

    pub fn with_capability(&self, capability: Capability) -> impl Iterator<Item = &'a Worker> + '_ {
        self.workers().filter(move |w| w.capability == capability)
    }

    /// Salariés dont `weekday` est un jour de repos fixe.
    pub fn off_on(&self, weekday: Weekday) -> impl Iterator<Item = &'a Worker> + '_ {
        self.workers().filter(move |w| w.is_day_off(weekday))
    }

    pub fn remaining_capacity(&self, id: &WorkerId, assigned: u32) -> u32 {
        self.get(id)
            .map_or(0, |w| w.monthly_cap.saturating_sub(assigned))
    }

    /// Vrai si un salarié capable de relayer le poste de renfort est présent.
    pub fn relief_present<'i, I>(&self, assignees: I) -> bool
    where
        I: IntoIterator<Item = &'i WorkerId>,
    {
        let Some(backup) = self.backup else {
            return true;
        };
        assignees
            .into_iter()
            .filter_map(|id| self.get(id))
            .any(|w| w.is_core() && w.capability == backup.relieved_by)
    }

    /// La personne peut-elle compter en cuisine ce jour-là ?
    pub fn kitchen_capable(&self, worker: &Worker, relief_present: bool) -> bool {
        match worker.capability {
            Capability::Chef | Capability::KitchenOnly | Capability::AllRound => true,
            cap if self.is_fallback(cap) => relief_present,
            Capability::HallOnly | Capability::Management | Capability::Generalist => false,
        }
    }

    pub fn hall_eligible(&self, worker: &Worker) -> bool {
        match worker.capability {
            Capability::KitchenOnly => false,
            Capability::HallOnly
            | Capability::AllRound
            | Capability::Management
            | Capability::Chef
            | Capability::Generalist => true,
        }
    }

    /// Priorité pour combler la cuisine (plus petit = préféré).
    pub fn kitchen_rank(&self, worker: &Worker) -> u8 {
        match worker.capability {
            Capability::Chef => 0,
            Capability::KitchenOnly => 1,
            Capability::AllRound => 2,
            cap if self.is_fallback(cap) => 3,
            Capability::HallOnly | Capability::Management | Capability::Generalist => 9,
        }
    }

    fn is_fallback(&self, capability: Capability) -> bool {
        match self.backup {
            Some(backup) => backup.fallback == capability,
            None => capability == Capability::Management,
        }
    }
}
