use super::index::RosterIndex;
use super::ranking::{rank_candidates, RankRequest};
use super::types::{Pool, SelectionMode, Shortfall};
use crate::calendar::{HolidayCalendar, TargetMonth};
use crate::model::{Assignment, AvailabilityEntry, AvailabilityKind, WorkerId};
use crate::policy::{premium_rank, DayDemand, StaffingPolicy};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// État courant du mois : qui travaille quel jour, combien de services chacun.
///
/// Pré-rempli avec les affectations confirmées, puis enrichi au fil des phases.
#[derive(Debug)]
pub(super) struct MonthBook<'i, 'a> {
    index: &'i RosterIndex<'a>,
    month: TargetMonth,
    assigned: BTreeMap<NaiveDate, Vec<WorkerId>>,
    counts: BTreeMap<WorkerId, u32>,
    desired: BTreeMap<NaiveDate, BTreeSet<WorkerId>>,
    blocked: BTreeMap<NaiveDate, BTreeSet<WorkerId>>,
    proposed: Vec<Assignment>,
}

impl<'i, 'a> MonthBook<'i, 'a> {
    pub(super) fn new(
        index: &'i RosterIndex<'a>,
        month: TargetMonth,
        confirmed: &[Assignment],
        availability: &[AvailabilityEntry],
    ) -> Self {
        let mut book = Self {
            index,
            month,
            assigned: BTreeMap::new(),
            counts: BTreeMap::new(),
            desired: BTreeMap::new(),
            blocked: BTreeMap::new(),
            proposed: Vec::new(),
        };

        for a in confirmed.iter().filter(|a| month.contains(a.date)) {
            if !index.contains(&a.worker) {
                tracing::warn!(worker = %a.worker, date = %a.date, "assignment for unknown worker ignored");
                continue;
            }
            if book.is_assigned(a.date, &a.worker) {
                tracing::warn!(worker = %a.worker, date = %a.date, "duplicate confirmed assignment ignored");
                continue;
            }
            book.push(a.date, a.worker.clone());
        }

        for entry in availability.iter().filter(|e| month.contains(e.date)) {
            if !index.contains(&entry.worker) {
                tracing::warn!(worker = %entry.worker, date = %entry.date, "availability for unknown worker ignored");
                continue;
            }
            let target = match entry.kind {
                AvailabilityKind::Desired => &mut book.desired,
                AvailabilityKind::Blocked => &mut book.blocked,
            };
            target.entry(entry.date).or_default().insert(entry.worker.clone());
        }

        book
    }

    fn push(&mut self, date: NaiveDate, worker: WorkerId) {
        *self.counts.entry(worker.clone()).or_insert(0) += 1;
        self.assigned.entry(date).or_default().push(worker);
    }

    fn is_assigned(&self, date: NaiveDate, worker: &WorkerId) -> bool {
        self.assignees(date).contains(worker)
    }

    fn assignees(&self, date: NaiveDate) -> &[WorkerId] {
        self.assigned.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    fn core_count(&self, date: NaiveDate) -> u32 {
        self.assignees(date)
            .iter()
            .filter_map(|id| self.index.get(id))
            .filter(|w| w.is_core())
            .count() as u32
    }

    fn kitchen_count(&self, date: NaiveDate) -> u32 {
        // même règle de relais que pour la sélection : sans relais, le gérant ne compte pas
        let today = self.assignees(date);
        let relief = self.index.relief_present(today);
        today
            .iter()
            .filter_map(|id| self.index.get(id))
            .filter(|w| self.index.kitchen_capable(w, relief))
            .count() as u32
    }

    fn hall_count(&self, date: NaiveDate) -> u32 {
        self.assignees(date)
            .iter()
            .filter_map(|id| self.index.get(id))
            .filter(|w| self.index.hall_eligible(w))
            .count() as u32
    }

    fn total_count(&self, date: NaiveDate) -> u32 {
        self.assignees(date).len() as u32
    }

    /// Retient la tête du classement pour `date`, ou `None` si personne n'est éligible.
    fn select(&self, date: NaiveDate, mode: SelectionMode, pool: Pool) -> Option<WorkerId> {
        let empty = BTreeSet::new();
        let today = self.assignees(date);
        let req = RankRequest {
            date,
            mode,
            pool,
            assigned_today: today,
            desired: self.desired.get(&date).unwrap_or(&empty),
            blocked: self.blocked.get(&date).unwrap_or(&empty),
            relief_present: self.index.relief_present(today),
        };
        rank_candidates(self.index, &self.counts, &req)
            .first()
            .map(|c| c.worker.id.clone())
    }

    fn record(&mut self, date: NaiveDate, worker: WorkerId, policy: &StaffingPolicy) {
        tracing::debug!(%date, worker = %worker, "assigning");
        self.proposed
            .push(Assignment::auto(date, worker.clone(), policy.shift));
        self.push(date, worker);
    }

    pub(super) fn shortfall(&self, demand: &DayDemand) -> Shortfall {
        let date = demand.date;
        Shortfall {
            date,
            missing_total: demand.total.saturating_sub(self.total_count(date)),
            missing_core: demand.core.saturating_sub(self.core_count(date)),
            missing_kitchen: demand.kitchen.saturating_sub(self.kitchen_count(date)),
            missing_hall: demand.hall.saturating_sub(self.hall_count(date)),
        }
    }

    pub(super) fn shortfalls(
        &self,
        policy: &StaffingPolicy,
        holidays: &dyn HolidayCalendar,
    ) -> Vec<Shortfall> {
        self.month
            .dates()
            .into_iter()
            .map(|date| self.shortfall(&policy.demand_for(date, holidays)))
            .filter(|s| !s.is_met())
            .collect()
    }

    pub(super) fn into_proposed(self) -> Vec<Assignment> {
        self.proposed
    }
}

/// Amène les salariés du jour à `target`, tant qu'il reste des candidats.
fn fill_core(book: &mut MonthBook<'_, '_>, date: NaiveDate, target: u32, policy: &StaffingPolicy) {
    let need = target.saturating_sub(book.core_count(date));
    for _ in 0..need {
        let Some(worker) = book.select(date, SelectionMode::Generic, Pool::CoreOnly) else {
            tracing::debug!(%date, core_target = target, "no core candidate left");
            break;
        };
        book.record(date, worker, policy);
    }
}

/// Complète l'effectif total en servant d'abord la cuisine, puis la salle.
fn fill_headcount(book: &mut MonthBook<'_, '_>, demand: &DayDemand, policy: &StaffingPolicy) {
    let date = demand.date;
    while book.total_count(date) < demand.total {
        let mode = if book.kitchen_count(date) < demand.kitchen {
            SelectionMode::Kitchen
        } else if book.hall_count(date) < demand.hall {
            SelectionMode::Hall
        } else {
            SelectionMode::Generic
        };
        let Some(worker) = book.select(date, mode, Pool::Everyone) else {
            tracing::debug!(%date, ?mode, "candidate pool empty, leaving shortfall");
            break;
        };
        book.record(date, worker, policy);
    }
}

/// Les trois phases, dans l'ordre : salariés de base, salarié supplémentaire
/// les jours premium, puis effectif total.
pub(super) fn allocate(
    book: &mut MonthBook<'_, '_>,
    policy: &StaffingPolicy,
    holidays: &dyn HolidayCalendar,
) {
    let dates = book.month.dates();

    tracing::debug!(month = %book.month, "phase 1: baseline core coverage");
    for &date in &dates {
        fill_core(book, date, policy.core_min, policy);
    }

    tracing::debug!(month = %book.month, "phase 2: premium-day core coverage");
    let mut premium: Vec<(u8, NaiveDate)> = dates
        .iter()
        .filter_map(|&d| premium_rank(d, holidays.is_holiday(d)).map(|rank| (rank, d)))
        .collect();
    premium.sort();
    for (_, date) in premium {
        fill_core(book, date, policy.premium_core_min, policy);
    }

    tracing::debug!(month = %book.month, "phase 3: residual headcount");
    for &date in &dates {
        let demand = policy.demand_for(date, holidays);
        fill_headcount(book, &demand, policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::NoHolidays;
    use crate::model::{Capability, EmploymentClass, Roster, ShiftWindow, Worker};
    use crate::policy::BackupCoverage;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn roster() -> Roster {
        Roster::new(vec![
            Worker::new("S001", "Manager", EmploymentClass::Core, Capability::Management).with_cap(5),
            Worker::new("S003", "Staff", EmploymentClass::Core, Capability::Generalist).with_cap(5),
            Worker::new("P001", "Server", EmploymentClass::Flexible, Capability::HallOnly).with_cap(5),
        ])
    }

    #[test]
    fn seeded_book_ignores_foreign_and_duplicate_records() {
        let roster = roster();
        let index = RosterIndex::new(&roster, Some(BackupCoverage::default()));
        let w = ShiftWindow::default();
        let confirmed = vec![
            Assignment::manual(d(10), WorkerId::new("S001"), w),
            Assignment::manual(d(10), WorkerId::new("S001"), w),
            Assignment::manual(d(10), WorkerId::new("ghost"), w),
            Assignment::manual(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), WorkerId::new("S003"), w),
        ];
        let book = MonthBook::new(&index, TargetMonth::new(2025, 3).unwrap(), &confirmed, &[]);
        assert_eq!(book.total_count(d(10)), 1);
        assert_eq!(book.counts.get(&WorkerId::new("S001")), Some(&1));
        assert!(!book.counts.contains_key(&WorkerId::new("S003")));
    }

    #[test]
    fn manager_counts_in_kitchen_once_relieved() {
        let roster = roster();
        let index = RosterIndex::new(&roster, Some(BackupCoverage::default()));
        let w = ShiftWindow::default();
        let mut confirmed = vec![
            Assignment::manual(d(10), WorkerId::new("S001"), w),
            Assignment::manual(d(10), WorkerId::new("P001"), w),
        ];
        let month = TargetMonth::new(2025, 3).unwrap();
        let policy = StaffingPolicy::default();

        let book = MonthBook::new(&index, month, &confirmed, &[]);
        let before = book.shortfall(&policy.demand_for(d(10), &NoHolidays));
        assert_eq!(before.missing_kitchen, 2);
        assert_eq!(before.missing_hall, 1);

        confirmed.push(Assignment::manual(d(10), WorkerId::new("S003"), w));
        let book = MonthBook::new(&index, month, &confirmed, &[]);
        let after = book.shortfall(&policy.demand_for(d(10), &NoHolidays));
        assert_eq!(after.missing_kitchen, 1);
        assert_eq!(after.missing_hall, 0);
        assert_eq!(after.missing_core, 0);
        assert_eq!(after.missing_total, 2);
    }

    #[test]
    fn unrelieved_manager_leaves_kitchen_fill_first() {
        let roster = Roster::new(vec![
            Worker::new("S001", "Manager", EmploymentClass::Core, Capability::Management).with_cap(5),
            Worker::new("S002", "Chef", EmploymentClass::Core, Capability::Chef).with_cap(5),
            Worker::new("P001", "Cook", EmploymentClass::Flexible, Capability::KitchenOnly).with_cap(5),
            Worker::new("P002", "Server", EmploymentClass::Flexible, Capability::HallOnly).with_cap(5),
            Worker::new("P003", "Runner", EmploymentClass::Flexible, Capability::HallOnly).with_cap(5),
        ]);
        let index = RosterIndex::new(&roster, Some(BackupCoverage::default()));
        let w = ShiftWindow::default();
        let confirmed = vec![
            Assignment::manual(d(10), WorkerId::new("S001"), w),
            Assignment::manual(d(10), WorkerId::new("S002"), w),
        ];
        let policy = StaffingPolicy::default();
        let mut book = MonthBook::new(&index, TargetMonth::new(2025, 3).unwrap(), &confirmed, &[]);
        let demand = policy.demand_for(d(10), &NoHolidays);
        assert_eq!(book.shortfall(&demand).missing_kitchen, 1);

        fill_headcount(&mut book, &demand, &policy);
        assert!(book.shortfall(&demand).is_met());
        let order: Vec<String> = book
            .into_proposed()
            .into_iter()
            .map(|a| a.worker.as_str().to_string())
            .collect();
        // cuisine d'abord, puis salle, puis effectif
        assert_eq!(order, ["P001", "P002", "P003"]);
    }

    #[test]
    fn phases_stop_when_pool_is_empty() {
        let roster = roster();
        let index = RosterIndex::new(&roster, Some(BackupCoverage::default()));
        let policy = StaffingPolicy::default();
        let mut book = MonthBook::new(&index, TargetMonth::new(2025, 3).unwrap(), &[], &[]);
        allocate(&mut book, &policy, &NoHolidays);
        // deux salariés plafonnés à 5 ; la cuisine n'ayant aucun candidat,
        // la phase 3 s'arrête avant de retenir le serveur
        let proposed = book.into_proposed();
        assert_eq!(proposed.len(), 10);
        assert!(proposed.iter().all(|a| a.worker.as_str() != "P001"));
    }
}
