mod allocation;
mod conflicts;
mod index;
mod ranking;
mod types;

pub use index::RosterIndex;
pub use ranking::{rank_candidates, Candidate, RankRequest};
pub use types::{Conflict, ConflictKind, Pool, Proposal, SchedError, SelectionMode, Shortfall};

use crate::calendar::{HolidayCalendar, TargetMonth};
use crate::model::{Assignment, AvailabilityEntry, Roster, Worker, WorkerId};
use crate::policy::{DayDemand, StaffingPolicy};
use allocation::MonthBook;
use chrono::NaiveDate;
use std::fmt;

/// Scheduler : instantané immuable (effectif + politique) sur lequel on
/// calcule des propositions mois par mois.
pub struct Scheduler {
    roster: Roster,
    policy: StaffingPolicy,
    holidays: Box<dyn HolidayCalendar + Send + Sync>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("roster", &self.roster)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Valide la politique ; le calendrier des fériés vient de `policy.holidays`.
    pub fn new(roster: Roster, policy: StaffingPolicy) -> Result<Self, SchedError> {
        policy.validate()?;
        let holidays = policy.holidays.calendar();
        Ok(Self {
            roster,
            policy,
            holidays,
        })
    }

    pub fn with_holidays<H>(mut self, holidays: H) -> Self
    where
        H: HolidayCalendar + Send + Sync + 'static,
    {
        self.holidays = Box::new(holidays);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn policy(&self) -> &StaffingPolicy {
        &self.policy
    }

    pub fn worker(&self, id: &WorkerId) -> Result<&Worker, SchedError> {
        self.roster
            .find_worker_by_id(id)
            .ok_or_else(|| SchedError::UnknownWorker(id.as_str().to_string()))
    }

    pub fn demand(&self, date: NaiveDate) -> DayDemand {
        self.policy.demand_for(date, self.holidays.as_ref())
    }

    fn index(&self) -> RosterIndex<'_> {
        RosterIndex::new(&self.roster, self.policy.kitchen_backup)
    }

    /// Calcule les affectations à ajouter pour couvrir les manques du mois.
    ///
    /// Les affectations confirmées ne sont jamais modifiées ; seules les
    /// nouvelles (provenance `Auto`) sont renvoyées.
    pub fn propose(
        &self,
        year: i32,
        month: u32,
        confirmed: &[Assignment],
        availability: &[AvailabilityEntry],
    ) -> Result<Proposal, SchedError> {
        let month = TargetMonth::new(year, month)?;
        let index = self.index();
        let mut book = MonthBook::new(&index, month, confirmed, availability);

        allocation::allocate(&mut book, &self.policy, self.holidays.as_ref());

        let shortfalls = book.shortfalls(&self.policy, self.holidays.as_ref());
        let assignments = book.into_proposed();
        tracing::info!(
            %month,
            proposed = assignments.len(),
            short_dates = shortfalls.len(),
            "proposal computed"
        );
        Ok(Proposal {
            month,
            assignments,
            shortfalls,
        })
    }

    /// Manques du mois avant tout calcul, sur les seules affectations fournies.
    pub fn assess(
        &self,
        year: i32,
        month: u32,
        confirmed: &[Assignment],
    ) -> Result<Vec<Shortfall>, SchedError> {
        let month = TargetMonth::new(year, month)?;
        let index = self.index();
        let book = MonthBook::new(&index, month, confirmed, &[]);
        Ok(book.shortfalls(&self.policy, self.holidays.as_ref()))
    }

    /// Détecte les violations d'invariants (double affectation, plafond, repos, indisponibilité).
    pub fn audit(
        &self,
        year: i32,
        month: u32,
        assignments: &[Assignment],
        availability: &[AvailabilityEntry],
    ) -> Result<Vec<Conflict>, SchedError> {
        let month = TargetMonth::new(year, month)?;
        Ok(conflicts::detect_conflicts(
            &self.index(),
            month,
            assignments,
            availability,
        ))
    }
}
