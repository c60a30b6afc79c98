use crate::calendar::TargetMonth;
use crate::model::{Assignment, WorkerId};
use chrono::NaiveDate;
use thiserror::Error;

/// Mode de sélection d'un candidat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// Tout candidat éligible, vacataires d'abord.
    Generic,
    /// Seulement les personnes pouvant tenir la cuisine ce jour-là.
    Kitchen,
    /// Seulement les personnes comptant en salle.
    Hall,
}

/// Population dans laquelle on cherche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    CoreOnly,
    Everyone,
}

/// Besoins non couverts pour une date (0 = satisfait).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    pub date: NaiveDate,
    pub missing_total: u32,
    pub missing_core: u32,
    pub missing_kitchen: u32,
    pub missing_hall: u32,
}

impl Shortfall {
    pub fn is_met(&self) -> bool {
        self.missing_total == 0
            && self.missing_core == 0
            && self.missing_kitchen == 0
            && self.missing_hall == 0
    }
}

/// Résultat d'un calcul : seulement les ajouts, plus les manques restants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub month: TargetMonth,
    /// Dans l'ordre de création (phase 1, 2 puis 3).
    pub assignments: Vec<Assignment>,
    /// Dates dont un minimum reste non atteint après toutes les phases.
    pub shortfalls: Vec<Shortfall>,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn fully_covered(&self) -> bool {
        self.shortfalls.is_empty()
    }

    pub fn shortfall_on(&self, date: NaiveDate) -> Option<&Shortfall> {
        self.shortfalls.iter().find(|s| s.date == date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DoubleBooking,
    CapacityExceeded,
    FixedDayOff,
    Blocked,
    UnknownWorker,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::DoubleBooking => "double",
            ConflictKind::CapacityExceeded => "capacity",
            ConflictKind::FixedDayOff => "day-off",
            ConflictKind::Blocked => "blocked",
            ConflictKind::UnknownWorker => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub worker: WorkerId,
    /// Absente pour un dépassement de plafond (porte sur le mois).
    pub date: Option<NaiveDate>,
    pub kind: ConflictKind,
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid target month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("invalid policy: {0}")]
    InvalidPolicy(&'static str),
    #[error("unknown worker: {0}")]
    UnknownWorker(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
