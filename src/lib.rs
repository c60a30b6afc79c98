#![forbid(unsafe_code)]
//! Roulement : complétion automatique des plannings mensuels d'un établissement (sans BD).
//!
//! - Effectif, affectations et souhaits en fichiers (JSON/CSV).
//! - Moteur en trois phases : salariés de base, renfort premium, effectif total.
//! - N'ajoute que ce qui manque ; les affectations existantes ne sont jamais modifiées.
//! - Fusion au commit : un seul enregistrement par (date, personne), le dernier gagne.

pub mod calendar;
pub mod io;
pub mod merge;
pub mod model;
pub mod policy;
pub mod scheduler;
pub mod storage;

pub use calendar::{
    is_weekend, Holiday, HolidayCalendar, HolidaySource, HolidayTable, JapaneseHolidays,
    NoHolidays, TargetMonth,
};
pub use merge::merge_assignments;
pub use model::{
    Assignment, AvailabilityEntry, AvailabilityKind, Capability, EmploymentClass, Provenance,
    RequestId, Roster, ShiftWindow, Worker, WorkerId,
};
pub use policy::{
    export_policy_json, load_policy_from_file, BackupCoverage, DayDemand, StaffingPolicy,
};
pub use scheduler::{
    Conflict, ConflictKind, Proposal, SchedError, Scheduler, SelectionMode, Shortfall,
};
pub use storage::{JsonStorage, Ledger, Storage};
