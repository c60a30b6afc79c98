use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifiant fort pour Worker
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().trim().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant d'une demande de disponibilité (souhait ou indisponibilité).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Statut d'emploi : salarié permanent (jours de repos fixes) ou vacataire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentClass {
    Core,
    Flexible,
}

impl FromStr for EmploymentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" | "employee" | "staff" => Ok(Self::Core),
            "flexible" | "part-time" | "parttime" | "hourly" => Ok(Self::Flexible),
            other => Err(format!("unknown employment class: {other}")),
        }
    }
}

/// Poste occupé. Ensemble fermé : les prédicats d'éligibilité font un `match` exhaustif.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    KitchenOnly,
    HallOnly,
    AllRound,
    Management,
    Chef,
    Generalist,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::KitchenOnly => "kitchen-only",
            Capability::HallOnly => "hall-only",
            Capability::AllRound => "all-round",
            Capability::Management => "management",
            Capability::Chef => "chef",
            Capability::Generalist => "generalist",
        }
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "kitchen-only" | "kitchen" => Ok(Self::KitchenOnly),
            "hall-only" | "hall" => Ok(Self::HallOnly),
            "all-round" | "allround" => Ok(Self::AllRound),
            "management" | "manager" => Ok(Self::Management),
            "chef" => Ok(Self::Chef),
            "generalist" | "" => Ok(Self::Generalist),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

/// Membre du personnel. Instantané immuable pendant un calcul.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub class: EmploymentClass,
    pub capability: Capability,
    #[serde(default)]
    pub hourly_wage: u32,
    /// Nombre maximal de services dans le mois.
    #[serde(default)]
    pub monthly_cap: u32,
    /// Jours de repos hebdomadaires fixes (0 à 2, salariés uniquement).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_off: Vec<Weekday>,
}

impl Worker {
    pub fn new<I: AsRef<str>, N: Into<String>>(
        id: I,
        name: N,
        class: EmploymentClass,
        capability: Capability,
    ) -> Self {
        Self {
            id: WorkerId::new(id),
            name: name.into(),
            class,
            capability,
            hourly_wage: 0,
            monthly_cap: 0,
            days_off: Vec::new(),
        }
    }

    pub fn with_cap(mut self, monthly_cap: u32) -> Self {
        self.monthly_cap = monthly_cap;
        self
    }

    pub fn with_days_off<I: IntoIterator<Item = Weekday>>(mut self, days: I) -> Self {
        self.days_off = days.into_iter().collect();
        self
    }

    pub fn is_core(&self) -> bool {
        self.class == EmploymentClass::Core
    }

    /// Les jours de repos fixes ne s'appliquent qu'aux salariés.
    pub fn is_day_off(&self, weekday: Weekday) -> bool {
        self.is_core() && self.days_off.contains(&weekday)
    }
}

/// Plage horaire d'un service. `end <= start` signifie que le service finit le lendemain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        if start == end {
            return Err("shift start and end cannot be equal".to_string());
        }
        Ok(Self { start, end })
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        let minutes = (self.end - self.start).num_minutes();
        if self.crosses_midnight() {
            minutes + 24 * 60
        } else {
            minutes
        }
    }
}

impl Default for ShiftWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::MIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityKind {
    Desired,
    Blocked,
}

impl FromStr for AvailabilityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desired" | "wish" | "want" => Ok(Self::Desired),
            "blocked" | "ng" | "unavailable" => Ok(Self::Blocked),
            other => Err(format!("unknown availability kind: {other}")),
        }
    }
}

/// Souhait ou indisponibilité déclaré par un membre du personnel pour une date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub id: RequestId,
    pub date: NaiveDate,
    pub worker: WorkerId,
    pub kind: AvailabilityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<ShiftWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AvailabilityEntry {
    pub fn new(date: NaiveDate, worker: WorkerId, kind: AvailabilityKind) -> Self {
        Self {
            id: RequestId::random(),
            date,
            worker,
            kind,
            window: None,
            note: None,
        }
    }

    pub fn desired(date: NaiveDate, worker: WorkerId) -> Self {
        Self::new(date, worker, AvailabilityKind::Desired)
    }

    pub fn blocked(date: NaiveDate, worker: WorkerId) -> Self {
        Self::new(date, worker, AvailabilityKind::Blocked)
    }
}

/// Origine d'une affectation : saisie manuelle ou proposée par le moteur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Manual,
    Auto,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Manual => "manual",
            Provenance::Auto => "auto",
        }
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" | "" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown provenance: {other}")),
        }
    }
}

/// Affectation d'un membre du personnel à un service d'une date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub date: NaiveDate,
    pub worker: WorkerId,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub provenance: Provenance,
}

impl Assignment {
    pub fn new(
        date: NaiveDate,
        worker: WorkerId,
        window: ShiftWindow,
        provenance: Provenance,
    ) -> Self {
        Self {
            date,
            worker,
            start: window.start,
            end: window.end,
            provenance,
        }
    }

    pub fn manual(date: NaiveDate, worker: WorkerId, window: ShiftWindow) -> Self {
        Self::new(date, worker, window, Provenance::Manual)
    }

    pub fn auto(date: NaiveDate, worker: WorkerId, window: ShiftWindow) -> Self {
        Self::new(date, worker, window, Provenance::Auto)
    }

    /// Clé d'unicité (date, personne).
    pub fn key(&self) -> (NaiveDate, &WorkerId) {
        (self.date, &self.worker)
    }
}

/// Effectif complet
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Roster {
    pub workers: Vec<Worker>,
}

impl Roster {
    pub fn new(workers: Vec<Worker>) -> Self {
        Self { workers }
    }
    pub fn find_worker_by_id<'a>(&'a self, id: &WorkerId) -> Option<&'a Worker> {
        self.workers.iter().find(|w| &w.id == id)
    }
}
