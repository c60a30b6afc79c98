use crate::calendar::{is_weekend, HolidayCalendar, HolidaySource};
use crate::model::{Capability, ShiftWindow};
use crate::scheduler::SchedError;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Politique d'effectif : minimums par date, plage horaire par défaut, règle de renfort cuisine.
///
/// Tous les champs ont une valeur par défaut, un fichier partiel reste valide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffingPolicy {
    /// Effectif total minimal du lundi au jeudi.
    pub weekday_total_min: u32,
    /// Effectif total minimal du vendredi au dimanche.
    pub weekend_total_min: u32,
    /// Salariés minimum chaque jour.
    pub core_min: u32,
    /// Salariés minimum les jours « premium » (ven/sam/dim, fériés en semaine).
    pub premium_core_min: u32,
    pub kitchen_min: u32,
    pub hall_min: u32,
    /// Horaires attribués aux services proposés.
    pub shift: ShiftWindow,
    pub kitchen_backup: Option<BackupCoverage>,
    pub holidays: HolidaySource,
}

impl Default for StaffingPolicy {
    fn default() -> Self {
        Self {
            weekday_total_min: 5,
            weekend_total_min: 6,
            core_min: 2,
            premium_core_min: 3,
            kitchen_min: 2,
            hall_min: 3,
            shift: ShiftWindow::default(),
            kitchen_backup: Some(BackupCoverage::default()),
            holidays: HolidaySource::default(),
        }
    }
}

/// Renfort cuisine : un poste `fallback` ne compte en cuisine que si un
/// salarié du poste `relieved_by` est présent ce jour-là pour le relayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupCoverage {
    pub fallback: Capability,
    pub relieved_by: Capability,
}

impl Default for BackupCoverage {
    fn default() -> Self {
        Self {
            fallback: Capability::Management,
            relieved_by: Capability::Generalist,
        }
    }
}

/// Besoins d'une date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDemand {
    pub date: NaiveDate,
    pub total: u32,
    pub core: u32,
    pub kitchen: u32,
    pub hall: u32,
    pub premium: bool,
    pub holiday: Option<String>,
}

impl StaffingPolicy {
    pub fn validate(&self) -> Result<(), SchedError> {
        if self.weekday_total_min == 0 || self.weekend_total_min == 0 {
            return Err(SchedError::InvalidPolicy("total minimums must be > 0"));
        }
        if self.premium_core_min < self.core_min {
            return Err(SchedError::InvalidPolicy(
                "premium core minimum must be >= baseline core minimum",
            ));
        }
        if self.shift.start == self.shift.end {
            return Err(SchedError::InvalidPolicy("shift start and end cannot be equal"));
        }
        if let Some(backup) = self.kitchen_backup {
            if backup.fallback == backup.relieved_by {
                return Err(SchedError::InvalidPolicy(
                    "backup fallback and relief capabilities must differ",
                ));
            }
        }
        let total = self.weekday_total_min.min(self.weekend_total_min);
        if self.kitchen_min + self.hall_min > total {
            tracing::warn!(
                kitchen_min = self.kitchen_min,
                hall_min = self.hall_min,
                total_min = total,
                "kitchen + hall minimums exceed the total minimum; sub-minimums may stay unmet"
            );
        }
        Ok(())
    }

    pub fn total_min(&self, date: NaiveDate) -> u32 {
        if is_weekend(date) {
            self.weekend_total_min
        } else {
            self.weekday_total_min
        }
    }

    pub fn demand_for(&self, date: NaiveDate, holidays: &dyn HolidayCalendar) -> DayDemand {
        let holiday = holidays.holiday_name(date);
        let premium = premium_rank(date, holiday.is_some()).is_some();
        DayDemand {
            date,
            total: self.total_min(date),
            core: if premium {
                self.premium_core_min
            } else {
                self.core_min
            },
            kitchen: self.kitchen_min,
            hall: self.hall_min,
            premium,
            holiday,
        }
    }
}

/// Rang de traitement d'un jour premium : vendredis, samedis, dimanches,
/// puis fériés du lundi au jeudi (un férié de week-end n'est pas compté deux fois).
pub fn premium_rank(date: NaiveDate, is_holiday: bool) -> Option<u8> {
    match date.weekday() {
        Weekday::Fri => Some(0),
        Weekday::Sat => Some(1),
        Weekday::Sun => Some(2),
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu if is_holiday => Some(3),
        _ => None,
    }
}

pub fn load_policy_from_file<P: AsRef<Path>>(path: P) -> Result<StaffingPolicy> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading policy {}", path.display()))?;
    let policy: StaffingPolicy = serde_json::from_slice(&data)
        .with_context(|| format!("parsing policy {}", path.display()))?;
    policy.validate()?;
    Ok(policy)
}

pub fn export_policy_json<P: AsRef<Path>>(path: P, policy: &StaffingPolicy) -> Result<()> {
    let json = serde_json::to_string_pretty(policy)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::NoHolidays;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekday_and_weekend_demand() {
        let policy = StaffingPolicy::default();
        let monday = policy.demand_for(d(2025, 3, 10), &NoHolidays);
        assert_eq!((monday.total, monday.core, monday.kitchen, monday.hall), (5, 2, 2, 3));
        assert!(!monday.premium);

        let friday = policy.demand_for(d(2025, 3, 14), &NoHolidays);
        assert_eq!((friday.total, friday.core), (6, 3));
        assert!(friday.premium);
    }

    #[test]
    fn weekday_holiday_raises_core_but_not_total() {
        let policy = StaffingPolicy::default();
        let holiday = |date: NaiveDate| (date == d(2025, 3, 20)).then(|| "Equinox".to_string());
        let thursday = policy.demand_for(d(2025, 3, 20), &holiday);
        assert_eq!((thursday.total, thursday.core), (5, 3));
        assert_eq!(thursday.holiday.as_deref(), Some("Equinox"));
    }

    #[test]
    fn premium_rank_orders_fri_sat_sun_holiday() {
        assert_eq!(premium_rank(d(2025, 3, 14), false), Some(0));
        assert_eq!(premium_rank(d(2025, 3, 15), false), Some(1));
        assert_eq!(premium_rank(d(2025, 3, 16), true), Some(2));
        assert_eq!(premium_rank(d(2025, 3, 20), true), Some(3));
        assert_eq!(premium_rank(d(2025, 3, 20), false), None);
    }

    #[test]
    fn partial_policy_file_gets_defaults() {
        let policy: StaffingPolicy =
            serde_json::from_str(r#"{ "weekend_total_min": 7, "holidays": { "kind": "none" } }"#)
                .unwrap();
        assert_eq!(policy.weekend_total_min, 7);
        assert_eq!(policy.weekday_total_min, 5);
        assert_eq!(policy.holidays, HolidaySource::None);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn invalid_policy_rejected() {
        let policy = StaffingPolicy {
            core_min: 3,
            premium_core_min: 2,
            ..StaffingPolicy::default()
        };
        assert!(matches!(policy.validate(), Err(SchedError::InvalidPolicy(_))));
    }
}
