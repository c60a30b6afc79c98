//! Calendrier : dates d'un mois cible, convention de week-end, jours fériés.

use crate::scheduler::SchedError;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mois cible d'un calcul (année + mois validés).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetMonth {
    year: i32,
    month: u32,
}

impl TargetMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, SchedError> {
        if !(1..=12).contains(&month) {
            return Err(SchedError::InvalidMonth { year, month });
        }
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(SchedError::InvalidMonth { year, month })?;
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // validé par `new`
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// Toutes les dates du mois, dans l'ordre.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.first_day()
            .iter_days()
            .take_while(|d| d.month() == self.month && d.year() == self.year)
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for TargetMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Vendredi, samedi et dimanche comptent comme week-end.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// Recherche de jour férié : fonction pure date -> nom.
pub trait HolidayCalendar {
    fn holiday_name(&self, date: NaiveDate) -> Option<String>;

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_name(date).is_some()
    }
}

impl<F> HolidayCalendar for F
where
    F: Fn(NaiveDate) -> Option<String>,
{
    fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        self(date)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn holiday_name(&self, _date: NaiveDate) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Liste explicite de jours fériés (fichier de configuration).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayTable {
    entries: BTreeMap<NaiveDate, String>,
}

impl HolidayTable {
    pub fn new<I: IntoIterator<Item = Holiday>>(holidays: I) -> Self {
        Self {
            entries: holidays.into_iter().map(|h| (h.date, h.name)).collect(),
        }
    }
}

impl HolidayCalendar for HolidayTable {
    fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        self.entries.get(&date).cloned()
    }
}

/// Jours fériés japonais (loi en vigueur, années 2016 à 2099).
///
/// Jours fixes, « Happy Monday », équinoxes (approximation astronomique),
/// jour de substitution quand un férié tombe un dimanche et jour
/// « citoyen » pris en sandwich entre deux fériés.
#[derive(Debug, Default, Clone, Copy)]
pub struct JapaneseHolidays;

impl JapaneseHolidays {
    const FIRST_YEAR: i32 = 2016;
    const LAST_YEAR: i32 = 2099;

    fn statutory(date: NaiveDate) -> Option<&'static str> {
        let year = date.year();
        if !(Self::FIRST_YEAR..=Self::LAST_YEAR).contains(&year) {
            return None;
        }
        let day = date.day();
        let monday = |n: u8| nth_monday(year, date.month(), n) == Some(date);

        match date.month() {
            1 if day == 1 => Some("New Year's Day"),
            1 if monday(2) => Some("Coming of Age Day"),
            2 if day == 11 => Some("National Foundation Day"),
            2 if day == 23 && year >= 2020 => Some("Emperor's Birthday"),
            3 if day == vernal_equinox_day(year) => Some("Vernal Equinox Day"),
            4 if day == 29 => Some("Showa Day"),
            5 if day == 1 && year == 2019 => Some("Enthronement Day"),
            5 if day == 3 => Some("Constitution Memorial Day"),
            5 if day == 4 => Some("Greenery Day"),
            5 if day == 5 => Some("Children's Day"),
            7 if marine_day(year) == Some(date) => Some("Marine Day"),
            7 if sports_day(year) == Some(date) => Some("Sports Day"),
            8 if mountain_day(year) == Some(date) => Some("Mountain Day"),
            9 if monday(3) => Some("Respect for the Aged Day"),
            9 if day == autumnal_equinox_day(year) => Some("Autumnal Equinox Day"),
            10 if day == 22 && year == 2019 => Some("Enthronement Ceremony Day"),
            10 if sports_day(year) == Some(date) => Some("Sports Day"),
            11 if day == 3 => Some("Culture Day"),
            11 if day == 23 => Some("Labour Thanksgiving Day"),
            12 if day == 23 && year <= 2018 => Some("Emperor's Birthday"),
            _ => None,
        }
    }
}

impl HolidayCalendar for JapaneseHolidays {
    fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        if let Some(name) = Self::statutory(date) {
            return Some(name.to_string());
        }
        let prev = date.checked_sub_days(Days::new(1))?;
        let next = date.checked_add_days(Days::new(1))?;

        if date.weekday() != Weekday::Sun
            && Self::statutory(prev).is_some()
            && Self::statutory(next).is_some()
        {
            return Some("Citizens' Holiday".to_string());
        }

        // substitution : on remonte la suite de fériés jusqu'à un dimanche
        let mut cursor = prev;
        while Self::statutory(cursor).is_some() {
            if cursor.weekday() == Weekday::Sun {
                return Some("Substitute Holiday".to_string());
            }
            cursor = cursor.checked_sub_days(Days::new(1))?;
        }
        None
    }
}

fn nth_monday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, n)
}

fn marine_day(year: i32) -> Option<NaiveDate> {
    match year {
        2020 => NaiveDate::from_ymd_opt(2020, 7, 23),
        2021 => NaiveDate::from_ymd_opt(2021, 7, 22),
        _ => nth_monday(year, 7, 3),
    }
}

fn sports_day(year: i32) -> Option<NaiveDate> {
    match year {
        2020 => NaiveDate::from_ymd_opt(2020, 7, 24),
        2021 => NaiveDate::from_ymd_opt(2021, 7, 23),
        _ => nth_monday(year, 10, 2),
    }
}

fn mountain_day(year: i32) -> Option<NaiveDate> {
    match year {
        2020 => NaiveDate::from_ymd_opt(2020, 8, 10),
        2021 => NaiveDate::from_ymd_opt(2021, 8, 8),
        _ => NaiveDate::from_ymd_opt(year, 8, 11),
    }
}

fn equinox_day(base: f64, year: i32) -> u32 {
    let offset = f64::from(year - 1980);
    let leap_correction = (year - 1980).div_euclid(4);
    ((base + 0.242194 * offset).floor() as i32 - leap_correction) as u32
}

fn vernal_equinox_day(year: i32) -> u32 {
    equinox_day(20.8431, year)
}

fn autumnal_equinox_day(year: i32) -> u32 {
    equinox_day(23.2488, year)
}

/// Source de jours fériés sélectionnable depuis la configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HolidaySource {
    None,
    #[default]
    Japan,
    Table {
        #[serde(default)]
        holidays: Vec<Holiday>,
    },
}

impl HolidaySource {
    /// Construit le calendrier correspondant.
    pub fn calendar(&self) -> Box<dyn HolidayCalendar + Send + Sync> {
        match self {
            HolidaySource::None => Box::new(NoHolidays),
            HolidaySource::Japan => Box::new(JapaneseHolidays),
            HolidaySource::Table { holidays } => Box::new(HolidayTable::new(holidays.clone())),
        }
    }
}
