use crate::model::{
    Assignment, AvailabilityEntry, AvailabilityKind, Capability, EmploymentClass, Provenance,
    RequestId, Roster, ShiftWindow, Worker, WorkerId,
};
use crate::scheduler::Shortfall;
use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveTime, Weekday};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Plafond mensuel quand ni `monthly_cap` ni `weekly_cap` ne sont présents.
pub const DEFAULT_MONTHLY_CAP: u32 = 12;

/// Index des colonnes par nom d'en-tête : l'ordre et la présence des colonnes varient selon les fichiers.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), i))
                .collect(),
        )
    }

    fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Valeur non vide de la colonne, ou `None`.
    fn get<'r>(&self, rec: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.0
            .get(name)
            .and_then(|&i| rec.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn require<'r>(&self, rec: &'r StringRecord, name: &str) -> anyhow::Result<&'r str> {
        self.get(rec, name).with_context(|| format!("missing {name}"))
    }
}

/// Import de l'effectif depuis CSV.
///
/// En-tête : `worker_id,name,class,capability[,hourly_wage][,monthly_cap][,weekly_cap][,dayoff1][,dayoff2]`.
/// Une ligne invalide est ignorée (avec un avertissement), le reste du fichier est chargé.
pub fn import_workers_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Worker>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let cols = Columns::new(rdr.headers()?);
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        match parse_worker(&cols, &rec) {
            Ok(worker) => out.push(worker),
            Err(err) => tracing::warn!(row = line + 1, "skipping worker row: {err:#}"),
        }
    }
    Ok(out)
}

fn parse_worker(cols: &Columns, rec: &StringRecord) -> anyhow::Result<Worker> {
    let id = cols.require(rec, "worker_id")?;
    let name = cols.require(rec, "name")?;
    let class: EmploymentClass = cols
        .require(rec, "class")?
        .parse()
        .map_err(anyhow::Error::msg)?;
    let capability: Capability = cols
        .get(rec, "capability")
        .unwrap_or("")
        .parse()
        .map_err(anyhow::Error::msg)?;

    let mut worker = Worker::new(id, name, class, capability);
    worker.hourly_wage = cols
        .get(rec, "hourly_wage")
        .map_or(0, |raw| non_negative(raw, id, "hourly_wage"));
    worker.monthly_cap = if cols.has("monthly_cap") {
        cols.get(rec, "monthly_cap")
            .map_or(0, |raw| non_negative(raw, id, "monthly_cap"))
    } else if cols.has("weekly_cap") {
        cols.get(rec, "weekly_cap")
            .map_or(0, |raw| non_negative(raw, id, "weekly_cap"))
            .saturating_mul(4)
    } else {
        DEFAULT_MONTHLY_CAP
    };

    if class == EmploymentClass::Core {
        for col in ["dayoff1", "dayoff2"] {
            let Some(raw) = cols.get(rec, col) else {
                continue;
            };
            match parse_weekday(raw) {
                Ok(day) if !worker.days_off.contains(&day) => worker.days_off.push(day),
                Ok(_) => {}
                Err(err) => tracing::warn!(worker = id, "ignoring {col}: {err:#}"),
            }
        }
    }
    Ok(worker)
}

/// Entier positif ou nul ; toute autre valeur vaut 0.
fn non_negative(raw: &str, id: &str, field: &str) -> u32 {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v.min(f64::from(u32::MAX)) as u32,
        _ => {
            tracing::warn!(worker = id, value = raw, "invalid {field}, using 0");
            0
        }
    }
}

/// `0`..`6` (lundi = 0) ou nom du jour (`mon`, `monday`, ...).
///
/// Les tableurs écrivent parfois `2.0` : un flottant entier est accepté,
/// `NaN`, une fraction ou une valeur hors bornes ne l'est pas.
fn parse_weekday(raw: &str) -> anyhow::Result<Weekday> {
    if let Ok(n) = raw.parse::<f64>() {
        if !n.is_finite() || n.fract() != 0.0 || !(0.0..=6.0).contains(&n) {
            bail!("weekday index out of range: {raw}");
        }
        return match n as u8 {
            0 => Ok(Weekday::Mon),
            1 => Ok(Weekday::Tue),
            2 => Ok(Weekday::Wed),
            3 => Ok(Weekday::Thu),
            4 => Ok(Weekday::Fri),
            5 => Ok(Weekday::Sat),
            _ => Ok(Weekday::Sun),
        };
    }
    raw.parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("invalid weekday: {raw}"))
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

/// `HH:MM` ou `HH:MM:SS` ; `24:00` désigne minuit en fin de journée.
fn parse_time(raw: &str) -> anyhow::Result<NaiveTime> {
    if raw == "24:00" || raw == "24:00:00" {
        return Ok(NaiveTime::MIN);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .with_context(|| format!("invalid time: {raw}"))
}

/// Import des souhaits / indisponibilités.
///
/// En-tête : `[request_id,]date,worker_id,kind[,start_time,end_time][,note]`.
/// Un identifiant est généré quand `request_id` est vide.
pub fn import_availability_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<AvailabilityEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let cols = Columns::new(rdr.headers()?);
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        match parse_availability(&cols, &rec) {
            Ok(entry) => out.push(entry),
            Err(err) => tracing::warn!(row = line + 1, "skipping availability row: {err:#}"),
        }
    }
    Ok(out)
}

fn parse_availability(cols: &Columns, rec: &StringRecord) -> anyhow::Result<AvailabilityEntry> {
    let date = parse_date(cols.require(rec, "date")?)?;
    let worker = WorkerId::new(cols.require(rec, "worker_id")?);
    let kind: AvailabilityKind = cols
        .require(rec, "kind")?
        .parse()
        .map_err(anyhow::Error::msg)?;

    let mut entry = AvailabilityEntry::new(date, worker, kind);
    if let Some(id) = cols.get(rec, "request_id") {
        entry.id = RequestId::new(id);
    }
    if let (Some(start), Some(end)) = (cols.get(rec, "start_time"), cols.get(rec, "end_time")) {
        let window = ShiftWindow::new(parse_time(start)?, parse_time(end)?).map_err(anyhow::Error::msg)?;
        entry.window = Some(window);
    }
    entry.note = cols.get(rec, "note").map(str::to_string);
    Ok(entry)
}

/// Import des affectations : en-tête `date,worker_id[,start_time,end_time][,provenance]`.
pub fn import_assignments_csv<P: AsRef<Path>>(
    path: P,
    default_window: ShiftWindow,
) -> anyhow::Result<Vec<Assignment>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let cols = Columns::new(rdr.headers()?);
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        match parse_assignment(&cols, &rec, default_window) {
            Ok(a) => out.push(a),
            Err(err) => tracing::warn!(row = line + 1, "skipping assignment row: {err:#}"),
        }
    }
    Ok(out)
}

fn parse_assignment(
    cols: &Columns,
    rec: &StringRecord,
    default_window: ShiftWindow,
) -> anyhow::Result<Assignment> {
    let date = parse_date(cols.require(rec, "date")?)?;
    let worker = WorkerId::new(cols.require(rec, "worker_id")?);
    let start = cols
        .get(rec, "start_time")
        .map(parse_time)
        .transpose()?
        .unwrap_or(default_window.start);
    let end = cols
        .get(rec, "end_time")
        .map(parse_time)
        .transpose()?
        .unwrap_or(default_window.end);
    let provenance: Provenance = cols
        .get(rec, "provenance")
        .unwrap_or("")
        .parse()
        .map_err(anyhow::Error::msg)?;
    Ok(Assignment {
        date,
        worker,
        start,
        end,
        provenance,
    })
}

/// Écrit les affectations en CSV : `date,worker_id,name,start_time,end_time,provenance`.
pub fn write_assignments_csv<W: Write>(
    out: W,
    roster: &Roster,
    assignments: &[Assignment],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record(["date", "worker_id", "name", "start_time", "end_time", "provenance"])?;
    for a in assignments {
        let name = roster
            .find_worker_by_id(&a.worker)
            .map(|worker| worker.name.as_str())
            .unwrap_or("");
        let date = a.date.format("%Y-%m-%d").to_string();
        let start = a.start.format("%H:%M").to_string();
        let end = a.end.format("%H:%M").to_string();
        w.write_record([
            date.as_str(),
            a.worker.as_str(),
            name,
            start.as_str(),
            end.as_str(),
            a.provenance.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    roster: &Roster,
    assignments: &[Assignment],
) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_assignments_csv(file, roster, assignments)
}

/// Export JSON des affectations (jolie mise en forme)
pub fn export_assignments_json<P: AsRef<Path>>(
    path: P,
    assignments: &[Assignment],
) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(assignments)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV des manques : `date,missing_total,missing_core,missing_kitchen,missing_hall`.
pub fn export_shortfalls_csv<P: AsRef<Path>>(path: P, shortfalls: &[Shortfall]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "date",
        "missing_total",
        "missing_core",
        "missing_kitchen",
        "missing_hall",
    ])?;
    let mut bufs = [
        itoa::Buffer::new(),
        itoa::Buffer::new(),
        itoa::Buffer::new(),
        itoa::Buffer::new(),
    ];
    for s in shortfalls {
        let date = s.date.format("%Y-%m-%d").to_string();
        let [total, core, kitchen, hall] = &mut bufs;
        w.write_record([
            date.as_str(),
            total.format(s.missing_total),
            core.format(s.missing_core),
            kitchen.format(s.missing_kitchen),
            hall.format(s.missing_hall),
        ])?;
    }
    w.flush()?;
    Ok(())
}
