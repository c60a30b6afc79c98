use crate::calendar::TargetMonth;
use crate::merge::merge_assignments;
use crate::model::{Assignment, AvailabilityEntry, Roster, Worker};
use crate::scheduler::Proposal;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Version courante du format de fichier.
pub const SCHEMA_VERSION: u32 = 2;

/// Document persisté : effectif, affectations confirmées, souhaits/indisponibilités.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ledger {
    /// Absent dans les fichiers v1.
    #[serde(default = "legacy_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub workers: Vec<Worker>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub availability: Vec<AvailabilityEntry>,
}

fn legacy_version() -> u32 {
    1
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            workers: Vec::new(),
            assignments: Vec::new(),
            availability: Vec::new(),
        }
    }
}

impl Ledger {
    /// Instantané de l'effectif pour le moteur.
    pub fn roster(&self) -> Roster {
        Roster::new(self.workers.clone())
    }

    /// Affectations du mois (filtre par plage de dates).
    pub fn assignments_in(&self, month: TargetMonth) -> Vec<Assignment> {
        self.assignments
            .iter()
            .filter(|a| month.contains(a.date))
            .cloned()
            .collect()
    }

    pub fn availability_in(&self, month: TargetMonth) -> Vec<AvailabilityEntry> {
        self.availability
            .iter()
            .filter(|e| month.contains(e.date))
            .cloned()
            .collect()
    }

    /// Ajoute la proposition aux affectations confirmées, dernier enregistrement gagnant.
    pub fn commit(&mut self, proposal: &Proposal) {
        self.assignments = merge_assignments(&self.assignments, &proposal.assignments);
    }

    /// Remplace un membre existant (même identifiant) ou l'ajoute.
    pub fn upsert_workers(&mut self, workers: Vec<Worker>) {
        for worker in workers {
            match self.workers.iter_mut().find(|w| w.id == worker.id) {
                Some(slot) => *slot = worker,
                None => self.workers.push(worker),
            }
        }
    }

    /// Ajoute des souhaits / indisponibilités. Une entrée de même identifiant,
    /// ou portant sur la même (date, personne, nature), remplace l'ancienne.
    /// Renvoie le nombre d'entrées réellement nouvelles.
    pub fn add_availability(&mut self, entries: Vec<AvailabilityEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            let existing = self.availability.iter_mut().find(|e| {
                e.id == entry.id
                    || (e.date == entry.date && e.worker == entry.worker && e.kind == entry.kind)
            });
            match existing {
                Some(slot) => *slot = entry,
                None => {
                    self.availability.push(entry);
                    added += 1;
                }
            }
        }
        added
    }

    fn migrate(&mut self) {
        if self.schema_version < SCHEMA_VERSION {
            tracing::info!(
                from = self.schema_version,
                to = SCHEMA_VERSION,
                "upgrading ledger schema"
            );
            self.schema_version = SCHEMA_VERSION;
        }
    }
}

pub trait Storage {
    /// Charge le document depuis un support.
    fn load(&self) -> anyhow::Result<Ledger>;
    /// Sauvegarde de manière atomique.
    fn save(&self, ledger: &Ledger) -> anyhow::Result<()>;
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Document vide si le fichier n'existe pas encore.
    pub fn load_or_default(&self) -> anyhow::Result<Ledger> {
        if self.path.exists() {
            self.load()
        } else {
            Ok(Ledger::default())
        }
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Ledger> {
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let mut ledger: Ledger =
            serde_json::from_slice(&data).with_context(|| "parsing ledger.json")?;
        ledger.migrate();
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(ledger)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }
}
