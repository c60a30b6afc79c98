#![forbid(unsafe_code)]
use anyhow::Result;
use roulement::{
    io,
    policy::{export_policy_json, load_policy_from_file, StaffingPolicy},
    scheduler::{Scheduler, Shortfall},
    storage::{JsonStorage, Storage},
    TargetMonth,
};
use clap::{Parser, Subcommand};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de complétion des plannings mensuels (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du registre (effectif, affectations, souhaits)
    #[arg(long, global = true, default_value = "ledger.json")]
    ledger: String,

    /// Fichier JSON de politique d'effectif (valeurs par défaut sinon)
    #[arg(long, global = true)]
    policy: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Importer l'effectif depuis un CSV
    ImportWorkers {
        #[arg(long)]
        csv: String,
    },

    /// Importer des souhaits / indisponibilités depuis un CSV
    ImportAvailability {
        #[arg(long)]
        csv: String,
    },

    /// Importer des affectations confirmées depuis un CSV
    ImportAssignments {
        #[arg(long)]
        csv: String,
    },

    /// Écrire la politique par défaut dans un fichier
    InitPolicy {
        #[arg(long)]
        out: String,
    },

    /// Proposer les affectations manquantes du mois
    Propose {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        out_csv: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        /// Export CSV des manques restants
        #[arg(long)]
        shortfall_csv: Option<String>,
        /// Ajouter la proposition au registre
        #[arg(long)]
        commit: bool,
    },

    /// Afficher les manques du mois sans rien proposer
    Shortfall {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },

    /// Vérifier les invariants des affectations du mois
    Check {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Lister et optionnellement exporter les affectations du mois
    List {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },
}

fn print_shortfalls(shortfalls: &[Shortfall]) {
    for s in shortfalls {
        println!(
            "{} | total -{} | core -{} | kitchen -{} | hall -{}",
            s.date, s.missing_total, s.missing_core, s.missing_kitchen, s.missing_hall
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let policy = match &cli.policy {
        Some(path) => load_policy_from_file(path)?,
        None => StaffingPolicy::default(),
    };
    let storage = JsonStorage::open(&cli.ledger)?;
    let mut ledger = storage.load_or_default()?;

    let code = match cli.cmd {
        Commands::ImportWorkers { csv } => {
            let workers = io::import_workers_csv(csv)?;
            println!("{} worker(s) imported", workers.len());
            ledger.upsert_workers(workers);
            storage.save(&ledger)?;
            0
        }
        Commands::ImportAvailability { csv } => {
            let entries = io::import_availability_csv(csv)?;
            let read = entries.len();
            let added = ledger.add_availability(entries);
            println!(
                "{read} availability entr(ies) read, {added} new, {} updated",
                read - added
            );
            storage.save(&ledger)?;
            0
        }
        Commands::ImportAssignments { csv } => {
            let assignments = io::import_assignments_csv(csv, policy.shift)?;
            println!("{} assignment(s) imported", assignments.len());
            ledger.assignments = roulement::merge_assignments(&ledger.assignments, &assignments);
            storage.save(&ledger)?;
            0
        }
        Commands::InitPolicy { out } => {
            export_policy_json(out, &policy)?;
            0
        }
        Commands::Propose {
            year,
            month,
            out_csv,
            out_json,
            shortfall_csv,
            commit,
        } => {
            let target = TargetMonth::new(year, month)?;
            let scheduler = Scheduler::new(ledger.roster(), policy)?;
            let confirmed = ledger.assignments_in(target);
            let availability = ledger.availability_in(target);

            let before = scheduler.assess(year, month, &confirmed)?;
            let proposal = scheduler.propose(year, month, &confirmed, &availability)?;

            if let Some(path) = out_csv {
                io::export_assignments_csv(path, scheduler.roster(), &proposal.assignments)?;
            }
            if let Some(path) = out_json {
                io::export_assignments_json(path, &proposal.assignments)?;
            }
            if let Some(path) = shortfall_csv {
                io::export_shortfalls_csv(path, &proposal.shortfalls)?;
            }

            if proposal.is_empty() {
                if before.is_empty() {
                    println!("OK: {target} already meets every minimum");
                } else {
                    eprintln!(
                        "{} date(s) short but no eligible worker left (caps, blocked dates, days off)",
                        before.len()
                    );
                }
            } else {
                for a in &proposal.assignments {
                    let name = scheduler
                        .worker(&a.worker)
                        .map(|w| w.name.as_str())
                        .unwrap_or("-");
                    println!(
                        "{} | {} {} | {}-{}",
                        a.date,
                        a.worker,
                        name,
                        a.start.format("%H:%M"),
                        a.end.format("%H:%M")
                    );
                }
                println!("{} assignment(s) proposed", proposal.len());
            }

            if commit && !proposal.is_empty() {
                ledger.commit(&proposal);
                storage.save(&ledger)?;
                println!("proposal committed to {}", cli.ledger);
            }

            if proposal.fully_covered() {
                0
            } else {
                eprintln!("{} date(s) still short after allocation", proposal.shortfalls.len());
                print_shortfalls(&proposal.shortfalls);
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
        Commands::Shortfall { year, month } => {
            let target = TargetMonth::new(year, month)?;
            let scheduler = Scheduler::new(ledger.roster(), policy)?;
            let shortfalls = scheduler.assess(year, month, &ledger.assignments_in(target))?;
            if shortfalls.is_empty() {
                println!("OK: no shortfall");
                0
            } else {
                print_shortfalls(&shortfalls);
                2
            }
        }
        Commands::Check {
            year,
            month,
            report,
        } => {
            let target = TargetMonth::new(year, month)?;
            let scheduler = Scheduler::new(ledger.roster(), policy)?;
            let conflicts = scheduler.audit(
                year,
                month,
                &ledger.assignments_in(target),
                &ledger.availability_in(target),
            )?;
            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["worker_id", "date", "kind"])?;
                    for c in &conflicts {
                        let date = c.date.map(|d| d.to_string()).unwrap_or_default();
                        w.write_record([c.worker.as_str(), date.as_str(), c.kind.as_str()])?;
                    }
                    w.flush()?;
                }
                2
            }
        }
        Commands::List {
            year,
            month,
            out_json,
            out_csv,
        } => {
            let target = TargetMonth::new(year, month)?;
            let roster = ledger.roster();
            let assignments = ledger.assignments_in(target);
            if let Some(path) = out_json {
                io::export_assignments_json(path, &assignments)?;
            }
            if let Some(path) = out_csv {
                io::export_assignments_csv(path, &roster, &assignments)?;
            }
            // impression compacte
            for a in &assignments {
                let name = roster
                    .find_worker_by_id(&a.worker)
                    .map(|w| w.name.as_str())
                    .unwrap_or("-");
                println!(
                    "{} | {} {} | {}",
                    a.date,
                    a.worker,
                    name,
                    a.provenance.as_str()
                );
            }
            0
        }
    };

    std::process::exit(code);
}
