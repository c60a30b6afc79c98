#![forbid(unsafe_code)]
use chrono::{Datelike, NaiveDate, Weekday};
use roulement::{
    merge_assignments, Assignment, AvailabilityEntry, Capability, EmploymentClass, NoHolidays,
    Provenance, Roster, ShiftWindow, StaffingPolicy, Scheduler, TargetMonth, Worker, WorkerId,
};
use std::collections::{BTreeMap, BTreeSet};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn core(id: &str, capability: Capability, cap: u32) -> Worker {
    Worker::new(id, id, EmploymentClass::Core, capability).with_cap(cap)
}

fn flex(id: &str, capability: Capability, cap: u32) -> Worker {
    Worker::new(id, id, EmploymentClass::Flexible, capability).with_cap(cap)
}

fn scheduler(workers: Vec<Worker>) -> Scheduler {
    Scheduler::new(Roster::new(workers), StaffingPolicy::default())
        .unwrap()
        .with_holidays(NoHolidays)
}

/// Effectif suffisant pour couvrir février 2026 sans jour férié.
fn roomy_roster() -> Vec<Worker> {
    let mut workers: Vec<Worker> = (1..=4)
        .map(|i| core(&format!("C{i}"), Capability::Generalist, 25))
        .collect();
    workers.extend((1..=6).map(|i| flex(&format!("P{i}"), Capability::AllRound, 20)));
    workers
}

fn counts(assignments: &[Assignment]) -> BTreeMap<&WorkerId, u32> {
    let mut out = BTreeMap::new();
    for a in assignments {
        *out.entry(&a.worker).or_insert(0) += 1;
    }
    out
}

fn assert_no_double_booking(confirmed: &[Assignment], proposed: &[Assignment]) {
    let mut seen = BTreeSet::new();
    for a in confirmed.iter().chain(proposed) {
        assert!(seen.insert(a.key()), "double booking: {} {}", a.date, a.worker);
    }
}

#[test]
fn february_reaches_every_minimum_when_feasible() {
    let s = scheduler(roomy_roster());
    let proposal = s.propose(2026, 2, &[], &[]).unwrap();

    assert!(proposal.fully_covered(), "{:?}", proposal.shortfalls);
    assert_no_double_booking(&[], &proposal.assignments);

    let by_date = proposal.assignments.iter().fold(
        BTreeMap::<NaiveDate, Vec<&Assignment>>::new(),
        |mut acc, a| {
            acc.entry(a.date).or_default().push(a);
            acc
        },
    );
    for date in TargetMonth::new(2026, 2).unwrap().dates() {
        let today = &by_date[&date];
        let core_count = today
            .iter()
            .filter(|a| a.worker.as_str().starts_with('C'))
            .count();
        let weekend = matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun);
        assert_eq!(today.len(), if weekend { 6 } else { 5 }, "{date}");
        assert_eq!(core_count, if weekend { 3 } else { 2 }, "{date}");
    }

    for a in &proposal.assignments {
        assert_eq!(a.provenance, Provenance::Auto);
        assert_eq!(a.start, ShiftWindow::default().start);
    }
}

#[test]
fn february_small_roster_never_exceeds_caps() {
    let mut workers: Vec<Worker> = (1..=3)
        .map(|i| core(&format!("C{i}"), Capability::Generalist, 20))
        .collect();
    workers.extend((1..=5).map(|i| flex(&format!("P{i}"), Capability::AllRound, 15)));
    let s = scheduler(workers.clone());

    let proposal = s.propose(2026, 2, &[], &[]).unwrap();
    let counts = counts(&proposal.assignments);
    for w in &workers {
        let used = counts.get(&w.id).copied().unwrap_or(0);
        assert!(used <= w.monthly_cap, "{} over cap", w.id);
        // la demande du mois dépasse la capacité totale : tout le monde est au plafond
        assert_eq!(used, w.monthly_cap, "{} under-used", w.id);
    }
    assert!(!proposal.fully_covered());
    assert_no_double_booking(&[], &proposal.assignments);
}

#[test]
fn blocked_sole_cook_leaves_kitchen_short() {
    let workers = vec![
        core("S001", Capability::Chef, 25),
        core("S002", Capability::Generalist, 25),
        core("S003", Capability::Generalist, 25),
        flex("P001", Capability::HallOnly, 25),
        flex("P002", Capability::HallOnly, 25),
        flex("P003", Capability::HallOnly, 25),
    ];
    let s = scheduler(workers);
    let blocked_day = d(2025, 3, 10);
    let availability = vec![AvailabilityEntry::blocked(blocked_day, WorkerId::new("S001"))];

    let proposal = s.propose(2025, 3, &[], &availability).unwrap();

    assert!(!proposal
        .assignments
        .iter()
        .any(|a| a.date == blocked_day && a.worker.as_str() == "S001"));
    let short = proposal.shortfall_on(blocked_day).expect("shortfall reported");
    assert_eq!(short.missing_kitchen, 2);
    assert!(short.missing_total > 0);
}

#[test]
fn rerun_after_commit_proposes_nothing() {
    let s = scheduler(roomy_roster());
    let first = s.propose(2026, 2, &[], &[]).unwrap();
    assert!(!first.is_empty());

    let confirmed = merge_assignments(&[], &first.assignments);
    let second = s.propose(2026, 2, &confirmed, &[]).unwrap();
    assert!(second.is_empty());
    assert!(second.fully_covered());
}

#[test]
fn rerun_is_idempotent_even_when_stuck() {
    let workers = vec![
        core("S001", Capability::Chef, 10),
        core("S002", Capability::Generalist, 10),
        flex("P001", Capability::HallOnly, 8),
    ];
    let s = scheduler(workers);
    let availability = vec![AvailabilityEntry::blocked(d(2025, 3, 3), WorkerId::new("S002"))];
    let first = s.propose(2025, 3, &[], &availability).unwrap();
    assert!(!first.fully_covered());

    let second = s.propose(2025, 3, &first.assignments, &availability).unwrap();
    assert!(second.is_empty());
    assert_eq!(first.shortfalls, second.shortfalls);
}

#[test]
fn identical_inputs_give_identical_output() {
    let availability = vec![
        AvailabilityEntry::desired(d(2026, 2, 3), WorkerId::new("P4")),
        AvailabilityEntry::blocked(d(2026, 2, 4), WorkerId::new("C1")),
    ];
    let a = scheduler(roomy_roster()).propose(2026, 2, &[], &availability).unwrap();
    let b = scheduler(roomy_roster()).propose(2026, 2, &[], &availability).unwrap();
    assert_eq!(a, b);
}

#[test]
fn desired_worker_is_picked_first() {
    let s = scheduler(roomy_roster());
    let date = d(2026, 2, 10);
    let availability = vec![AvailabilityEntry::desired(date, WorkerId::new("P6"))];
    let proposal = s.propose(2026, 2, &[], &availability).unwrap();
    assert!(proposal
        .assignments
        .iter()
        .any(|a| a.date == date && a.worker.as_str() == "P6"));
}

#[test]
fn fixed_days_off_and_blocks_are_respected() {
    let mut workers = roomy_roster();
    workers[0] = workers[0].clone().with_days_off([Weekday::Mon, Weekday::Thu]);
    // les jours de repos d'un vacataire sont ignorés
    workers[4] = workers[4].clone().with_days_off([Weekday::Mon]);
    let s = scheduler(workers);

    let blocked: Vec<AvailabilityEntry> = (1..=28)
        .filter(|day| day % 3 == 0)
        .map(|day| AvailabilityEntry::blocked(d(2026, 2, day), WorkerId::new("P2")))
        .collect();
    let proposal = s.propose(2026, 2, &[], &blocked).unwrap();

    for a in &proposal.assignments {
        if a.worker.as_str() == "C1" {
            assert!(!matches!(a.date.weekday(), Weekday::Mon | Weekday::Thu));
        }
        if a.worker.as_str() == "P2" {
            assert_ne!(a.date.day() % 3, 0, "blocked date {}", a.date);
        }
    }
    assert!(proposal
        .assignments
        .iter()
        .any(|a| a.worker.as_str() == "P1" && a.date.weekday() == Weekday::Mon));
    assert!(s
        .audit(2026, 2, &proposal.assignments, &blocked)
        .unwrap()
        .is_empty());
}

#[test]
fn confirmed_assignments_are_kept_and_counted() {
    let mut workers = roomy_roster();
    workers[5] = workers[5].clone().with_cap(1);
    let s = scheduler(workers);
    let window = ShiftWindow::default();
    let confirmed = vec![
        Assignment::manual(d(2026, 2, 2), WorkerId::new("C1"), window),
        Assignment::manual(d(2026, 2, 5), WorkerId::new("P2"), window),
        // hors du mois : ignorée
        Assignment::manual(d(2026, 1, 31), WorkerId::new("P3"), window),
    ];

    let proposal = s.propose(2026, 2, &confirmed, &[]).unwrap();
    assert_no_double_booking(&confirmed[..2], &proposal.assignments);
    // P2 a déjà son unique service du mois
    assert!(!proposal.assignments.iter().any(|a| a.worker.as_str() == "P2"));
    let on_second: Vec<_> = proposal
        .assignments
        .iter()
        .filter(|a| a.date == d(2026, 2, 2))
        .collect();
    assert_eq!(on_second.len(), 4);
}

#[test]
fn unknown_workers_do_not_count() {
    let s = scheduler(roomy_roster());
    let ghost = vec![Assignment::manual(
        d(2026, 2, 2),
        WorkerId::new("retired"),
        ShiftWindow::default(),
    )];
    let with_ghost = s.assess(2026, 2, &ghost).unwrap();
    let without = s.assess(2026, 2, &[]).unwrap();
    assert_eq!(with_ghost, without);
    assert_eq!(without.len(), 28);
}

#[test]
fn weekday_holiday_gets_third_core_worker() {
    let s = scheduler(roomy_roster())
        .with_holidays(|date: NaiveDate| (date == d(2026, 2, 11)).then(|| "Foundation".to_string()));
    let proposal = s.propose(2026, 2, &[], &[]).unwrap();
    let core_on_holiday = proposal
        .assignments
        .iter()
        .filter(|a| a.date == d(2026, 2, 11) && a.worker.as_str().starts_with('C'))
        .count();
    assert_eq!(core_on_holiday, 3);
    let total_on_holiday = proposal
        .assignments
        .iter()
        .filter(|a| a.date == d(2026, 2, 11))
        .count();
    assert_eq!(total_on_holiday, 5);
}

#[test]
fn manager_covers_kitchen_only_with_relief() {
    // Sans cuisinier : le gérant compte en cuisine si un salarié généraliste est là.
    let workers = vec![
        core("S001", Capability::Management, 31),
        core("S003", Capability::Generalist, 31),
        flex("P001", Capability::KitchenOnly, 31),
        flex("P002", Capability::HallOnly, 31),
        flex("P003", Capability::HallOnly, 31),
        flex("P004", Capability::HallOnly, 31),
    ];
    let s = scheduler(workers);
    let proposal = s.propose(2025, 3, &[], &[]).unwrap();
    let monday = d(2025, 3, 10);
    let short = proposal.shortfall_on(monday);
    // gérant + généraliste + cuisinier + 2 salle = 5, cuisine = gérant + cuisinier
    assert!(short.is_none(), "{short:?}");

    let without_relief = vec![
        core("S001", Capability::Management, 31),
        core("S002", Capability::HallOnly, 31),
        flex("P001", Capability::KitchenOnly, 31),
        flex("P002", Capability::HallOnly, 31),
        flex("P003", Capability::HallOnly, 31),
    ];
    let s = scheduler(without_relief);
    let proposal = s.propose(2025, 3, &[], &[]).unwrap();
    assert_eq!(proposal.shortfall_on(monday).map(|s| s.missing_kitchen), Some(1));
}

#[test]
fn invalid_month_is_an_error() {
    let s = scheduler(roomy_roster());
    assert!(s.propose(2026, 13, &[], &[]).is_err());
    assert!(s.assess(2026, 0, &[]).is_err());
}

#[test]
fn premium_core_goes_to_fridays_before_weekends() {
    // 62 services de base pour 63 de capacité : un seul troisième salarié possible
    let workers: Vec<Worker> = (1..=3)
        .map(|i| core(&format!("C{i}"), Capability::Generalist, 21))
        .collect();
    let s = scheduler(workers);
    let proposal = s.propose(2025, 3, &[], &[]).unwrap();

    let mut per_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for a in &proposal.assignments {
        *per_date.entry(a.date).or_insert(0) += 1;
    }
    let with_three: Vec<NaiveDate> = per_date
        .iter()
        .filter(|(_, &n)| n == 3)
        .map(|(&date, _)| date)
        .collect();
    assert_eq!(with_three, vec![d(2025, 3, 7)]);
    assert_eq!(proposal.assignments.len(), 63);
}
