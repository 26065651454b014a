//! CLI smoke tests - each test runs the binary against its own data directory

mod common;

use common::{materiel, TestEnv};
use predicates::prelude::*;
use std::fs;

// ============================================================================
// Basics
// ============================================================================

#[test]
fn test_help_lists_commands() {
    materiel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("equipment"))
        .stdout(predicate::str::contains("incoming"))
        .stdout(predicate::str::contains("ledger"));
}

#[test]
fn test_completions_bash() {
    materiel()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("materiel"));
}

#[test]
fn test_empty_inventory_lists_nothing() {
    let env = TestEnv::new();
    env.materiel()
        .args(["equipment", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No equipment found."));
}

// ============================================================================
// Equipment and people
// ============================================================================

#[test]
fn test_equipment_new_and_list() {
    let env = TestEnv::new();
    env.materiel()
        .args(["equipment", "new", "--name", "Cordless drill", "--category", "Tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created equipment"));

    env.materiel()
        .args(["equipment", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cordless drill"))
        .stdout(predicate::str::contains("1 item"));

    assert!(env.data_dir().join("equipment.json").exists());
}

#[test]
fn test_short_ids_are_stable_across_runs() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let ladder = env.equipment("Ladder");
    assert_eq!(drill, "MAT@1");
    assert_eq!(ladder, "MAT@2");

    env.materiel()
        .args(["equipment", "show", "MAT@2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ladder"));
}

#[test]
fn test_unknown_reference_fails() {
    let env = TestEnv::new();
    env.materiel()
        .args(["equipment", "show", "MAT@9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No MAT record matches"));
}

#[test]
fn test_equipment_delete_needs_yes_without_terminal() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");

    env.materiel()
        .args(["equipment", "delete", &drill])
        .assert()
        .success();
    assert_eq!(env.stdout(&["equipment", "list", "--count"]).trim(), "1");

    env.materiel()
        .args(["equipment", "delete", &drill, "--yes"])
        .assert()
        .success();
    assert_eq!(env.stdout(&["equipment", "list", "--count"]).trim(), "0");
}

#[test]
fn test_person_roles_filter() {
    let env = TestEnv::new();
    env.create(&["person", "new", "--first", "Ana", "--last", "Lima", "--role", "mechanic"]);
    env.person("Bo", "Berg");

    assert_eq!(env.stdout(&["person", "list", "--role", "mechanic", "--count"]).trim(), "1");
    assert_eq!(env.stdout(&["person", "list", "--count"]).trim(), "2");
}

#[test]
fn test_person_dupes_and_merge() {
    let env = TestEnv::new();
    let first = env.person("Ana", "Lima");
    let second = env.person("ana", "LIMA");
    env.person("Bo", "Berg");

    env.materiel()
        .args(["person", "dupes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lima_ana"));

    env.materiel()
        .args(["person", "merge", &first, &second, "--yes"])
        .assert()
        .success();
    assert_eq!(env.stdout(&["person", "list", "--count"]).trim(), "2");
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn test_loan_changes_equipment_status() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let ana = env.person("Ana", "Lima");
    let loan = env.create(&["loan", "new", "-e", &drill, "-p", &ana, "--until", "2099-01-01"]);
    assert_eq!(loan, "LOAN@1");

    assert_eq!(
        env.stdout(&["equipment", "list", "--status", "on-loan", "--count"]).trim(),
        "1"
    );

    env.materiel()
        .args(["loan", "return", &loan])
        .assert()
        .success()
        .stdout(predicate::str::contains("returned"));
    assert_eq!(
        env.stdout(&["equipment", "list", "--status", "available", "--count"]).trim(),
        "1"
    );

    env.materiel()
        .args(["loan", "return", &loan])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already closed"));
}

#[test]
fn test_loan_list_overdue() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let ladder = env.equipment("Ladder");
    let ana = env.person("Ana", "Lima");
    env.create(&[
        "loan", "new", "-e", &drill, "-p", &ana, "--start", "2020-01-01", "--until", "2020-01-10",
    ]);
    env.create(&["loan", "new", "-e", &ladder, "-p", &ana, "--until", "2099-01-01"]);

    assert_eq!(env.stdout(&["loan", "list", "--count"]).trim(), "2");
    assert_eq!(
        env.stdout(&["loan", "list", "--state", "overdue", "--count"]).trim(),
        "1"
    );
    env.materiel()
        .args(["loan", "list", "--state", "overdue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Drill"))
        .stdout(predicate::str::contains("Ladder").not());
}

#[test]
fn test_rental_payment_reaches_ledger_once() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let ana = env.person("Ana", "Lima");
    let rental = env.create(&[
        "rental", "new", "-e", &drill, "-r", &ana, "--until", "2099-01-01", "--pricing", "flat",
        "--price", "80",
    ]);

    env.materiel().args(["rental", "paid", &rental]).assert().success();
    env.materiel().args(["rental", "paid", &rental, "--unpaid"]).assert().success();
    env.materiel().args(["rental", "paid", &rental]).assert().success();

    env.materiel()
        .args(["ledger", "summary", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"revenue\": 80.0"))
        .stdout(predicate::str::contains("\"expense\": 0.0"));
}

#[test]
fn test_partial_deposit_needs_amount() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let ana = env.person("Ana", "Lima");
    let rental = env.create(&[
        "rental", "new", "-e", &drill, "-r", &ana, "--until", "2099-01-01", "--price", "10",
        "--deposit", "50",
    ]);

    env.materiel()
        .args(["rental", "deposit", &rental, "partial"])
        .assert()
        .failure();
    env.materiel()
        .args(["rental", "deposit", &rental, "partial", "--amount", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recorded in the ledger"));
}

#[test]
fn test_free_repair_cannot_be_unpaid() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let repair = env.create(&["repair", "new", "-e", &drill, "--free"]);

    assert_eq!(
        env.stdout(&["equipment", "list", "--status", "in-repair", "--count"]).trim(),
        "1"
    );
    env.materiel()
        .args(["repair", "paid", &repair, "--unpaid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("free repair"));
}

// ============================================================================
// Borrowed and rented-in objects
// ============================================================================

#[test]
fn test_borrow_relend_and_return() {
    let env = TestEnv::new();
    let lender = env.person("Lea", "Nord");
    let friend = env.person("Bo", "Berg");
    let borrow = env.create(&["borrow", "new", "--name", "Trailer", "--lender", &lender]);

    env.materiel()
        .args(["borrow", "relend", &borrow, "--person", &friend, "--until", "2099-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lent on to"));

    // The shadow equipment shows up on loan but not among owned items
    assert_eq!(
        env.stdout(&["equipment", "list", "--status", "on-loan", "--count"]).trim(),
        "1"
    );
    assert_eq!(env.stdout(&["equipment", "list", "--owned", "--count"]).trim(), "0");

    env.materiel()
        .args(["borrow", "return-relend", &borrow])
        .assert()
        .success();
    env.materiel()
        .args(["borrow", "return", &borrow])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));
    assert_eq!(env.stdout(&["equipment", "list", "--count"]).trim(), "0");
}

#[test]
fn test_incoming_rental_deposit() {
    let env = TestEnv::new();
    let agency = env.create(&[
        "person", "new", "--first", "Rent", "--last", "Co", "--role", "rental-agency",
    ]);
    let rin = env.create(&[
        "incoming", "new", "--name", "Excavator", "--agency", &agency, "--until", "2099-01-01",
        "--pricing", "flat", "--price", "500", "--deposit", "200",
    ]);

    env.materiel().args(["incoming", "paid", &rin]).assert().success();
    env.materiel()
        .args(["incoming", "deposit-lost", &rin, "50"])
        .assert()
        .success();
    env.materiel()
        .args(["incoming", "deposit-recovered", &rin, "200"])
        .assert()
        .failure();

    env.materiel()
        .args(["ledger", "summary", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expense\": 550.0"));
}

// ============================================================================
// Quota, export and import
// ============================================================================

#[test]
fn test_quota_blocks_creation() {
    let env = TestEnv::new();
    env.write_config("limits:\n  equipment: 1\n");
    env.equipment("Drill");

    env.materiel()
        .args(["equipment", "new", "--name", "Ladder"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quota"));

    // Deleting does not give the quota back
    env.materiel()
        .args(["equipment", "delete", "MAT@1", "--yes"])
        .assert()
        .success();
    env.materiel()
        .args(["equipment", "new", "--name", "Ladder"])
        .assert()
        .failure();

    env.materiel()
        .args(["quota", "--exhausted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("equipment"));
}

#[test]
fn test_premium_env_lifts_quota() {
    let env = TestEnv::new();
    env.write_config("limits:\n  equipment: 1\n");
    env.equipment("Drill");

    env.materiel()
        .env("MATERIEL_PREMIUM", "yes")
        .args(["equipment", "new", "--name", "Ladder"])
        .assert()
        .success();
}

#[test]
fn test_export_then_import_elsewhere() {
    let source = TestEnv::new();
    let drill = source.equipment("Drill");
    let ana = source.person("Ana", "Lima");
    source.create(&["loan", "new", "-e", &drill, "-p", &ana, "--until", "2099-01-01"]);

    let file = source.tmp.path().join("export.json");
    source
        .materiel()
        .args(["export", "--output"])
        .arg(&file)
        .assert()
        .success();
    let content = fs::read_to_string(&file).unwrap();
    assert!(content.contains("\"app_version\""));

    let target = TestEnv::new();
    target
        .materiel()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 records added"));
    assert_eq!(target.stdout(&["loan", "list", "--count"]).trim(), "1");

    // A second import adds nothing
    target
        .materiel()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 records added"));
}

#[test]
fn test_ledger_csv_to_file() {
    let env = TestEnv::new();
    let drill = env.equipment("Drill");
    let repair = env.create(&["repair", "new", "-e", &drill, "--estimate", "45"]);
    env.materiel().args(["repair", "complete", &repair]).assert().success();
    env.materiel().args(["repair", "paid", &repair]).assert().success();

    let file = env.tmp.path().join("ledger.csv");
    env.materiel()
        .args(["ledger", "csv", "--output"])
        .arg(&file)
        .assert()
        .success();
    let csv = fs::read_to_string(&file).unwrap();
    assert!(csv.starts_with("id,date,kind"));
    assert!(csv.contains("repair_expense"));
    assert!(csv.contains("-45"));
}
