use anyhow::Result;
use rowtest::report::{OutputKind, ReportOptions, render_human};
use rowtest::subject::Registry;
use rowtest::suite::{EXIT_OK, EXIT_STORE_CREATED, RunOptions, RunOutcome, build_and_run, run_main};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use tempfile::tempdir;

/// Most frequent k-mers of the first line, k on the second. Emitted in hash
/// order, so the line order differs from run to run.
fn frequent_words(input: &str) -> Result<String> {
    let mut lines = input.lines();
    let text = lines.next().unwrap_or_default().trim();
    let k: usize = lines.next().unwrap_or_default().trim().parse()?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for i in 0..=text.len().saturating_sub(k) {
        *counts.entry(&text[i..i + k]).or_default() += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);
    Ok(counts
        .into_iter()
        .filter(|(_, n)| *n == best)
        .map(|(kmer, _)| kmer)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn subject() -> Registry {
    Registry::new("bioinformatics").method("frequentWords", frequent_words)
}

fn add_case(db: &Path, method: &str, input: &str, expected: &str, active: i64) -> Result<()> {
    let conn = Connection::open(db)?;
    conn.execute(
        "INSERT INTO Test (name_of_method_to_test, data_input, expected_output, perform_test) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![method, input, expected, active],
    )?;
    Ok(())
}

#[test]
fn first_run_creates_the_store_then_cases_run() -> Result<()> {
    rowtest::i18n::init();
    colored::control::set_override(false);
    let dir = tempdir()?;
    let source = dir.path().join("test_bioinformatics.rs");
    let db = dir.path().join("bioinformatics.sqlite3");

    let outcome = build_and_run(&source, &subject(), &RunOptions::default())?;
    let RunOutcome::StoreCreated(notice) = &outcome else {
        panic!("expected the store to be created, got {outcome:?}");
    };
    assert_eq!(notice.database, db);
    assert_eq!(outcome.exit_code(), EXIT_STORE_CREATED);

    add_case(&db, "frequentWords", "ACGTTGCATGTCGCATGATGCATGAGAGCT\n4", "CATG\nGCAT", 1)?;
    add_case(&db, "frequentWords", "ACGT\n1", "A\nC\nG\nT", 1)?;
    add_case(&db, "frequentWords", "AAAA\n2", "CC", 0)?;
    add_case(&db, "patternCount", "GCGCG\nGCG", "2", 1)?;

    let outcome = build_and_run(&source, &subject(), &RunOptions::default())?;
    let RunOutcome::Completed(summary) = &outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(summary.suite, "BioinformaticsTest");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(outcome.exit_code(), EXIT_OK);

    let names: Vec<&str> = summary.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["test_frequentWords_0", "test_frequentWords_1", "test_patternCount_0"]);

    let text = render_human(summary, &ReportOptions::new(OutputKind::Normal));
    assert!(text.contains("[OK] test_frequentWords_0"));
    assert!(text.contains("[SKIP] test_patternCount_0: skipped 'method not implemented yet'"));
    Ok(())
}

#[test]
fn wrong_answer_fails_with_both_sides() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("test_bioinformatics.rs");
    let db = dir.path().join("bioinformatics.sqlite3");
    build_and_run(&source, &subject(), &RunOptions::default())?;
    add_case(&db, "frequentWords", "ACGTTGCATGTCGCATGATGCATGAGAGCT\n4", "CATG\nGCAA", 1)?;

    let RunOutcome::Completed(summary) = build_and_run(&source, &subject(), &RunOptions::default())? else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.failed, 1);
    assert!(!summary.success());
    Ok(())
}

#[test]
fn run_main_returns_exit_codes() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("test_bioinformatics.rs");
    let source = source.to_string_lossy();

    assert_eq!(run_main(&source, &subject()), EXIT_STORE_CREATED);
    add_case(
        &dir.path().join("bioinformatics.sqlite3"),
        "frequentWords",
        "ACGTTGCATGTCGCATGATGCATGAGAGCT\n4",
        "GCAT\nCATG",
        1,
    )?;
    assert_eq!(run_main(&source, &subject()), EXIT_OK);
    Ok(())
}

#[test]
fn init_failure_aborts_before_any_case() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("test_bioinformatics.rs");
    build_and_run(&source, &subject(), &RunOptions::default())?;
    add_case(&dir.path().join("bioinformatics.sqlite3"), "frequentWords", "A\n1", "A", 1)?;

    let subject = subject().on_init(|| Err(anyhow::anyhow!("constants missing")));
    let err = build_and_run(&source, &subject, &RunOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("constants missing"));
    Ok(())
}
