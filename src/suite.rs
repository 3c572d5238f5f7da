//! Builds a suite for one subject from its case store and runs it.

use crate::engine::run_suite;
use crate::naming::to_capitalized_concatenated;
use crate::report::{OutputKind, ReportOptions, print_human};
use crate::store::{CaseStore, DEFAULT_EXTENSION, Loaded, SchemaNotice, StoreLayout};
use crate::subject::Subject;
use crate::synth::{GeneratedCase, synthesize_all};
use crate::types::{CaseRecord, Summary};
use crate::{t, t_args};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Data sources are named `test_<subject>`.
pub const SOURCE_PREFIX: &str = "test_";

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURES: i32 = 1;
pub const EXIT_SETUP: i32 = 2;
pub const EXIT_STORE_CREATED: i32 = 3;

/// `path/to/test_foo.rs` -> `foo`
pub fn subject_name_from_source(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_prefix(SOURCE_PREFIX) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => stem,
    }
}

/// `foo_bar` -> `FooBarTest`
pub fn suite_name(subject_name: &str) -> String {
    format!("{}Test", to_capitalized_concatenated(subject_name))
}

#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub subject_name: String,
    pub cases: Vec<GeneratedCase>,
}

impl Suite {
    pub fn assemble<S: Subject + ?Sized>(
        subject_name: &str,
        subject: &S,
        records: &[CaseRecord],
    ) -> Self {
        Self {
            name: suite_name(subject_name),
            subject_name: subject_name.to_string(),
            cases: synthesize_all(subject, records),
        }
    }

    /// Keeps the cases whose name or method equals `selector`.
    pub fn select(&mut self, selector: &str) {
        let selector = selector.trim();
        self.cases
            .retain(|c| c.name == selector || c.method_name == selector);
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Explicit store file; otherwise `<source dir>/<subject>.<extension>`
    pub store: Option<PathBuf>,
    pub extension: String,
    pub layout: StoreLayout,
    pub select: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            store: None,
            extension: DEFAULT_EXTENSION.to_string(),
            layout: StoreLayout::default(),
            select: None,
        }
    }
}

impl RunOptions {
    pub fn case_store(&self, source: &Path, subject_name: &str) -> CaseStore {
        match &self.store {
            Some(path) => CaseStore::new(path, self.layout.clone()),
            None => {
                let dir = source
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                CaseStore::for_subject(dir, subject_name, &self.extension, self.layout.clone())
            }
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(Summary),
    /// The table was just created; nothing was run.
    StoreCreated(SchemaNotice),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(summary) if summary.success() => EXIT_OK,
            RunOutcome::Completed(_) => EXIT_FAILURES,
            RunOutcome::StoreCreated(_) => EXIT_STORE_CREATED,
        }
    }
}

pub fn load_records(store: &CaseStore) -> Result<Loaded> {
    store
        .load()
        .with_context(|| t_args!("error-store", "file" => store.path().display()))
}

/// Load, synthesize, initialize the subject, run.
pub fn build_and_run<S: Subject + ?Sized>(
    source: &Path,
    subject: &S,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let subject_name = subject_name_from_source(source);
    let store = options.case_store(source, &subject_name);

    let records = match load_records(&store)? {
        Loaded::Ready(records) => records,
        Loaded::Created(notice) => return Ok(RunOutcome::StoreCreated(notice)),
    };

    let mut suite = Suite::assemble(&subject_name, subject, &records);
    if let Some(selector) = &options.select {
        suite.select(selector);
    }
    info!("{}", t_args!("info-suite", "name" => &suite.name, "count" => suite.len()));

    run_assembled(&suite, subject).map(RunOutcome::Completed)
}

/// Initializes the subject once, then runs the suite.
pub fn run_assembled<S: Subject + ?Sized>(suite: &Suite, subject: &S) -> Result<Summary> {
    subject
        .init()
        .with_context(|| t_args!("error-init-failed", "name" => subject.name()))?;
    Ok(run_suite(suite))
}

/// Entry point for a `harness = false` test target named `test_<subject>`:
///
/// ```no_run
/// use rowtest::subject::Registry;
///
/// fn main() {
///     let subject = Registry::new("foo").method("double", |s: &str| Ok(format!("{s}{s}")));
///     std::process::exit(rowtest::run_main(file!(), &subject));
/// }
/// ```
pub fn run_main<S: Subject + ?Sized>(source: &str, subject: &S) -> i32 {
    crate::i18n::init();
    match build_and_run(Path::new(source), subject, &RunOptions::default()) {
        Ok(outcome) => {
            match &outcome {
                RunOutcome::Completed(summary) => {
                    print_human(summary, &ReportOptions::new(OutputKind::Normal))
                }
                RunOutcome::StoreCreated(notice) => eprintln!("{notice}"),
            }
            outcome.exit_code()
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("{}: {e:#}", t!("cli-error-label"));
            EXIT_SETUP
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_name_strips_prefix_and_extension() {
        assert_eq!(subject_name_from_source(Path::new("test_foo.py")), "foo");
        assert_eq!(subject_name_from_source(Path::new("tests/test_foo_bar.rs")), "foo_bar");
        assert_eq!(subject_name_from_source(Path::new("test_foo")), "foo");
        assert_eq!(subject_name_from_source(Path::new("foo.rs")), "foo");
        assert_eq!(subject_name_from_source(Path::new("test_.rs")), "test_");
    }

    #[test]
    fn suite_name_is_capitalized() {
        assert_eq!(suite_name("foo"), "FooTest");
        assert_eq!(suite_name("bio_informatics"), "BioInformaticsTest");
    }

    #[test]
    fn store_sits_next_to_the_source() {
        let options = RunOptions::default();
        let store = options.case_store(Path::new("course/test_foo.rs"), "foo");
        assert_eq!(store.path(), Path::new("course/foo.sqlite3"));
        let store = options.case_store(Path::new("test_foo.rs"), "foo");
        assert_eq!(store.path(), Path::new("./foo.sqlite3"));

        let options = RunOptions {
            store: Some("elsewhere.db".into()),
            ..RunOptions::default()
        };
        assert_eq!(
            options.case_store(Path::new("test_foo.rs"), "foo").path(),
            Path::new("elsewhere.db")
        );
    }

    #[test]
    fn select_matches_name_or_method() {
        let subject = crate::subject::Registry::new("foo");
        let records = [
            CaseRecord::new("a", "", ""),
            CaseRecord::new("b", "", ""),
            CaseRecord::new("a", "", ""),
        ];
        let mut suite = Suite::assemble("foo", &subject, &records);
        suite.select("a");
        assert_eq!(suite.len(), 2);
        suite.select("test_a_1");
        assert_eq!(suite.cases[0].name, "test_a_1");
        assert_eq!(suite.len(), 1);
    }
}
