//! Turns stored rows into runnable cases bound to the subject's callables.

use crate::compare::{Value, assert_lines_equal};
use crate::subject::{Resolution, Subject};
use crate::types::{CaseRecord, CaseResult, CaseStatus, Failure};
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::debug;

pub const NOT_IMPLEMENTED: &str = "method not implemented yet";

#[derive(Debug, Clone)]
pub struct GeneratedCase {
    pub name: String,
    pub method_name: String,
    pub description: String,
    pub resolution: Resolution,
    pub input: String,
    pub expected_output: String,
}

impl GeneratedCase {
    pub fn is_skipped(&self) -> bool {
        !self.resolution.is_resolved()
    }

    /// Calls the bound method with the input and compares its output. An
    /// unresolved method is reported as skipped and nothing is called.
    pub fn run(&self) -> CaseResult {
        let status = match &self.resolution {
            Resolution::Unresolved => CaseStatus::Skipped(NOT_IMPLEMENTED.to_string()),
            Resolution::Resolved(callable) => {
                match catch_unwind(AssertUnwindSafe(|| callable(&self.input))) {
                    Ok(Ok(actual)) => {
                        let expected = Value::Text(self.expected_output.clone());
                        match assert_lines_equal(&expected, &actual) {
                            Ok(()) => CaseStatus::Passed,
                            Err(e) => CaseStatus::Failed(Failure::Compare(e)),
                        }
                    }
                    Ok(Err(e)) => CaseStatus::Failed(Failure::Error(format!("{e:#}"))),
                    Err(payload) => CaseStatus::Failed(Failure::Panic(panic_message(payload.as_ref()))),
                }
            }
        };

        CaseResult {
            name: self.name.clone(),
            method_name: self.method_name.clone(),
            description: self.description.clone(),
            input: self.input.clone(),
            status,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// `test_<method>_<n>` with the lowest `n` not in `existing`; the chosen name
/// is added to `existing`.
pub fn unique_case_name(method_name: &str, existing: &mut BTreeSet<String>) -> String {
    let mut counter = 0usize;
    loop {
        let candidate = format!("test_{method_name}_{counter}");
        if !existing.contains(&candidate) {
            existing.insert(candidate.clone());
            return candidate;
        }
        counter += 1;
    }
}

pub fn synthesize<S: Subject + ?Sized>(
    subject: &S,
    record: &CaseRecord,
    existing: &mut BTreeSet<String>,
) -> GeneratedCase {
    let resolution = subject.lookup(&record.method_name);
    if !resolution.is_resolved() {
        debug!("{} has no method '{}'", subject.name(), record.method_name);
    }

    let name = unique_case_name(&record.method_name, existing);
    let mut description = format!("Test for method '{name}'");
    if let Some(comment) = record.comment.as_deref().filter(|c| !c.trim().is_empty()) {
        description.push(' ');
        description.push_str(comment.trim());
    }

    GeneratedCase {
        name,
        method_name: record.method_name.clone(),
        description,
        resolution,
        input: record.input.clone(),
        expected_output: record.expected_output.clone(),
    }
}

/// One case per record, in record order, with names unique across the lot.
pub fn synthesize_all<S: Subject + ?Sized>(subject: &S, records: &[CaseRecord]) -> Vec<GeneratedCase> {
    let mut existing = BTreeSet::new();
    records
        .iter()
        .map(|record| synthesize(subject, record, &mut existing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::CompareError;
    use crate::subject::Registry;
    use anyhow::anyhow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn subject() -> Registry {
        Registry::new("foo")
            .method("echo", |s: &str| Ok(s.to_string()))
            .method("broken", |_: &str| -> anyhow::Result<String> { Err(anyhow!("boom")) })
            .method("panics", |_: &str| -> anyhow::Result<String> { panic!("index out of range") })
            .method("silent", |_: &str| Ok(()))
    }

    #[test]
    fn same_method_gets_distinct_ordered_names() {
        let records: Vec<CaseRecord> = (0..3).map(|i| CaseRecord::new("echo", i.to_string(), "")).collect();
        let mut existing = BTreeSet::new();
        let names: Vec<String> = records
            .iter()
            .map(|r| synthesize(&subject(), r, &mut existing).name)
            .collect();

        assert_eq!(names, ["test_echo_0", "test_echo_1", "test_echo_2"]);
        assert_eq!(existing.len(), 3);
        assert!(names.iter().all(|n| existing.contains(n)));
    }

    #[test]
    fn names_already_taken_are_skipped_over() {
        let mut existing: BTreeSet<String> = ["test_f_0".to_string(), "test_f_2".to_string()].into();
        assert_eq!(unique_case_name("f", &mut existing), "test_f_1");
        assert_eq!(unique_case_name("f", &mut existing), "test_f_3");
    }

    #[test]
    fn unresolved_method_is_skipped_not_called() {
        let cases = synthesize_all(&subject(), &[CaseRecord::new("frequentWords", "x", "y")]);
        assert!(cases[0].is_skipped());
        let result = cases[0].run();
        assert_eq!(result.status, CaseStatus::Skipped(NOT_IMPLEMENTED.into()));
        assert!(!result.failed());
    }

    #[test]
    fn resolved_method_receives_the_input_verbatim() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let subject = Registry::new("foo").method("check", move |s: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(s, "  a\nb  \n");
            Ok("ok")
        });
        let cases = synthesize_all(&subject, &[CaseRecord::new("check", "  a\nb  \n", "ok")]);
        assert_eq!(cases[0].run().status, CaseStatus::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_classified() {
        let records = [
            CaseRecord::new("echo", "b\na", "a\nc"),
            CaseRecord::new("broken", "", ""),
            CaseRecord::new("panics", "", ""),
            CaseRecord::new("silent", "", ""),
        ];
        let results: Vec<CaseStatus> = synthesize_all(&subject(), &records)
            .iter()
            .map(|c| c.run().status)
            .collect();

        assert!(matches!(
            &results[0],
            CaseStatus::Failed(Failure::Compare(CompareError::Mismatch { .. }))
        ));
        assert_eq!(results[1], CaseStatus::Failed(Failure::Error("boom".into())));
        assert_eq!(
            results[2],
            CaseStatus::Failed(Failure::Panic("index out of range".into()))
        );
        assert!(matches!(
            &results[3],
            CaseStatus::Failed(Failure::Compare(CompareError::TypeKind { found: "nothing", .. }))
        ));
    }

    #[test]
    fn comment_is_appended_to_the_description() {
        let cases = synthesize_all(
            &subject(),
            &[
                CaseRecord::new("echo", "", "").with_comment("edge case: empty"),
                CaseRecord::new("echo", "", ""),
            ],
        );
        assert_eq!(cases[0].description, "Test for method 'test_echo_0' edge case: empty");
        assert_eq!(cases[1].description, "Test for method 'test_echo_1'");
    }
}
