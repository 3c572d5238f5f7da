use crate::compare::CompareError;

/// One active row of the case table. Inactive rows are filtered out by the
/// store and never become records, so there is no `active` flag here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub method_name: String,
    pub input: String,
    pub expected_output: String,
    pub comment: Option<String>,
}

impl CaseRecord {
    pub fn new(
        method_name: impl Into<String>,
        input: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            method_name: method_name.into(),
            input: input.into(),
            expected_output: expected_output.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Compare(CompareError),
    /// The callable returned an error
    Error(String),
    /// The callable panicked
    Panic(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed(Failure),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub name: String,
    pub method_name: String,
    pub description: String,
    pub input: String,
    pub status: CaseStatus,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        matches!(self.status, CaseStatus::Passed)
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, CaseStatus::Failed(_))
    }

    pub fn skipped(&self) -> bool {
        matches!(self.status, CaseStatus::Skipped(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Display name of the suite, e.g. `FooTest`
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cases: Vec<CaseResult>,
}

impl Summary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}
