use crate::suite::Suite;
use crate::types::{CaseResult, Summary};
use tracing::{debug, warn};

/// Runs every case of `suite` one after another, in assembly order.
pub fn run_suite(suite: &Suite) -> Summary {
    let mut results: Vec<CaseResult> = Vec::with_capacity(suite.cases.len());
    for case in &suite.cases {
        debug!("running {} ({})", case.name, suite.name);
        let result = case.run();
        if result.failed() {
            warn!("{} failed", result.name);
        }
        results.push(result);
    }

    let passed = results.iter().filter(|r| r.passed()).count();
    let skipped = results.iter().filter(|r| r.skipped()).count();
    let failed = results.len() - passed - skipped;
    Summary {
        suite: suite.name.clone(),
        total: results.len(),
        passed,
        failed,
        skipped,
        cases: results,
    }
}
