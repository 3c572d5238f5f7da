use crate::compare::CompareError;
use crate::types::{CaseResult, CaseStatus, Failure, Summary};
use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// One line per case, details for failures
    #[default]
    Normal,
    /// One character per case: `.`, `F`, `s`
    Compact,
    /// Failures only
    Terse,
    /// Tally only
    Final,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub kind: OutputKind,
    pub hide_fails: bool,
    pub hide_passes: bool,
}

impl ReportOptions {
    pub fn new(kind: OutputKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

fn header(summary: &Summary) -> String {
    format!(
        "{}: Total: {}, Passed: {}, Failed: {}, Skipped: {}",
        summary.suite.bold(),
        summary.total,
        summary.passed.to_string().green(),
        if summary.failed > 0 {
            summary.failed.to_string().red().bold().to_string()
        } else {
            summary.failed.to_string().green().to_string()
        },
        summary.skipped.to_string().yellow(),
    )
}

fn indented(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n            ")
}

fn render_failure(out: &mut String, case: &CaseResult, failure: &Failure) {
    out.push_str(&format!(
        "{} {} ({})\n",
        "[FAIL]".red().bold(),
        case.name.red().bold(),
        case.description
    ));
    out.push_str(&format!("  {} {}\n", "input   :".bold(), indented(&case.input)));
    match failure {
        Failure::Compare(CompareError::Mismatch { expected, actual }) => {
            out.push_str(&format!("  {} {}\n", "expected:".bold(), indented(expected)));
            out.push_str(&format!("  {} {}\n", "actual  :".bold(), indented(actual)));
        }
        Failure::Compare(e @ CompareError::TypeKind { .. }) => {
            out.push_str(&format!("  {} {}\n", "error   :".bold(), e.to_string().red()));
        }
        Failure::Error(msg) => {
            out.push_str(&format!("  {} {}\n", "error   :".bold(), indented(msg).red()));
        }
        Failure::Panic(msg) => {
            out.push_str(&format!("  {} {}\n", "panic   :".bold(), indented(msg).red()));
        }
    }
}

fn render_case(out: &mut String, case: &CaseResult, options: &ReportOptions) {
    match &case.status {
        CaseStatus::Passed => {
            if !options.hide_passes {
                out.push_str(&format!(
                    "{} {} ({})\n",
                    "[OK]".green().bold(),
                    case.name.green(),
                    case.description
                ));
            }
        }
        CaseStatus::Skipped(reason) => {
            out.push_str(&format!(
                "{} {}: skipped '{}'\n",
                "[SKIP]".yellow().bold(),
                case.name.yellow(),
                reason
            ));
        }
        CaseStatus::Failed(failure) => {
            if !options.hide_fails {
                render_failure(out, case, failure);
            }
        }
    }
}

pub fn render_human(summary: &Summary, options: &ReportOptions) -> String {
    let mut out = String::new();
    match options.kind {
        OutputKind::Normal => {
            for case in &summary.cases {
                render_case(&mut out, case, options);
            }
        }
        OutputKind::Compact => {
            let marks: String = summary
                .cases
                .iter()
                .map(|c| match c.status {
                    CaseStatus::Passed => ".".green().to_string(),
                    CaseStatus::Failed(_) => "F".red().bold().to_string(),
                    CaseStatus::Skipped(_) => "s".yellow().to_string(),
                })
                .collect();
            out.push_str(&marks);
            out.push('\n');
        }
        OutputKind::Terse => {
            for case in &summary.cases {
                if let CaseStatus::Failed(failure) = &case.status {
                    render_failure(&mut out, case, failure);
                }
            }
        }
        OutputKind::Final => {}
    }
    out.push_str(&header(summary));
    out.push('\n');
    out
}

pub fn print_human(summary: &Summary, options: &ReportOptions) {
    print!("{}", render_human(summary, options));
}
