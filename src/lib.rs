pub mod backend;
pub mod compare;
pub mod config;
pub mod engine;
pub mod i18n;
pub mod naming;
pub mod report;
pub mod store;
pub mod subject;
pub mod suite;
pub mod synth;
pub mod types;

pub use crate::suite::{RunOptions, RunOutcome, build_and_run, run_main};

// Re-export the localization macros
pub use crate::i18n::{t, t_with_args};
