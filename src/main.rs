use anyhow::Result;
use clap::{Parser, ValueEnum, error::ErrorKind};
use colored::Colorize;
use colored::control::set_override as set_color_override;
use rowtest::config::Config;
use rowtest::i18n;
use rowtest::report::{OutputKind, ReportOptions, print_human};
use rowtest::store::Loaded;
use rowtest::suite::{
    EXIT_FAILURES, EXIT_OK, EXIT_SETUP, EXIT_STORE_CREATED, RunOptions, Suite, load_records,
    run_assembled, subject_name_from_source,
};
use rowtest::{t, t_args};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Compact,
    Terse,
    Final,
    Normal,
}

impl From<OutputFormat> for OutputKind {
    fn from(v: OutputFormat) -> Self {
        match v {
            OutputFormat::Normal => OutputKind::Normal,
            OutputFormat::Compact => OutputKind::Compact,
            OutputFormat::Terse => OutputKind::Terse,
            OutputFormat::Final => OutputKind::Final,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    author,
    about = t!("cli-about")
)]
struct Cli {
    // SOURCE: test_<subject>[.ext]; the store is <subject>.sqlite3 next to it
    #[arg(value_name = "SOURCE", help = t!("cli-source"))]
    source: PathBuf,

    // Program under test, default ./<subject>
    #[arg(
        long,
        value_name = "CMD",
        visible_alias = "app",
        help = t!("cli-subject")
    )]
    subject: Option<String>,

    #[arg(long, value_name = "FILE", help = t!("cli-config"))]
    config: Option<PathBuf>,

    // Override the derived store location
    #[arg(long, value_name = "FILE", help = t!("cli-store"))]
    store: Option<PathBuf>,

    #[arg(long, value_name = "SECS", help = t!("cli-timeout"))]
    timeout: Option<u64>,

    // -t/--test: case name or method name; "list" prints the cases and exits
    #[arg(short = 't', long = "test", value_name = "TEST", help = t!("cli-test"))]
    test: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "normal",
        help = t!("cli-output")
    )]
    output: OutputFormat,

    #[arg(
        short = 'f',
        long = "hide-fails",
        conflicts_with = "hide_passes",
        help = t!("cli-hide-fails")
    )]
    hide_fails: bool,

    #[arg(
        short = 'p',
        long = "hide-passes",
        conflicts_with = "hide_fails",
        help = t!("cli-hide-passes")
    )]
    hide_passes: bool,

    #[arg(short = 'q', long = "silent", help = t!("cli-silent"))]
    silent: bool,

    #[arg(short = 'v', long = "verbose", help = t!("cli-verbose"))]
    verbose: bool,

    #[arg(long = "no-color", help = t!("cli-no-color"))]
    no_color: bool,
}

fn display_path(path: &Path) -> String {
    match std::fs::canonicalize(path) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

fn resolve_command_path(cmd: &Path) -> String {
    if cmd.components().count() > 1 {
        return display_path(cmd);
    }
    match which::which(cmd) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => cmd.to_string_lossy().into_owned(),
    }
}

/// Format clap errors with localized labels
fn format_clap_error(error: &clap::Error) -> String {
    let mut msg = error.to_string();
    msg = msg.replace("Usage:", &format!("{}", t!("cli-error-usage").bold().underline()));
    msg = msg.replace("error:", &format!("{}", t!("cli-error-label").red().bold()));
    msg = msg.replace("For more information, try '--help'.", &t!("cli-error-help-info"));
    msg
}

fn setup_failed(e: anyhow::Error) -> ! {
    error!("{e:#}");
    eprintln!("{} {e:#}", format!("{}:", t!("cli-error-label")).red().bold());
    std::process::exit(EXIT_SETUP);
}

fn main() -> Result<()> {
    // Initialize localization first
    i18n::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => error.exit(),
            _ => {
                eprintln!("{}", format_clap_error(&error));
                std::process::exit(EXIT_SETUP);
            }
        },
    };

    let filter = if cli.verbose {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "rowtest=info".to_string())
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "rowtest=warn".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    set_color_override(!cli.no_color);

    let subject_name = subject_name_from_source(&cli.source);
    let dir = cli
        .source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let config = Config::discover(cli.config.as_deref(), &dir, &subject_name)
        .unwrap_or_else(|e| setup_failed(e));
    if let Some(origin) = &config.origin {
        info!("{}", t_args!("info-config", "path" => display_path(origin)));
    }

    let options = RunOptions {
        store: cli.store.clone(),
        extension: config.extension(),
        layout: config.layout(),
        select: cli.test.clone(),
    };
    let store = options.case_store(&cli.source, &subject_name);
    info!("{}", t_args!("info-store", "path" => display_path(store.path())));

    let records = match load_records(&store).unwrap_or_else(|e| setup_failed(e)) {
        Loaded::Ready(records) => records,
        Loaded::Created(notice) => {
            eprintln!("{notice}");
            std::process::exit(EXIT_STORE_CREATED);
        }
    };

    let mut process = config.process_subject(cli.subject.as_deref(), &dir.join(&subject_name));
    if let Some(secs) = cli.timeout {
        process.timeout = Some(Duration::from_secs(secs));
    }
    process.quiet = cli.silent;
    info!(
        "{}",
        t_args!("info-subject", "path" => resolve_command_path(&process.command))
    );
    let subject = process
        .into_registry(subject_name.as_str())
        .unwrap_or_else(|e| setup_failed(e));

    let mut suite = Suite::assemble(&subject_name, &subject, &records);

    if let Some(sel) = options.select.as_deref() {
        if sel.trim().eq_ignore_ascii_case("list") {
            println!("{}", t_args!("available-tests", "name" => &suite.name));
            for (idx, case) in suite.cases.iter().enumerate() {
                println!("  {:>3}. {} ({})", idx + 1, case.name, case.description);
            }
            return Ok(());
        }
        suite.select(sel);
        if suite.is_empty() {
            error!("{}", t_args!("error-test-not-found", "test" => sel.trim()));
            std::process::exit(EXIT_SETUP);
        }
    }

    info!(
        "{}",
        t_args!("info-suite", "name" => &suite.name, "count" => suite.len())
    );
    let summary = run_assembled(&suite, &subject).unwrap_or_else(|e| setup_failed(e));
    info!(
        "{}",
        t_args!("info-finished",
            "passed" => summary.passed,
            "failed" => summary.failed,
            "skipped" => summary.skipped
        )
    );

    if !cli.silent {
        let report = ReportOptions {
            kind: cli.output.into(),
            hide_fails: cli.hide_fails,
            hide_passes: cli.hide_passes,
        };
        print_human(&summary, &report);
    }

    std::process::exit(if summary.success() {
        EXIT_OK
    } else {
        EXIT_FAILURES
    });
}
