//! Operator-facing messages in English and Norwegian Bokmål.
//!
//! Catalogs are `key = value` lines compiled in from `locales/`. A key missing
//! from the active catalog falls back to English.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::OnceLock;

static CATALOGS: OnceLock<Catalogs> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Bokmal,
}

impl Language {
    fn source(self) -> &'static str {
        match self {
            Language::English => include_str!("../locales/en.ftl"),
            Language::Bokmal => include_str!("../locales/nb.ftl"),
        }
    }

    /// `nb_NO.UTF-8`, `nn-NO`, `en_GB` and the like. Unknown languages give `None`.
    pub fn from_locale(locale: &str) -> Option<Self> {
        let code = locale
            .split(['.', '@'])
            .next()?
            .split(['_', '-'])
            .next()?
            .to_ascii_lowercase();
        match code.as_str() {
            "nb" | "no" | "nor" | "nn" | "nno" => Some(Language::Bokmal),
            "en" => Some(Language::English),
            _ => None,
        }
    }

    /// First recognised value of `LC_ALL`, `LC_MESSAGES`, `LANG`.
    fn detect(var: impl Fn(&str) -> Option<String>) -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .into_iter()
            .filter_map(|name| var(name))
            .find_map(|value| Language::from_locale(&value))
            .unwrap_or(Language::English)
    }
}

fn parse_catalog(source: &str) -> HashMap<String, String> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(" = "))
        .map(|(key, value)| (key.trim().to_string(), value.trim().replace("\\n", "\n")))
        .collect()
}

#[derive(Debug)]
struct Catalogs {
    active: HashMap<String, String>,
    english: HashMap<String, String>,
}

impl Catalogs {
    fn for_language(language: Language) -> Self {
        let english = parse_catalog(Language::English.source());
        let active = match language {
            Language::English => HashMap::new(),
            other => parse_catalog(other.source()),
        };
        Self { active, english }
    }

    fn lookup(&self, key: &str) -> String {
        match self.active.get(key).or_else(|| self.english.get(key)) {
            Some(message) => message.clone(),
            None => {
                tracing::warn!("missing message key {key}");
                format!("MISSING: {key}")
            }
        }
    }

    fn format(&self, key: &str, args: &[(&str, &dyn Display)]) -> String {
        args.iter().fold(self.lookup(key), |message, (name, value)| {
            message.replace(&format!("{{${name}}}"), &value.to_string())
        })
    }
}

fn catalogs() -> &'static Catalogs {
    CATALOGS.get_or_init(|| Catalogs::for_language(Language::detect(|name| std::env::var(name).ok())))
}

/// Picks the language from the environment. Later calls are no-ops.
pub fn init() {
    catalogs();
}

pub fn t(key: &str) -> String {
    catalogs().lookup(key)
}

/// `{$name}` placeholders in the message are replaced by the matching argument.
pub fn t_with_args(key: &str, args: &[(&str, &dyn Display)]) -> String {
    catalogs().format(key, args)
}

#[macro_export]
macro_rules! t {
    ($key:expr) => {
        $crate::i18n::t($key)
    };
}

#[macro_export]
macro_rules! t_args {
    ($key:expr, $($name:expr => $value:expr),*) => {{
        let args: &[(&str, &dyn std::fmt::Display)] = &[
            $(
                ($name, &$value),
            )*
        ];
        $crate::i18n::t_with_args($key, args)
    }};
}
