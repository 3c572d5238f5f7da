//! Conversions between `underscore_separated` and `CapitalizedConcatenated`
//! identifiers.
//!
//! The two functions are not exact inverses. Doubled, leading or trailing
//! separators and irregular casing (`HTTPServer`, `fooBAR`) do not survive a
//! round trip; only regular names such as `foo_bar` <-> `FooBar` do.

use regex::Regex;
use std::sync::OnceLock;

const SEPARATOR: char = '_';

fn word_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(.)([A-Z][a-z]+)").unwrap())
}

fn case_step() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap())
}

/// `frequentWords` -> `frequent_words`, `HTTPServer` -> `http_server`.
pub fn to_underscore_separated(name: &str) -> String {
    let split_words = word_start().replace_all(name, "${1}_${2}");
    case_step()
        .replace_all(&split_words, "${1}_${2}")
        .to_lowercase()
}

/// `foo_bar` -> `FooBar`. Empty segments are kept as a literal `_`, so
/// `foo__bar` -> `Foo_Bar` rather than silently becoming `FooBar`.
pub fn to_capitalized_concatenated(name: &str) -> String {
    name.split(SEPARATOR)
        .map(|segment| {
            if segment.is_empty() {
                SEPARATOR.to_string()
            } else {
                capitalize(segment)
            }
        })
        .collect()
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
