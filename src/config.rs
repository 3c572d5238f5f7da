use crate::backend::ProcessSubject;
use crate::store::{DEFAULT_EXTENSION, StoreLayout};
use crate::t_args;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnsCfg {
    pub method: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub active: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct StoreCfg {
    pub extension: Option<String>,
    pub table: Option<String>,
    pub columns: Option<ColumnsCfg>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.trim().to_string()],
            OneOrMany::Many(v) => v.into_iter().map(|s| s.trim().to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SubjectCfg {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub methods: Option<OneOrMany>,
    pub list: Option<String>,
    pub init: Option<String>,
    /// Seconds per call
    pub timeout: Option<u64>,
}

// Accept lowercase keys too
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct RawConfig {
    #[serde(alias = "store")]
    pub store: Option<StoreCfg>,
    #[serde(alias = "subject")]
    pub subject: Option<SubjectCfg>,
}

/// A parsed config file together with where it was found, so relative paths
/// can be resolved against it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: RawConfig,
    pub origin: Option<PathBuf>,
}

impl Config {
    pub fn parse(content: &str) -> Result<RawConfig> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| t_args!("config-failed-to-read", "file" => path.display()))?;
        let raw = Self::parse(&content)
            .with_context(|| t_args!("config-yaml-error", "file" => path.display()))?;
        Ok(Self {
            raw,
            origin: Some(path.to_path_buf()),
        })
    }

    /// `explicit` if given, else `<dir>/<subject>.yaml` when it exists, else
    /// defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path, subject: &str) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(format!("{subject}.yaml"));
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn extension(&self) -> String {
        self.raw
            .store
            .as_ref()
            .and_then(|s| s.extension.as_deref())
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    pub fn layout(&self) -> StoreLayout {
        let mut layout = StoreLayout::default();
        let Some(store) = &self.raw.store else {
            return layout;
        };
        if let Some(table) = &store.table {
            layout.table = table.trim().to_string();
        }
        if let Some(columns) = &store.columns {
            let pairs = [
                (&columns.method, &mut layout.method_column),
                (&columns.input, &mut layout.input_column),
                (&columns.output, &mut layout.output_column),
                (&columns.active, &mut layout.active_column),
                (&columns.comment, &mut layout.comment_column),
            ];
            for (configured, slot) in pairs {
                if let Some(name) = configured {
                    *slot = name.trim().to_string();
                }
            }
        }
        layout
    }

    /// Subject program settings; `command` overrides the configured one and
    /// `fallback` is used when neither is set.
    pub fn process_subject(&self, command: Option<&str>, fallback: &Path) -> ProcessSubject {
        let cfg = self.raw.subject.clone().unwrap_or_default();
        let program = match command {
            Some(cmd) => PathBuf::from(cmd.trim()),
            None => match &cfg.command {
                Some(cmd) => self.resolve_relative(cmd.trim()),
                None => fallback.to_path_buf(),
            },
        };

        let mut subject = ProcessSubject::new(program);
        subject.args = cfg.args.unwrap_or_default();
        subject.methods = cfg.methods.map(OneOrMany::into_vec);
        if let Some(list) = cfg.list {
            subject.list_arg = list.trim().to_string();
        }
        subject.init_arg = cfg.init.map(|s| s.trim().to_string());
        if let Some(secs) = cfg.timeout {
            subject.timeout = Some(Duration::from_secs(secs));
        }
        subject
    }

    fn resolve_relative(&self, path: &str) -> PathBuf {
        let path_buf = Path::new(path);
        if path_buf.is_absolute() {
            return path_buf.to_path_buf();
        }
        // Resolve relative to the YAML file's directory
        match self.origin.as_ref().and_then(|o| o.parent()) {
            Some(dir) => dir.join(path),
            None => path_buf.to_path_buf(),
        }
    }
}
