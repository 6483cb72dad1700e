//! Declarative option fixtures
//!
//! A fixture file names one entity and a map of records:
//!
//! ```yaml
//! entity: WpOption
//! items:
//!   static_url:
//!     optionName: "StaticPress::static url"
//!     optionValue: "http://example.org/sub/"
//!   timeout:
//!     optionName: "StaticPress::timeout"
//!     optionValue: 20
//!     autoload: "no"
//! ```
//!
//! Scalar values are stored as their string form and `autoload` defaults to
//! `yes`. Every option name must be unique within the file and fall inside the
//! managed namespace, which is what lets [`TableCleaner`] reset the table by
//! prefix alone.

mod setup;

pub use setup::{FixtureLoader, PerTestFixtureSetup, TableCleaner};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{E2eError, E2eResult};
use crate::store::OptionRow;

/// The only entity the harness seeds.
pub const OPTION_ENTITY: &str = "WpOption";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureFile {
    entity: String,
    #[serde(default)]
    items: BTreeMap<String, RawRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRecord {
    option_name: String,
    option_value: Value,
    #[serde(default = "default_autoload")]
    autoload: String,
}

fn default_autoload() -> String {
    "yes".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRecord {
    /// Item label in the file; only used in error messages.
    pub label: String,
    pub row: OptionRow,
}

/// A parsed and validated fixture file.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub path: PathBuf,
    pub records: Vec<FixtureRecord>,
}

impl FixtureSet {
    /// Read and validate the fixture file at `path`.
    pub fn read(path: impl AsRef<Path>, namespace: &str) -> E2eResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| E2eError::FixtureParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &text, namespace)
    }

    /// Parse fixture `text`; `path` is only used for error reporting.
    pub fn parse(path: impl AsRef<Path>, text: &str, namespace: &str) -> E2eResult<Self> {
        let path = path.as_ref().to_path_buf();
        let invalid = |reason: String| E2eError::FixtureParse {
            path: path.clone(),
            reason,
        };

        let file: FixtureFile = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        if file.entity != OPTION_ENTITY {
            return Err(invalid(format!(
                "unsupported entity '{}', expected '{}'",
                file.entity, OPTION_ENTITY
            )));
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(file.items.len());
        for (label, raw) in file.items {
            if !raw.option_name.starts_with(namespace) {
                return Err(invalid(format!(
                    "{}: option '{}' is outside namespace '{}'",
                    label, raw.option_name, namespace
                )));
            }
            if !seen.insert(raw.option_name.clone()) {
                return Err(invalid(format!(
                    "{}: duplicate option '{}'",
                    label, raw.option_name
                )));
            }
            let value = scalar_string(&raw.option_value)
                .ok_or_else(|| invalid(format!("{}: optionValue must be a scalar", label)))?;

            records.push(FixtureRecord {
                label,
                row: OptionRow {
                    name: raw.option_name,
                    value,
                    autoload: raw.autoload,
                },
            });
        }

        Ok(Self { path, records })
    }

    pub fn rows(&self) -> Vec<OptionRow> {
        self.records.iter().map(|r| r.row.clone()).collect()
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
