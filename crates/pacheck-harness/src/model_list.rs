//! Model list files.
//!
//! One model per line, either `name,link` or `name,link,mark,reason` where
//! `mark` is `skip` or `xfail`. Lines starting with `#` and blank lines are
//! ignored.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// How a listed model is treated instead of being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Skip,
    Xfail,
}

impl FromStr for Mark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Mark::Skip),
            "xfail" => Ok(Mark::Xfail),
            other => Err(format!("unknown mark '{other}', expected skip or xfail")),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Skip => write!(f, "skip"),
            Mark::Xfail => write!(f, "xfail"),
        }
    }
}

/// One line of a model list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub link: String,
    pub mark: Option<Mark>,
    pub reason: Option<String>,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            mark: None,
            reason: None,
        }
    }

    pub fn marked(mut self, mark: Mark, reason: impl Into<String>) -> Self {
        self.mark = Some(mark);
        self.reason = Some(reason.into());
        self
    }
}

/// Parse model list text. `origin` names the source in error messages.
pub fn parse_model_list(text: &str, origin: &str) -> Result<Vec<ModelEntry>, HarnessError> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let error = |message: String| HarnessError::ModelList {
            origin: origin.to_string(),
            line: index + 1,
            message,
        };
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let entry = match fields.as_slice() {
            [name, link] => ModelEntry::new(*name, *link),
            [name, link, mark, reason] => {
                let mark = mark.parse::<Mark>().map_err(error)?;
                ModelEntry::new(*name, *link).marked(mark, *reason)
            }
            _ => {
                return Err(error(format!(
                    "incorrect model info `{line}`, it must contain either 2 or 4 fields"
                )))
            }
        };
        if entry.name.is_empty() {
            return Err(error("model name is empty".to_string()));
        }
        entries.push(entry);
    }
    Ok(entries)
}

pub fn load_model_list(path: &Path) -> Result<Vec<ModelEntry>, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_model_list(&text, &path.display().to_string())
}
