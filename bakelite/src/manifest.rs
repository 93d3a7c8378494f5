//! Dependency manifest handling.
//!
//! The manifest (`requirements.txt` by convention) is read from the
//! materialized workdir right before the install command runs. Bakelite
//! parses it line-wise for logging and record-keeping only; resolution and
//! installation are entirely the package manager's job.

use crate::errors::{BakeError, BakeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One requirement line, split into name and optional version specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Specifier as written, e.g. `==2.31.0` or `>=1.0,<2`. `None` for a
    /// bare name.
    pub spec: Option<String>,
}

/// A parsed dependency manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest {
    pub entries: Vec<Dependency>,
}

impl DependencyManifest {
    /// Load and parse the manifest at `path`.
    ///
    /// A missing file is a `Manifest` error: the install step requires the
    /// manifest to have been materialized into the workdir.
    pub fn load(path: &Path) -> BakeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BakeError::Manifest(format!("manifest not found: {}", path.display()))
            } else {
                BakeError::Manifest(format!("failed to read {}: {}", path.display(), e))
            }
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse manifest text. Unparseable lines are kept as bare names; the
    /// package manager is the authority on syntax.
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = match line.split_once('#') {
                Some((before, _comment)) => before.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            match line.find(|c: char| "=<>!~; ".contains(c)) {
                Some(idx) => entries.push(Dependency {
                    name: line[..idx].trim().to_string(),
                    spec: Some(line[idx..].trim().to_string()),
                }),
                None => entries.push(Dependency {
                    name: line.to_string(),
                    spec: None,
                }),
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
