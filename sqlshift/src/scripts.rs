//! Versioned migration script resolution.
//!
//! Scripts live in a configurable directory (the original "SQL bundle") and
//! are named by version identifier, e.g. `16061700.sql`. Version identifiers
//! are opaque, lexically sortable strings; sorting the stems yields the
//! migration timeline and the largest stem is the latest version.

use itertools::Itertools;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::common::SCRIPT_EXTENSION;
use crate::errors::{ErrorKind, SqlShiftError, SqlShiftResult};
use crate::snapshot::{SchemaSnapshot, SnapshotLoader};

static VERSION_STEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z][0-9A-Za-z_.-]*$").expect("version stem pattern"));

/// Locates and loads versioned migration scripts from a directory.
pub struct ScriptRepository {
    dir: PathBuf,
}

impl ScriptRepository {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        ScriptRepository { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All known version identifiers, sorted ascending.
    ///
    /// Files without the script extension or with a non-conforming stem are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the script directory does not exist.
    pub fn versions(&self) -> SqlShiftResult<Vec<String>> {
        if !self.dir.is_dir() {
            log::error!("Script directory {} does not exist", self.dir.display());
            return Err(SqlShiftError::new(
                &format!("Script directory {} does not exist", self.dir.display()),
                ErrorKind::ResourceNotFound,
            ));
        }

        let mut stems = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if VERSION_STEM.is_match(stem) => stems.push(stem.to_string()),
                _ => {
                    log::warn!(
                        "Skipping script with non-conforming name: {}",
                        path.display()
                    );
                }
            }
        }

        Ok(stems.into_iter().sorted().collect())
    }

    /// The latest known version identifier, if any script exists.
    pub fn latest(&self) -> SqlShiftResult<Option<String>> {
        Ok(self.versions()?.into_iter().last())
    }

    /// Resolves a version identifier to its script path.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if no script exists for `version`.
    pub fn resolve(&self, version: &str) -> SqlShiftResult<PathBuf> {
        let path = self
            .dir
            .join(format!("{}.{}", version, SCRIPT_EXTENSION));
        if !path.is_file() {
            return Err(SqlShiftError::new(
                &format!("No migration script found for version {}", version),
                ErrorKind::ResourceNotFound,
            ));
        }
        Ok(path)
    }

    /// Loads and parses the snapshot declared by `version`.
    pub fn load(&self, version: &str) -> SqlShiftResult<SchemaSnapshot> {
        let path = self.resolve(version)?;
        let script = fs::read_to_string(&path)?;
        SnapshotLoader::parse(version, &script)
    }
}
