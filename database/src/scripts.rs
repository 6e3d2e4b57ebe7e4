//! The on-disk migration script directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use migtrack_types::script::{name_from_filename, split_sections, version_from_filename};
use migtrack_types::MigrationScript;

use crate::DatabaseError;

/// A script file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptFile {
    pub version: String,
    pub path: PathBuf,
}

/// Lookup of migration scripts by version prefix.
#[derive(Clone, Debug)]
pub struct MigrationScripts {
    dir: PathBuf,
}

impl MigrationScripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All script files, sorted by version. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<ScriptFile>, DatabaseError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(version) = version_from_filename(name) {
                files.push(ScriptFile {
                    version: version.to_string(),
                    path: entry.path(),
                });
            }
        }
        files.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));
        Ok(files)
    }

    /// Path of the script for `version`, if one is on disk.
    pub fn find(&self, version: &str) -> Result<Option<PathBuf>, DatabaseError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|f| f.version == version)
            .map(|f| f.path))
    }

    pub fn exists(&self, version: &str) -> Result<bool, DatabaseError> {
        Ok(self.find(version)?.is_some())
    }

    /// Load and parse the script for `version`.
    pub fn load(&self, version: &str) -> Result<Option<MigrationScript>, DatabaseError> {
        match self.find(version)? {
            Some(path) => Ok(Some(Self::load_path(&path)?)),
            None => Ok(None),
        }
    }

    pub fn load_path(path: &Path) -> Result<MigrationScript, DatabaseError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DatabaseError::InvalidScript {
                path: path.display().to_string(),
                reason: "file name is not valid UTF-8".into(),
            })?;
        let version = version_from_filename(file_name).ok_or_else(|| DatabaseError::InvalidScript {
            path: path.display().to_string(),
            reason: "no version prefix".into(),
        })?;
        let body = fs::read_to_string(path)?;
        let (up, down) = split_sections(&body);
        Ok(MigrationScript {
            version: version.to_string(),
            name: name_from_filename(file_name),
            path: path.to_path_buf(),
            up,
            down,
        })
    }

    /// Write a script file into the directory, creating it if needed.
    /// Only the file-name component of `file_name` is used.
    pub fn write_script(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, DatabaseError> {
        let base = Path::new(file_name)
            .file_name()
            .ok_or_else(|| DatabaseError::InvalidScript {
                path: file_name.to_string(),
                reason: "no file name".into(),
            })?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(base);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
