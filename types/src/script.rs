//! Migration script naming and parsing.
//!
//! Scripts are named `<version>_<name>.sql`. The version is the leading run
//! of ASCII digits; a file without one uses the part before the first `_`
//! (or the whole stem). The body is split by `-- migrate:up` and
//! `-- migrate:down` marker lines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which way a migration runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

pub const UP_MARKER: &str = "-- migrate:up";
pub const DOWN_MARKER: &str = "-- migrate:down";
pub const SCRIPT_EXTENSION: &str = "sql";

/// A loaded migration script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationScript {
    pub version: String,
    pub name: String,
    pub path: PathBuf,
    pub up: String,
    pub down: String,
}

impl MigrationScript {
    pub fn sql(&self, direction: Direction) -> &str {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Extract the version from a script file name such as
/// `20240101000001_create_users.sql`. Returns `None` for non-script names.
pub fn version_from_filename(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(&format!(".{SCRIPT_EXTENSION}"))?;
    let digits = stem.bytes().take_while(u8::is_ascii_digit).count();
    let version = if digits > 0 {
        &stem[..digits]
    } else {
        stem.split('_').next().unwrap_or(stem)
    };
    (!version.is_empty()).then_some(version)
}

/// The descriptive part of a script name (after `<version>_`).
pub fn name_from_filename(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(&format!(".{SCRIPT_EXTENSION}"))
        .unwrap_or(file_name);
    match stem.split_once('_') {
        Some((_, name)) => name.to_string(),
        None => String::new(),
    }
}

/// Split a script body into its up and down sections.
///
/// Text before any marker counts as `up`, so a plain SQL file is treated as
/// forward-only.
pub fn split_sections(body: &str) -> (String, String) {
    let mut up = String::new();
    let mut down = String::new();
    let mut in_down = false;
    for line in body.lines() {
        match line.trim() {
            UP_MARKER => in_down = false,
            DOWN_MARKER => in_down = true,
            _ => {
                let target = if in_down { &mut down } else { &mut up };
                target.push_str(line);
                target.push('\n');
            }
        }
    }
    (up.trim().to_string(), down.trim().to_string())
}
