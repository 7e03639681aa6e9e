use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectListError {
    #[error("cannot read object list `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("object list `{}` contains no objects", path.display())]
    Empty { path: PathBuf },
}

/// Reads one identifier per line. Lines are trimmed and blank lines skipped.
pub fn load_objects(path: &Path) -> Result<Vec<String>, ObjectListError> {
    let raw = fs::read_to_string(path).map_err(|source| ObjectListError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let objects = parse_objects(&raw);
    if objects.is_empty() {
        return Err(ObjectListError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(objects)
}

pub fn parse_objects(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
