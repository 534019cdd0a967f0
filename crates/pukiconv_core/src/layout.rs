use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TreeError;

/// The fixed subdirectories of a PukiWiki data tree.
pub const PUKIWIKI_DIRS: &[&str] = &["wiki", "backup", "attach", "diff", "cache"];

/// A validated PukiWiki data root to read from.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
}

/// A scaffolded, initially empty root to write into.
#[derive(Debug, Clone)]
pub struct DestinationTree {
    root: PathBuf,
}

impl SourceTree {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subdir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl DestinationTree {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subdir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Fails unless every entry of [`PUKIWIKI_DIRS`] is a directory under `root`.
pub fn validate_source(root: &Path) -> Result<SourceTree, TreeError> {
    let missing: Vec<String> = PUKIWIKI_DIRS
        .iter()
        .filter(|name| !root.join(name).is_dir())
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TreeError::InvalidSourceTree {
            root: root.to_path_buf(),
            missing,
        });
    }
    Ok(SourceTree {
        root: root.to_path_buf(),
    })
}

/// Fails unless `root` is absent or an empty directory.
pub fn validate_destination(root: &Path) -> Result<(), TreeError> {
    let mut entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) if root.exists() && !root.is_dir() => {
            debug!(root = %root.display(), error = %err, "destination is not a directory");
            return Err(TreeError::NonEmptyDestination {
                root: root.to_path_buf(),
            });
        }
        Err(err) => {
            return Err(TreeError::Io {
                path: root.to_path_buf(),
                source: err,
            });
        }
    };
    if entries.next().is_some() {
        return Err(TreeError::NonEmptyDestination {
            root: root.to_path_buf(),
        });
    }
    Ok(())
}

/// Create `root` (if needed) and every PukiWiki subdirectory under it.
pub fn scaffold(root: &Path) -> Result<DestinationTree, TreeError> {
    fs::create_dir_all(root).map_err(|err| TreeError::Io {
        path: root.to_path_buf(),
        source: err,
    })?;
    for name in PUKIWIKI_DIRS {
        let dir = root.join(name);
        fs::create_dir(&dir).map_err(|err| TreeError::Io {
            path: dir.clone(),
            source: err,
        })?;
        debug!(dir = %dir.display(), "created");
    }
    Ok(DestinationTree {
        root: root.to_path_buf(),
    })
}
