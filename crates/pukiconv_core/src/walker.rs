use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::ConversionError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Operator-facing progress sink for a batch walk.
pub trait ProgressReporter {
    fn processing(&mut self, path: &Path);
    fn failed(&mut self, path: &Path, error: &ConversionError);
    fn converted(&mut self, _source: &Path, _destination: &Path) {}
}

/// Counts for one walked directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    pub converted: usize,
    pub failed: usize,
}

/// Files directly inside `dir` whose names match `pattern`, sorted by name.
pub fn matching_files(dir: &Path, pattern: &Pattern) -> Result<Vec<PathBuf>, ConversionError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| ConversionError::io(dir, io::Error::from(err)))?;
        let name = entry.file_name().to_string_lossy();
        if !pattern.matches_with(&name, MATCH_OPTIONS) {
            continue;
        }
        if !entry.path().is_file() {
            debug!(path = %entry.path().display(), "skipping non-file entry");
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Run `convert` on every file of `dir` matching `pattern`.
///
/// A failing file is handed to the reporter and the walk moves on; nothing
/// here aborts the batch. If `dir` itself cannot be listed, that is reported
/// once against `dir` and counted as a single failure.
pub fn each_file<F>(
    dir: &Path,
    pattern: &Pattern,
    reporter: &mut dyn ProgressReporter,
    mut convert: F,
) -> WalkOutcome
where
    F: FnMut(&Path) -> Result<PathBuf, ConversionError>,
{
    let mut outcome = WalkOutcome::default();
    let files = match matching_files(dir, pattern) {
        Ok(files) => files,
        Err(error) => {
            reporter.failed(dir, &error);
            outcome.failed += 1;
            return outcome;
        }
    };

    for path in files {
        reporter.processing(&path);
        match convert(&path) {
            Ok(destination) => {
                reporter.converted(&path, &destination);
                outcome.converted += 1;
            }
            Err(error) => {
                reporter.failed(&path, &error);
                outcome.failed += 1;
            }
        }
    }
    outcome
}
