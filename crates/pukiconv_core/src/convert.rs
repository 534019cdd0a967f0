use std::path::Path;

use glob::Pattern;
use serde::Serialize;
use tracing::info;

use crate::config::ConvertOptions;
use crate::error::TreeError;
use crate::layout::{DestinationTree, SourceTree, scaffold, validate_destination, validate_source};
use crate::transcode::Strategy;
use crate::walker::{ProgressReporter, each_file};

/// One row of the dispatch table: which files of a subdirectory get which strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryRule {
    pub subdir: &'static str,
    pub pattern: &'static str,
    pub strategy: Strategy,
}

impl DirectoryRule {
    /// Compiled glob for this rule. Built-in patterns are always valid.
    pub fn pattern(&self) -> Pattern {
        Pattern::new(self.pattern)
            .unwrap_or_else(|err| unreachable!("invalid built-in pattern {}: {err}", self.pattern))
    }
}

pub const DIRECTORY_RULES: &[DirectoryRule] = &[
    DirectoryRule {
        subdir: "wiki",
        pattern: "*.txt",
        strategy: Strategy::TextTranscode,
    },
    DirectoryRule {
        subdir: "backup",
        pattern: "*.gz",
        strategy: Strategy::GzipTranscode,
    },
    DirectoryRule {
        subdir: "diff",
        pattern: "*.txt",
        strategy: Strategy::TextTranscode,
    },
    DirectoryRule {
        subdir: "attach",
        pattern: "*_*",
        strategy: Strategy::RawCopy,
    },
    DirectoryRule {
        subdir: "cache",
        pattern: "*.*",
        strategy: Strategy::TextTranscode,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub subdir: String,
    pub pattern: String,
    pub strategy: Strategy,
    pub converted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub directories: Vec<DirectoryReport>,
}

impl ConversionReport {
    pub fn total_converted(&self) -> usize {
        self.directories.iter().map(|dir| dir.converted).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.directories.iter().map(|dir| dir.failed).sum()
    }
}

/// Validate both trees, scaffold the destination and convert every subdirectory.
///
/// Only pre-flight problems are returned as errors. Per-file failures go to
/// `reporter` and are counted in the report.
pub fn run_conversion(
    source: &Path,
    destination: &Path,
    options: &ConvertOptions,
    reporter: &mut dyn ProgressReporter,
) -> Result<ConversionReport, TreeError> {
    let source = validate_source(source)?;
    validate_destination(destination)?;
    let destination = scaffold(destination)?;
    info!(
        source = %source.root().display(),
        destination = %destination.root().display(),
        encoding = options.encoding.name(),
        "converting PukiWiki data tree"
    );

    let directories = DIRECTORY_RULES
        .iter()
        .map(|rule| convert_directory(&source, &destination, rule, options, reporter))
        .collect();
    Ok(ConversionReport { directories })
}

fn convert_directory(
    source: &SourceTree,
    destination: &DestinationTree,
    rule: &DirectoryRule,
    options: &ConvertOptions,
    reporter: &mut dyn ProgressReporter,
) -> DirectoryReport {
    let source_dir = source.subdir(rule.subdir);
    let destination_dir = destination.subdir(rule.subdir);
    let outcome = each_file(&source_dir, &rule.pattern(), reporter, |path| {
        rule.strategy.convert(path, &destination_dir, options)
    });
    info!(
        subdir = rule.subdir,
        strategy = rule.strategy.as_str(),
        converted = outcome.converted,
        failed = outcome.failed,
        "finished subdirectory"
    );
    DirectoryReport {
        subdir: rule.subdir.to_string(),
        pattern: rule.pattern.to_string(),
        strategy: rule.strategy,
        converted: outcome.converted,
        failed: outcome.failed,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Read, Write};
    use std::path::PathBuf;

    use encoding_rs::EUC_JP;
    use filetime::{FileTime, set_file_mtime};
    use flate2::Compression;
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use tempfile::tempdir;

    use super::*;
    use crate::layout::PUKIWIKI_DIRS;
    use crate::walker::tests::RecordingReporter;

    fn euc(text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = EUC_JP.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    fn source_tree(root: &Path) {
        for name in PUKIWIKI_DIRS {
            fs::create_dir_all(root.join(name)).expect("create subdir");
        }
    }

    fn write_with_mtime(path: PathBuf, bytes: &[u8], mtime: FileTime) {
        fs::write(&path, bytes).expect("write file");
        set_file_mtime(&path, mtime).expect("set mtime");
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("gzip write");
        encoder.finish().expect("gzip finish")
    }

    fn mtime_of(path: &Path) -> FileTime {
        FileTime::from_last_modification_time(&fs::metadata(path).expect("metadata"))
    }

    #[test]
    fn converts_a_full_tree() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("euc");
        let dst = temp.path().join("utf8");
        source_tree(&src);
        let mtime = FileTime::from_unix_time(1_200_000_000, 0);

        // テスト
        write_with_mtime(src.join("wiki/A5C6A5B9A5C8.txt"), &euc("テスト本文\n"), mtime);
        write_with_mtime(
            src.join("backup/A5C6A5B9A5C8.gz"),
            &gzip(&euc(">>>>>>>>>> 1200000000\nテスト\n")),
            mtime,
        );
        write_with_mtime(src.join("diff/A5C6A5B9A5C8.txt"), &euc("+テスト\n"), mtime);
        write_with_mtime(src.join("attach/A5C6A5B9A5C8_612E706E67"), b"\x89PNG\xA4", mtime);
        write_with_mtime(src.join("cache/A5C6A5B9A5C8.rel"), &euc("[[テスト]]"), mtime);

        let mut reporter = RecordingReporter::default();
        let report = run_conversion(&src, &dst, &ConvertOptions::default(), &mut reporter)
            .expect("run");

        assert_eq!(report.total_converted(), 5);
        assert_eq!(report.total_failed(), 0);
        assert!(reporter.failures.is_empty());
        assert_eq!(reporter.processed.len(), 5);

        let stem = "E38386E382B9E38388";
        let page = dst.join(format!("wiki/{stem}.txt"));
        assert_eq!(fs::read_to_string(&page).expect("read page"), "テスト本文\n");
        assert_eq!(mtime_of(&page), mtime);

        let backup = dst.join(format!("backup/{stem}.gz"));
        let mut inflated = String::new();
        GzDecoder::new(fs::File::open(&backup).expect("open backup"))
            .read_to_string(&mut inflated)
            .expect("inflate");
        assert_eq!(inflated, ">>>>>>>>>> 1200000000\nテスト\n");
        assert_eq!(mtime_of(&backup), mtime);

        let diff = dst.join(format!("diff/{stem}.txt"));
        assert_eq!(fs::read_to_string(&diff).expect("read diff"), "+テスト\n");

        let attach = dst.join(format!("attach/{stem}_612E706E67"));
        assert_eq!(fs::read(&attach).expect("read attach"), b"\x89PNG\xA4");

        let cache = dst.join(format!("cache/{stem}.rel"));
        assert_eq!(fs::read_to_string(&cache).expect("read cache"), "[[テスト]]");
    }

    #[test]
    fn bad_files_do_not_stop_the_batch() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("euc");
        let dst = temp.path().join("utf8");
        source_tree(&src);
        fs::write(src.join("wiki/A4A2.txt"), euc("あ")).expect("write");
        fs::write(src.join("wiki/A4A4.txt"), euc("い")).expect("write");
        fs::write(src.join("wiki/ZZ.txt"), euc("bad name")).expect("write");
        fs::write(src.join("wiki/A4A6.txt"), b"\xA4").expect("write");
        fs::write(src.join("backup/A4A2.gz"), b"plain").expect("write");

        let mut reporter = RecordingReporter::default();
        let report = run_conversion(&src, &dst, &ConvertOptions::default(), &mut reporter)
            .expect("run");

        assert_eq!(report.total_converted(), 2);
        assert_eq!(report.total_failed(), 3);
        assert_eq!(reporter.failures.len(), 3);
        assert!(dst.join("wiki/E38182.txt").is_file());
        assert!(dst.join("wiki/E38184.txt").is_file());
        let wiki = &report.directories[0];
        assert_eq!((wiki.subdir.as_str(), wiki.converted, wiki.failed), ("wiki", 2, 2));
    }

    #[test]
    fn empty_source_still_scaffolds_destination() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("euc");
        let dst = temp.path().join("utf8");
        source_tree(&src);

        let mut reporter = RecordingReporter::default();
        let report = run_conversion(&src, &dst, &ConvertOptions::default(), &mut reporter)
            .expect("run");

        assert_eq!(report.directories.len(), 5);
        assert_eq!(report.total_converted(), 0);
        for name in PUKIWIKI_DIRS {
            assert!(dst.join(name).is_dir(), "{name} missing");
        }
        assert_eq!(fs::read_dir(&dst).expect("read dst").count(), 5);
    }

    #[test]
    fn missing_cache_fails_before_writing() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("euc");
        let dst = temp.path().join("utf8");
        for name in ["wiki", "backup", "attach", "diff"] {
            fs::create_dir_all(src.join(name)).expect("create subdir");
        }
        fs::write(src.join("wiki/A4A2.txt"), euc("あ")).expect("write");

        let mut reporter = RecordingReporter::default();
        let error = run_conversion(&src, &dst, &ConvertOptions::default(), &mut reporter)
            .expect_err("must fail");

        assert!(matches!(error, TreeError::InvalidSourceTree { .. }));
        assert!(!dst.exists());
        assert!(reporter.processed.is_empty());
    }

    #[test]
    fn non_empty_destination_is_left_untouched() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("euc");
        let dst = temp.path().join("utf8");
        source_tree(&src);
        fs::write(src.join("wiki/A4A2.txt"), euc("あ")).expect("write");
        fs::create_dir_all(&dst).expect("create dst");
        fs::write(dst.join("existing.txt"), b"keep").expect("write");

        let mut reporter = RecordingReporter::default();
        let error = run_conversion(&src, &dst, &ConvertOptions::default(), &mut reporter)
            .expect_err("must fail");

        assert!(matches!(error, TreeError::NonEmptyDestination { .. }));
        assert_eq!(fs::read_dir(&dst).expect("read dst").count(), 1);
        assert_eq!(fs::read(dst.join("existing.txt")).expect("read"), b"keep");
    }

    #[test]
    fn dispatch_table_covers_every_subdirectory_once() {
        let mut subdirs: Vec<&str> = DIRECTORY_RULES.iter().map(|rule| rule.subdir).collect();
        subdirs.sort_unstable();
        let mut expected = PUKIWIKI_DIRS.to_vec();
        expected.sort_unstable();
        assert_eq!(subdirs, expected);
        let samples = [
            ("wiki", "A4A2.txt"),
            ("backup", "A4A2.gz"),
            ("diff", "A4A2.txt"),
            ("attach", "A4A2_696D67"),
            ("cache", "A4A2.rel"),
        ];
        for (rule, (subdir, name)) in DIRECTORY_RULES.iter().zip(samples) {
            assert_eq!(rule.subdir, subdir);
            assert!(rule.pattern().matches(name), "{subdir} should match {name}");
        }
        let attach = DIRECTORY_RULES[3].pattern();
        assert!(!attach.matches("index.html"));
    }
}
