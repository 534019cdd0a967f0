//! Per-file conversion strategies.
//!
//! Every strategy derives the destination name through [`crate::filename`],
//! writes exactly one destination file, and (except for an opted-out raw copy)
//! stamps it with the source file's modification time.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use filetime::FileTime;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::debug;

use crate::config::ConvertOptions;
use crate::error::ConversionError;
use crate::filename::destination_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Attachments: bytes copied verbatim, only the name is re-encoded.
    RawCopy,
    /// Page text, diffs and caches.
    TextTranscode,
    /// Gzip-compressed page backups.
    GzipTranscode,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawCopy => "raw_copy",
            Self::TextTranscode => "text_transcode",
            Self::GzipTranscode => "gzip_transcode",
        }
    }

    /// Convert `source` into `destination_dir`, returning the written path.
    pub fn convert(
        self,
        source: &Path,
        destination_dir: &Path,
        options: &ConvertOptions,
    ) -> Result<PathBuf, ConversionError> {
        let destination = destination_path(source, destination_dir, options.encoding)?;
        match self {
            Self::RawCopy => raw_copy(source, &destination, options.preserve_raw_copy_mtime)?,
            Self::TextTranscode => text_transcode(source, &destination, options.encoding)?,
            Self::GzipTranscode => gzip_transcode(source, &destination, options.encoding)?,
        }
        Ok(destination)
    }
}

/// Decode `content` from `encoding` and return its UTF-8 bytes. Line endings
/// and every other character are passed through as-is.
pub fn transcode_content(
    content: &[u8],
    encoding: &'static Encoding,
) -> Result<Vec<u8>, ConversionError> {
    let decoded = encoding
        .decode_without_bom_handling_and_without_replacement(content)
        .ok_or_else(|| ConversionError::Encoding {
            what: "file content".to_string(),
            encoding: encoding.name(),
        })?;
    Ok(decoded.into_owned().into_bytes())
}

fn raw_copy(source: &Path, destination: &Path, preserve_mtime: bool) -> Result<(), ConversionError> {
    let mtime = if preserve_mtime {
        Some(source_mtime(source)?)
    } else {
        None
    };
    let copied = fs::copy(source, destination).map_err(|e| ConversionError::io(destination, e))?;
    debug!(source = %source.display(), destination = %destination.display(), bytes = copied, "copied");
    if let Some(mtime) = mtime {
        restore_mtime(destination, mtime)?;
    }
    Ok(())
}

fn text_transcode(
    source: &Path,
    destination: &Path,
    encoding: &'static Encoding,
) -> Result<(), ConversionError> {
    let mtime = source_mtime(source)?;
    let content = fs::read(source).map_err(|e| ConversionError::io(source, e))?;
    let converted = transcode_content(&content, encoding)?;
    fs::write(destination, &converted).map_err(|e| ConversionError::io(destination, e))?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        source_bytes = content.len(),
        written_bytes = converted.len(),
        "transcoded"
    );
    restore_mtime(destination, mtime)
}

fn gzip_transcode(
    source: &Path,
    destination: &Path,
    encoding: &'static Encoding,
) -> Result<(), ConversionError> {
    let mtime = source_mtime(source)?;
    let file = File::open(source).map_err(|e| ConversionError::io(source, e))?;
    let mut content = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut content)
        .map_err(|e| ConversionError::Decompression {
            path: source.to_path_buf(),
            source: e,
        })?;
    let converted = transcode_content(&content, encoding)?;

    let output = File::create(destination).map_err(|e| ConversionError::io(destination, e))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    encoder
        .write_all(&converted)
        .map_err(|e| ConversionError::io(destination, e))?;
    let output = encoder
        .finish()
        .map_err(|e| ConversionError::io(destination, e))?;
    drop(output);
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        inflated_bytes = content.len(),
        written_bytes = converted.len(),
        "transcoded gzip"
    );
    restore_mtime(destination, mtime)
}

fn source_mtime(source: &Path) -> Result<FileTime, ConversionError> {
    let metadata = fs::metadata(source).map_err(|e| ConversionError::io(source, e))?;
    Ok(FileTime::from_last_modification_time(&metadata))
}

fn restore_mtime(destination: &Path, mtime: FileTime) -> Result<(), ConversionError> {
    filetime::set_file_times(destination, FileTime::now(), mtime)
        .map_err(|e| ConversionError::io(destination, e))?;
    debug!(destination = %destination.display(), mtime = mtime.unix_seconds(), "restored mtime");
    Ok(())
}
