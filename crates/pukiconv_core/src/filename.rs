//! PukiWiki page and attachment filenames.
//!
//! PukiWiki stores a page title as the uppercase hex of its encoded bytes, so
//! `FrontPage` becomes `46726F6E7450616765.txt`. Attachments join the page
//! and the file name with `_`. Re-encoding a name means decoding every
//! `_`-separated token from the legacy encoding and hex-encoding its UTF-8
//! bytes again. Whatever follows the first `.` is carried over untouched.

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::error::ConversionError;

pub const TOKEN_SEPARATOR: &str = "_";

/// Split `name` at its first `.` into `(stem, extension)`. The extension keeps
/// its leading dot and is empty when the name has none.
pub fn split_filename(name: &str) -> Result<(&str, &str), ConversionError> {
    let (stem, extension) = match name.find('.') {
        Some(index) => name.split_at(index),
        None => (name, ""),
    };
    if stem.is_empty() || extension == "." {
        return Err(ConversionError::MalformedFilename {
            name: name.to_string(),
        });
    }
    Ok((stem, extension))
}

/// Re-encode a single hex token from `encoding` to UTF-8 hex.
pub fn convert_token(token: &str, encoding: &'static Encoding) -> Result<String, ConversionError> {
    let bytes = hex::decode(token).map_err(|_| ConversionError::InvalidHex {
        token: token.to_string(),
    })?;
    let decoded = encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .ok_or_else(|| ConversionError::Encoding {
            what: format!("filename token `{token}`"),
            encoding: encoding.name(),
        })?;
    Ok(hex::encode_upper(decoded.as_bytes()))
}

/// Re-encode every token of `name`'s stem and append the original extension.
pub fn convert_filename(name: &str, encoding: &'static Encoding) -> Result<String, ConversionError> {
    let (stem, extension) = split_filename(name)?;
    let tokens = stem
        .split(TOKEN_SEPARATOR)
        .map(|token| convert_token(token, encoding))
        .collect::<Result<Vec<_>, _>>()?;
    let mut converted = tokens.join(TOKEN_SEPARATOR);
    converted.push_str(extension);
    Ok(converted)
}

/// Destination path for `source` inside `destination_dir`.
pub fn destination_path(
    source: &Path,
    destination_dir: &Path,
    encoding: &'static Encoding,
) -> Result<PathBuf, ConversionError> {
    let name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ConversionError::MalformedFilename {
            name: source.to_string_lossy().into_owned(),
        })?;
    Ok(destination_dir.join(convert_filename(name, encoding)?))
}
