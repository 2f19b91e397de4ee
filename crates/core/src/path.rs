//! Path-like inputs and their conversion to filesystem paths
//!
//! Callers hand locations around in several shapes (typed text, raw OS
//! strings, `file:` URIs, existing paths). `PathSource` names the shape
//! explicitly so conversion is one match instead of guessing at types.

use crate::error::{FsError, Result};
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A value that names a filesystem location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSource {
    /// Path text, e.g. from the command line or a config file
    Text(String),
    /// Platform string, not necessarily valid UTF-8
    Os(OsString),
    /// `file:` URI
    Uri(String),
    /// Already a path
    Resolved(PathBuf),
}

/// Convert a path source into a path
///
/// Pure: the filesystem is not consulted, so the result may not exist.
pub fn to_path(source: &PathSource) -> Result<PathBuf> {
    match source {
        PathSource::Text(text) => {
            if text.is_empty() {
                return Err(FsError::EmptyPath);
            }
            Ok(PathBuf::from(text))
        }
        PathSource::Os(os) => {
            if os.is_empty() {
                return Err(FsError::EmptyPath);
            }
            Ok(PathBuf::from(os))
        }
        PathSource::Uri(uri) => from_file_uri(uri),
        PathSource::Resolved(path) => {
            if path.as_os_str().is_empty() {
                return Err(FsError::EmptyPath);
            }
            Ok(path.clone())
        }
    }
}

/// Parse `file:///abs`, `file://localhost/abs` and `file:/abs`
fn from_file_uri(uri: &str) -> Result<PathBuf> {
    let invalid = |reason: &str| FsError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = uri.split_once(':').ok_or_else(|| invalid("missing scheme"))?;
    if !scheme.eq_ignore_ascii_case("file") {
        return Err(invalid("only file URIs name local paths"));
    }

    let encoded = if let Some(authority_and_path) = rest.strip_prefix("//") {
        let slash = authority_and_path
            .find('/')
            .ok_or_else(|| invalid("missing path"))?;
        let (host, path) = authority_and_path.split_at(slash);
        if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
            return Err(invalid("remote hosts are not supported"));
        }
        path
    } else if rest.starts_with('/') {
        rest
    } else {
        return Err(invalid("path must be absolute"));
    };

    // Query and fragment never name part of the file
    let encoded = encoded
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let decoded = urlencoding::decode(encoded)
        .map_err(|_| invalid("path is not valid UTF-8 after decoding"))?;

    Ok(platform_path(decoded))
}

#[cfg(windows)]
fn platform_path(decoded: Cow<'_, str>) -> PathBuf {
    // "/C:/dir" names "C:/dir"
    let bytes = decoded.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        return PathBuf::from(&decoded[1..]);
    }
    PathBuf::from(decoded.into_owned())
}

#[cfg(not(windows))]
fn platform_path(decoded: Cow<'_, str>) -> PathBuf {
    PathBuf::from(decoded.into_owned())
}

impl From<&str> for PathSource {
    fn from(text: &str) -> Self {
        PathSource::Text(text.to_string())
    }
}

impl From<String> for PathSource {
    fn from(text: String) -> Self {
        PathSource::Text(text)
    }
}

impl From<OsString> for PathSource {
    fn from(os: OsString) -> Self {
        PathSource::Os(os)
    }
}

impl From<&Path> for PathSource {
    fn from(path: &Path) -> Self {
        PathSource::Resolved(path.to_path_buf())
    }
}

impl From<PathBuf> for PathSource {
    fn from(path: PathBuf) -> Self {
        PathSource::Resolved(path)
    }
}

impl From<&PathBuf> for PathSource {
    fn from(path: &PathBuf) -> Self {
        PathSource::Resolved(path.clone())
    }
}
