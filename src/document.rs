//! Input values of one pipeline run.
//!
//! A run starts from a [`RawDocument`] (the page exactly as saved) and an
//! [`ApiCredential`]. The reducer derives a [`ReducedDocument`] from the raw
//! page; neither value is ever written back or cached.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoding;
use crate::error::{Error, Result};
use crate::text;

/// Number of characters shown by [`RawDocument::preview`].
pub const PREVIEW_CHARS: usize = 5_000;

/// File extension of candidate documents.
const CANDIDATE_EXTENSION: &str = "html";

/// The unmodified markup of one article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    html: String,
}

impl RawDocument {
    /// Wraps markup that is already UTF-8.
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Decodes saved page bytes, honouring the declared charset.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(encoding::decode_document(bytes))
    }

    /// Reads and decodes a document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Ok(Self::from_bytes(&bytes))
    }

    /// The markup as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// The first [`PREVIEW_CHARS`] characters of the markup.
    #[must_use]
    pub fn preview(&self) -> &str {
        text::truncate_chars(&self.html, PREVIEW_CHARS)
    }
}

impl From<String> for RawDocument {
    fn from(html: String) -> Self {
        Self::new(html)
    }
}

impl From<&str> for RawDocument {
    fn from(html: &str) -> Self {
        Self::new(html)
    }
}

/// Noise-free, size-bounded markup prepared for the model prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedDocument {
    html: String,
}

impl ReducedDocument {
    pub(crate) fn new(html: String) -> Self {
        Self { html }
    }

    /// The reduced markup.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// Length in characters (the unit the size bound is expressed in).
    #[must_use]
    pub fn char_len(&self) -> usize {
        text::char_len(&self.html)
    }
}

impl fmt::Display for ReducedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

/// API key for the model provider.
///
/// Guaranteed non-empty. `Debug` output is redacted so the key never ends
/// up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// Validates and wraps a key. Surrounding whitespace is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] for an empty or blank key.
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(Error::MissingCredential);
        }
        Ok(Self(key.to_string()))
    }

    /// Builds a credential from an optional value (CLI flag or environment).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when the value is absent or blank.
    pub fn from_optional(key: Option<&str>) -> Result<Self> {
        key.map_or(Err(Error::MissingCredential), Self::new)
    }

    /// The secret itself, for building the authorization header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

/// Lists the `.html` files of `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be read.
pub fn list_candidates(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CANDIDATE_EXTENSION));
        if path.is_file() && is_html {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
