//! Configuration options for selector inference and extraction.
//!
//! `Options` is a plain value: construct it with struct-update syntax, or
//! load it from a TOML file. The API credential is never part of it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default base URL of the chat-completions API.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Configuration options for the pipeline.
///
/// # Example
///
/// ```rust
/// use rs_xpath_extract::Options;
///
/// let options = Options {
///     content_limit: 500,
///     ..Options::default()
/// };
/// assert_eq!(options.model, "gpt-4o");
///
/// let options = Options::from_toml_str("model = \"gpt-4o-mini\"")?;
/// assert_eq!(options.content_limit, 2_000);
/// # Ok::<(), rs_xpath_extract::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Model identifier sent with every inference request.
    ///
    /// Default: `"gpt-4o"`
    pub model: String,

    /// Base URL of the chat-completions API; `/chat/completions` is appended.
    ///
    /// Default: `"https://api.openai.com/v1"`
    pub endpoint: String,

    /// Upper bound on one model call, in seconds.
    ///
    /// Default: `60`
    pub request_timeout_secs: u64,

    /// Maximum length of the reduced document, in characters.
    ///
    /// Default: `12_000`
    pub max_reduced_chars: usize,

    /// Maximum length of the extracted content, in characters.
    ///
    /// Default: `2_000`
    pub content_limit: usize,

    /// Directory scanned for candidate `.html` documents.
    ///
    /// Default: `"html"`
    pub html_dir: PathBuf,

    /// Trace collector settings. When `None`, events are only logged.
    ///
    /// Default: `None`
    pub trace: Option<TraceOptions>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 60,
            max_reduced_chars: crate::reducer::MAX_REDUCED_CHARS,
            content_limit: crate::evaluator::DEFAULT_CONTENT_LIMIT,
            html_dir: PathBuf::from("html"),
            trace: None,
        }
    }
}

/// Where inference trace events are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceOptions {
    /// Project name attached to every event.
    pub project: String,

    /// Collector URL events are POSTed to. Without one, events are logged.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the collector.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Options {
    /// Parses options from TOML text; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed TOML, unknown keys or values
    /// that fail [`Options::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`Options::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), strip_prefix(&e))))
    }

    /// Checks values that cannot be expressed in the type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when an endpoint is not an absolute
    /// `http(s)` URL, the model name is empty, or a limit is zero.
    pub fn validate(&self) -> Result<()> {
        check_http_url("endpoint", &self.endpoint)?;
        if let Some(trace) = &self.trace {
            if let Some(endpoint) = &trace.endpoint {
                check_http_url("trace.endpoint", endpoint)?;
            }
            if trace.project.trim().is_empty() {
                return Err(Error::Config("trace.project must not be empty".into()));
            }
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        if self.max_reduced_chars == 0 {
            return Err(Error::Config("max_reduced_chars must be positive".into()));
        }
        Ok(())
    }

    /// The model call timeout as a [`Duration`].
    #[must_use]
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn check_http_url(key: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("{key} '{value}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{key} '{value}': unsupported scheme '{other}'"
        ))),
    }
}

fn strip_prefix(error: &Error) -> String {
    match error {
        Error::Config(message) => message.clone(),
        other => other.to_string(),
    }
}
