//! The four-field selector set produced by inference.
//!
//! Model output is never trusted directly: [`SelectorSet::from_model_output`]
//! parses the response as JSON and checks every field before a
//! `SelectorSet` exists. The JSON schema handed to the model is derived from
//! the same field list with `schemars`.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Field names, in the order the prompt and schema list them.
pub const FIELD_NAMES: [&str; 4] = [
    "title_selector",
    "date_selector",
    "date_format_pattern",
    "content_selector",
];

/// A single surrounding markdown code fence, optionally tagged `json`.
#[allow(clippy::expect_used)]
static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*\z").expect("valid code fence regex")
});

/// Wire shape of the structured response. Only used to derive the schema.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct SelectorSchema {
    /// XPath expression matching exactly the article title element.
    title_selector: String,
    /// XPath expression matching exactly the publication date element.
    date_selector: String,
    /// How the matched date text is formatted, e.g. `YYYY-MM-DD`.
    date_format_pattern: String,
    /// XPath expression matching the element(s) holding the article body, e.g. its paragraphs.
    content_selector: String,
}

/// Validated locators for one document.
///
/// All four fields are non-empty and trimmed. `date_format_pattern` is
/// informational; extraction returns the matched date text unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SelectorFields")]
pub struct SelectorSet {
    title_selector: String,
    date_selector: String,
    date_format_pattern: String,
    content_selector: String,
}

/// Unchecked fields, the input of `SelectorSet`'s `Deserialize`.
#[derive(Deserialize)]
struct SelectorFields {
    title_selector: String,
    date_selector: String,
    date_format_pattern: String,
    content_selector: String,
}

impl TryFrom<SelectorFields> for SelectorSet {
    type Error = String;

    fn try_from(fields: SelectorFields) -> std::result::Result<Self, Self::Error> {
        let checked = |name: &str, value: String| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(format!("field '{name}' is empty"))
            } else {
                Ok(trimmed.to_string())
            }
        };
        Ok(Self {
            title_selector: checked("title_selector", fields.title_selector)?,
            date_selector: checked("date_selector", fields.date_selector)?,
            date_format_pattern: checked("date_format_pattern", fields.date_format_pattern)?,
            content_selector: checked("content_selector", fields.content_selector)?,
        })
    }
}

impl SelectorSet {
    /// Builds a selector set from operator-supplied values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value is empty after trimming.
    pub fn new(
        title_selector: impl Into<String>,
        date_selector: impl Into<String>,
        date_format_pattern: impl Into<String>,
        content_selector: impl Into<String>,
    ) -> Result<Self> {
        SelectorFields {
            title_selector: title_selector.into(),
            date_selector: date_selector.into(),
            date_format_pattern: date_format_pattern.into(),
            content_selector: content_selector.into(),
        }
        .try_into()
        .map_err(Error::Config)
    }

    /// Parses and validates a model response.
    ///
    /// The response must be a JSON object (one surrounding code fence is
    /// tolerated) in which each of the four keys holds a non-empty string.
    /// Extra keys are ignored. Nothing is coerced: a number or `null` where
    /// a string is required is a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`] carrying `raw` unchanged.
    pub fn from_model_output(raw: &str) -> Result<Self> {
        let invalid = |reason: String| Error::SchemaValidation {
            reason,
            raw_response: raw.to_string(),
        };

        let body = strip_code_fence(raw);
        let value: Value =
            serde_json::from_str(body).map_err(|e| invalid(format!("response is not JSON: {e}")))?;
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(invalid(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let missing: Vec<&str> = FIELD_NAMES
            .into_iter()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(invalid(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let fields = SelectorFields {
            title_selector: required_string(&object, "title_selector").map_err(invalid)?,
            date_selector: required_string(&object, "date_selector").map_err(invalid)?,
            date_format_pattern: required_string(&object, "date_format_pattern")
                .map_err(invalid)?,
            content_selector: required_string(&object, "content_selector").map_err(invalid)?,
        };
        fields.try_into().map_err(invalid)
    }

    /// JSON schema of the structured response, in the form accepted by
    /// strict structured-output modes: every field required, no extra keys.
    #[must_use]
    pub fn json_schema() -> Value {
        let root = schemars::schema_for!(SelectorSchema);
        let mut schema = serde_json::to_value(root).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(map) = &mut schema {
            map.remove("$schema");
            map.remove("title");
            map.insert("additionalProperties".into(), Value::Bool(false));
        }
        schema
    }

    #[must_use]
    pub fn title_selector(&self) -> &str {
        &self.title_selector
    }

    #[must_use]
    pub fn date_selector(&self) -> &str {
        &self.date_selector
    }

    #[must_use]
    pub fn date_format_pattern(&self) -> &str {
        &self.date_format_pattern
    }

    #[must_use]
    pub fn content_selector(&self) -> &str {
        &self.content_selector
    }

    /// Returns a copy with the title locator replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `selector` is empty after trimming.
    pub fn with_title_selector(&self, selector: impl Into<String>) -> Result<Self> {
        Self::new(
            selector,
            &*self.date_selector,
            &*self.date_format_pattern,
            &*self.content_selector,
        )
    }

    /// Returns a copy with the date locator replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `selector` is empty after trimming.
    pub fn with_date_selector(&self, selector: impl Into<String>) -> Result<Self> {
        Self::new(
            &*self.title_selector,
            selector,
            &*self.date_format_pattern,
            &*self.content_selector,
        )
    }

    /// Returns a copy with the date format description replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `pattern` is empty after trimming.
    pub fn with_date_format_pattern(&self, pattern: impl Into<String>) -> Result<Self> {
        Self::new(
            &*self.title_selector,
            &*self.date_selector,
            pattern,
            &*self.content_selector,
        )
    }

    /// Returns a copy with the content locator replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `selector` is empty after trimming.
    pub fn with_content_selector(&self, selector: impl Into<String>) -> Result<Self> {
        Self::new(
            &*self.title_selector,
            &*self.date_selector,
            &*self.date_format_pattern,
            selector,
        )
    }
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
}

fn required_string(object: &Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!(
            "field '{key}' must be a string, got {}",
            json_type_name(other)
        )),
        None => Err(format!("missing required field '{key}'")),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
