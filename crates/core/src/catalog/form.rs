//! Transport-neutral form fields.
//!
//! The api crate fills a [`FormFields`] from a multipart body; schema
//! parsers read typed values out of it. Keeping the container here means the
//! parsing rules are testable without an HTTP stack.

use std::collections::BTreeMap;

use crate::types::Price;
use crate::validation::ValidationError;

/// Text fields of a submitted form. A name may repeat (`sizes=S&sizes=M`).
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    values: BTreeMap<String, Vec<String>>,
}

impl FormFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. A trailing `[]` on the name (`sizes[]`) is dropped.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let name = name.strip_suffix("[]").unwrap_or(name);
        self.values
            .entry(name.to_string())
            .or_default()
            .push(value.into());
    }

    /// Builder-style [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// First raw value for `name`.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Trimmed value, `""` when absent.
    #[must_use]
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).map(str::trim).unwrap_or_default().to_string()
    }

    /// Trimmed value that must be present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Missing` when absent or blank.
    pub fn required_text(&self, name: &'static str) -> Result<String, ValidationError> {
        self.present_text(name)?
            .ok_or_else(|| ValidationError::missing(name))
    }

    /// Trimmed value when provided; a provided value must not be blank.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Missing` when the field is provided but blank.
    pub fn present_text(&self, name: &'static str) -> Result<Option<String>, ValidationError> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Err(ValidationError::missing(name)),
            Some(raw) => Ok(Some(raw.trim().to_string())),
        }
    }

    /// Trimmed value when provided, blank allowed.
    #[must_use]
    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.text(name).map(|raw| raw.trim().to_string())
    }

    /// Parsed price when provided.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when provided but not a non-negative number.
    pub fn price(&self, name: &'static str) -> Result<Option<Price>, ValidationError> {
        self.present_text(name)?
            .map(|raw| Price::parse(&raw))
            .transpose()
    }

    /// A string list when provided.
    ///
    /// Repeated fields are taken as-is. A single value is read as a JSON
    /// array of strings when it looks like one, otherwise split on commas.
    /// Entries are trimmed and blanks dropped.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        let values = self.values.get(name)?;
        let entries: Vec<String> = match values.as_slice() {
            [single] => {
                let trimmed = single.trim();
                serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_else(|_| {
                    trimmed.split(',').map(ToString::to_string).collect()
                })
            }
            many => many.to_vec(),
        };
        Some(
            entries
                .into_iter()
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect(),
        )
    }

    /// Boolean flag when provided: `"true"` (any case) is true, anything
    /// else false.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|raw| raw.trim().eq_ignore_ascii_case("true"))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::new();
        for (name, value) in iter {
            form.push(name.as_ref(), value);
        }
        form
    }
}
