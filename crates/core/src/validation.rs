//! Field-level validation errors.
//!
//! Services collect every problem with a submitted record before rejecting
//! it, keyed by form field name. The admin API returns the map verbatim:
//!
//! ```json
//! { "name": ["The name field is required."] }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// An empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding a single message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Record the standard "required" message.
    pub fn required(&mut self, field: &str) {
        self.add(field, format!("The {} field is required.", label(field)));
    }

    /// Whether no field has messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `field` has at least one message.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[][..], Vec::as_slice)
    }

    /// Iterate over `(field, messages)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Move all messages from `other` into `self`, prefixing field names.
    ///
    /// Used for nested records such as order items (`items.0.quantity`).
    pub fn merge_nested(&mut self, prefix: &str, other: Self) {
        for (field, messages) in other.0 {
            self.0
                .entry(format!("{prefix}.{field}"))
                .or_default()
                .extend(messages);
        }
    }

    /// The first message overall, used as the summary message.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field has messages.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Field name as it appears in messages (`primary_hex` -> `primary hex`).
#[must_use]
pub fn label(field: &str) -> String {
    field.replace('_', " ")
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.values().map(Vec::len).sum::<usize>();
        match (self.first_message(), count) {
            (None, _) => f.write_str("no validation errors"),
            (Some(first), 1) => f.write_str(first),
            (Some(first), n) => write!(f, "{first} (and {} more errors)", n - 1),
        }
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_message() {
        let mut errors = FieldErrors::new();
        errors.required("primary_hex");
        assert_eq!(
            errors.get("primary_hex"),
            ["The primary hex field is required."]
        );
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("name", "bad").into_result().is_err());
    }

    #[test]
    fn test_merge_nested() {
        let mut errors = FieldErrors::new();
        errors.merge_nested("items.1", FieldErrors::single("quantity", "too small"));
        assert!(errors.has("items.1.quantity"));
    }

    #[test]
    fn test_display_counts_remaining() {
        let mut errors = FieldErrors::new();
        errors.add("name", "The name field is required.");
        errors.add("sku", "The sku has already been taken.");
        errors.add("sku", "The sku must be at most 255 characters.");
        assert_eq!(
            errors.to_string(),
            "The name field is required. (and 2 more errors)"
        );
    }

    #[test]
    fn test_serializes_as_map() {
        let json = serde_json::to_value(FieldErrors::single("name", "x")).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "name": ["x"] }));
    }
}
