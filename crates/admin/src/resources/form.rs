//! Form descriptions: fields, validation rules and input normalization.
//!
//! A [`FormSchema`] is the single source for what a resource accepts. The
//! same schema renders the HTML form, normalizes raw submissions (JSON bodies
//! and urlencoded forms) and validates them.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use shopdesk_core::FieldErrors;
use shopdesk_core::validation::label;

/// Input widget of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Markdown,
    Email,
    Url,
    Number,
    Money,
    Toggle,
    Select,
    MultiSelect,
    Date,
    Color,
    Image,
    /// Nested rows, each described by the field's own `fields`.
    Repeater,
    /// Carried through the form but not shown (repeater row ids).
    Hidden,
}

/// Where a select loads its options from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSource {
    Brands,
    Categories,
    Products,
    Customers,
}

/// A validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum Rule {
    Required,
    MaxLength(usize),
    Integer,
    Numeric,
    Min(Decimal),
    Max(Decimal),
    MaxDecimals(u32),
    Url,
    Email,
    HexColor,
    Date,
}

/// Default value for a new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    Value(Value),
    /// The current date.
    Today,
}

impl FieldDefault {
    /// The concrete value.
    #[must_use]
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Today => Value::String(chrono::Utc::now().date_naive().to_string()),
        }
    }
}

/// A form field.
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub rules: Vec<Rule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<&'static str>,
    /// Shown but never accepted from input.
    pub read_only: bool,
    /// Fixed `(value, label)` choices for selects.
    pub choices: &'static [(&'static str, &'static str)],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionSource>,
    /// Row fields of a repeater.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FormField>,
}

impl FormField {
    /// Create an optional field without rules.
    #[must_use]
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            rules: Vec::new(),
            default: None,
            helper: None,
            read_only: false,
            choices: &[],
            options: None,
            fields: Vec::new(),
        }
    }

    /// Add a rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Shorthand for `rule(Rule::Required)`.
    #[must_use]
    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    #[must_use]
    pub fn default_value(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub const fn helper(mut self, text: &'static str) -> Self {
        self.helper = Some(text);
        self
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub const fn choices(mut self, choices: &'static [(&'static str, &'static str)]) -> Self {
        self.choices = choices;
        self
    }

    #[must_use]
    pub const fn options(mut self, source: OptionSource) -> Self {
        self.options = Some(source);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: Vec<Self>) -> Self {
        self.fields = fields;
        self
    }

    /// Whether the field carries [`Rule::Required`].
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }

    /// Whether the field holds a record id.
    const fn holds_id(&self) -> bool {
        matches!(self.kind, FieldKind::Hidden)
            || (matches!(self.kind, FieldKind::Select) && self.options.is_some())
    }

    fn message(&self, text: &str) -> String {
        format!("The {} field {text}", label(self.name))
    }

    fn invalid_selection(&self) -> String {
        format!("The selected {} is invalid.", label(self.name))
    }
}

/// The fields of a form.
#[derive(Debug, Clone, Serialize)]
pub struct FormSchema {
    pub fields: Vec<FormField>,
}

impl FormSchema {
    #[must_use]
    pub const fn new(fields: Vec<FormField>) -> Self {
        Self { fields }
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Values for a blank create form.
    #[must_use]
    pub fn defaults(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| f.default.as_ref().map(|d| (f.name.to_string(), d.resolve())))
            .collect()
    }

    /// Keep writable fields only and coerce each value to the type its
    /// widget produces. Strings are trimmed; empty strings become `null`.
    /// Absent fields stay absent.
    #[must_use]
    pub fn normalize(&self, input: &Value) -> Value {
        let Some(object) = input.as_object() else {
            return Value::Object(Map::new());
        };
        let mut out = Map::new();
        for field in self.fields.iter().filter(|f| !f.read_only) {
            if let Some(value) = object.get(field.name) {
                out.insert(field.name.to_string(), normalize_value(field, value));
            }
        }
        Value::Object(out)
    }

    /// Build a normalized value from urlencoded pairs.
    ///
    /// `items.0.quantity` style keys are grouped into repeater rows (rows
    /// left entirely blank are dropped) and `category_ids[]` keys collected
    /// into arrays. Unchecked toggles, empty
    /// multi-selects and empty repeaters are absent from a browser submission,
    /// so they are filled in as `false` and `[]`.
    #[must_use]
    pub fn from_form(&self, pairs: &[(String, String)]) -> Value {
        let mut object = Map::new();
        let mut rows: BTreeMap<String, BTreeMap<usize, Map<String, Value>>> = BTreeMap::new();

        for (key, value) in pairs {
            let value = Value::String(value.clone());
            if let Some(name) = key.strip_suffix("[]") {
                match object
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    Value::Array(values) => values.push(value),
                    other => *other = Value::Array(vec![other.take(), value]),
                }
            } else if let Some((name, rest)) = key.split_once('.')
                && let Some((index, column)) = rest.split_once('.')
                && let Ok(index) = index.parse::<usize>()
            {
                rows.entry(name.to_string())
                    .or_default()
                    .entry(index)
                    .or_default()
                    .insert(column.to_string(), value);
            } else {
                object.insert(key.clone(), value);
            }
        }

        // Untouched blank rows are not submitted rows.
        for (name, indexed) in rows {
            let rows = indexed
                .into_values()
                .filter(|row| !row.values().all(is_blank))
                .map(Value::Object)
                .collect();
            object.insert(name, Value::Array(rows));
        }

        for field in &self.fields {
            if object.contains_key(field.name) {
                continue;
            }
            match field.kind {
                FieldKind::Toggle => {
                    object.insert(field.name.to_string(), Value::Bool(false));
                }
                FieldKind::MultiSelect | FieldKind::Repeater => {
                    object.insert(field.name.to_string(), Value::Array(Vec::new()));
                }
                _ => {}
            }
        }

        self.normalize(&Value::Object(object))
    }

    /// Check `input` against every writable field's rules.
    #[must_use]
    pub fn validate(&self, input: &Value) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for field in self.fields.iter().filter(|f| !f.read_only) {
            let value = input.get(field.name).unwrap_or(&Value::Null);
            validate_value(field, value, &mut errors);
        }
        errors
    }

    /// Serialize a typed input and validate it.
    ///
    /// # Errors
    ///
    /// Returns the collected messages if any rule fails.
    pub fn validate_input<T: Serialize>(&self, input: &T) -> Result<(), FieldErrors> {
        let value = serde_json::to_value(input)
            .map_err(|e| FieldErrors::single("input", format!("The input is invalid: {e}.")))?;
        self.validate(&value).into_result()
    }
}

fn normalize_value(field: &FormField, value: &Value) -> Value {
    let value = match value {
        Value::String(s) if s.trim().is_empty() => return Value::Null,
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    };

    match field.kind {
        FieldKind::Toggle => match &value {
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Value::Bool(true),
                "0" | "false" | "off" | "no" => Value::Bool(false),
                _ => value,
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Value::Bool(true),
                Some(0) => Value::Bool(false),
                _ => value,
            },
            _ => value,
        },
        FieldKind::Number => integer_from_string(value),
        FieldKind::Money => match &value {
            // Keep the decimal text so the scale is preserved.
            Value::Number(n) => Value::String(n.to_string()),
            _ => value,
        },
        FieldKind::Select | FieldKind::Hidden if field.holds_id() => integer_from_string(value),
        FieldKind::MultiSelect => match value {
            Value::Null => Value::Null,
            Value::Array(values) => Value::Array(
                values
                    .into_iter()
                    .filter(|v| !matches!(v, Value::String(s) if s.trim().is_empty()))
                    .map(integer_from_string)
                    .collect(),
            ),
            single => Value::Array(vec![integer_from_string(single)]),
        },
        FieldKind::Repeater => {
            let rows: Vec<Value> = match value {
                Value::Array(rows) => rows,
                // Rows keyed by index, as some form encoders send them.
                Value::Object(indexed) => {
                    let mut keyed: Vec<(usize, Value)> = indexed
                        .into_iter()
                        .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                        .collect();
                    keyed.sort_by_key(|(i, _)| *i);
                    keyed.into_iter().map(|(_, v)| v).collect()
                }
                other => return other,
            };
            let nested = FormSchema::new(field.fields.clone());
            Value::Array(
                rows.iter()
                    .map(|row| {
                        if row.is_object() {
                            nested.normalize(row)
                        } else {
                            row.clone()
                        }
                    })
                    .collect(),
            )
        }
        _ => value,
    }
}

fn integer_from_string(value: Value) -> Value {
    match &value {
        Value::String(s) => s.trim().parse::<i64>().map_or(value, Value::from),
        _ => value,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(values) => values.is_empty(),
        _ => false,
    }
}

/// Parse a JSON number or numeric string.
pub(crate) fn decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}

fn is_web_url(s: &str) -> bool {
    Url::parse(s)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

fn validate_value(field: &FormField, value: &Value, errors: &mut FieldErrors) {
    if is_blank(value) {
        if field.is_required() {
            errors.required(field.name);
        }
        return;
    }

    match field.kind {
        FieldKind::Toggle if !value.is_boolean() => {
            errors.add(field.name, field.message("must be true or false."));
            return;
        }
        FieldKind::Select if !field.choices.is_empty() => {
            let known = value
                .as_str()
                .is_some_and(|v| field.choices.iter().any(|(choice, _)| *choice == v));
            if !known {
                errors.add(field.name, field.invalid_selection());
            }
            return;
        }
        FieldKind::Select | FieldKind::Hidden if field.holds_id() => {
            if integer(value).is_none() {
                errors.add(field.name, field.invalid_selection());
            }
            return;
        }
        FieldKind::MultiSelect => {
            let valid = value
                .as_array()
                .is_some_and(|ids| ids.iter().all(|id| integer(id).is_some()));
            if !valid {
                errors.add(field.name, field.invalid_selection());
            }
            return;
        }
        FieldKind::Repeater => {
            validate_rows(field, value, errors);
            return;
        }
        _ => {}
    }

    let number = decimal(value);
    for rule in &field.rules {
        match rule {
            Rule::Required => {}
            Rule::MaxLength(max) => {
                if let Some(s) = value.as_str()
                    && s.chars().count() > *max
                {
                    errors.add(
                        field.name,
                        field.message(&format!("must not be greater than {max} characters.")),
                    );
                }
            }
            Rule::Integer => {
                if integer(value).is_none() {
                    errors.add(field.name, field.message("must be an integer."));
                    return;
                }
            }
            Rule::Numeric => {
                if number.is_none() {
                    errors.add(field.name, field.message("must be a number."));
                    return;
                }
            }
            Rule::Min(min) => {
                if number.is_some_and(|n| n < *min) {
                    errors.add(field.name, field.message(&format!("must be at least {min}.")));
                }
            }
            Rule::Max(max) => {
                if number.is_some_and(|n| n > *max) {
                    errors.add(
                        field.name,
                        field.message(&format!("must not be greater than {max}.")),
                    );
                }
            }
            Rule::MaxDecimals(places) => {
                if number.is_some_and(|n| n.scale() > *places) {
                    errors.add(
                        field.name,
                        field.message(&format!("must have 0-{places} decimal places.")),
                    );
                }
            }
            Rule::Url => {
                if !value.as_str().is_some_and(is_web_url) {
                    errors.add(field.name, field.message("must be a valid URL."));
                }
            }
            Rule::Email => {
                if !value.as_str().is_some_and(is_email) {
                    errors.add(field.name, field.message("must be a valid email address."));
                }
            }
            Rule::HexColor => {
                if !value.as_str().is_some_and(is_hex_color) {
                    errors.add(field.name, field.message("must be a valid hexadecimal color."));
                }
            }
            Rule::Date => {
                let valid = value
                    .as_str()
                    .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
                if !valid {
                    errors.add(field.name, field.message("must be a valid date."));
                }
            }
        }
    }
}

fn validate_rows(field: &FormField, value: &Value, errors: &mut FieldErrors) {
    let Some(rows) = value.as_array() else {
        errors.add(field.name, field.message("must be an array."));
        return;
    };
    let nested = FormSchema::new(field.fields.clone());
    for (index, row) in rows.iter().enumerate() {
        let prefix = format!("{}.{index}", field.name);
        if row.is_object() {
            errors.merge_nested(&prefix, nested.validate(row));
        } else {
            errors.add(&prefix, format!("The {} row is invalid.", label(field.name)));
        }
    }
}
