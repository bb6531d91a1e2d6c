//! Turn records into table rows, detail lists and form inputs.

use serde_json::{Map, Value};

use shopdesk_core::{CurrencyCode, FieldErrors};

use super::form::decimal;
use super::{ColumnFormat, FieldKind, FormField, ResourceSchema, TableColumn};
use crate::models::{CellValue, Record, SelectOption};

/// A formatted cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Display text.
    pub text: String,
    /// `text`, `money`, `boolean`, `color` or `image`; templates pick the widget.
    pub kind: &'static str,
    /// Boolean state for icon cells.
    pub flag: bool,
}

impl Cell {
    fn text(text: String) -> Self {
        Self {
            text,
            kind: "text",
            flag: false,
        }
    }
}

/// Format a value for display.
#[must_use]
pub fn cell(value: &CellValue, format: ColumnFormat, currency: CurrencyCode) -> Cell {
    match (format, value) {
        (_, CellValue::Null) => Cell::text(String::new()),
        (ColumnFormat::Money, CellValue::Money(price)) => Cell {
            text: currency.format(*price),
            kind: "money",
            flag: false,
        },
        (ColumnFormat::Boolean, CellValue::Bool(flag)) => Cell {
            text: if *flag { "Yes" } else { "No" }.to_string(),
            kind: "boolean",
            flag: *flag,
        },
        (ColumnFormat::Date, CellValue::Date(date)) => {
            Cell::text(date.format("%d-%m-%Y").to_string())
        }
        (ColumnFormat::Date, CellValue::DateTime(at)) => {
            Cell::text(at.format("%d-%m-%Y").to_string())
        }
        (ColumnFormat::DateTime, CellValue::DateTime(at)) => {
            Cell::text(at.format("%b %-d, %Y %H:%M:%S").to_string())
        }
        (ColumnFormat::Color, CellValue::Text(hex)) => Cell {
            text: hex.clone(),
            kind: "color",
            flag: false,
        },
        (ColumnFormat::Image, CellValue::Text(src)) => Cell {
            text: src.clone(),
            kind: "image",
            flag: false,
        },
        (_, other) => Cell::text(other.search_text()),
    }
}

/// A table row.
#[derive(Debug, Clone)]
pub struct RowView {
    pub id: i64,
    pub title: String,
    pub trashed: bool,
    pub cells: Vec<Cell>,
}

/// Render `record` for the given columns.
#[must_use]
pub fn row<R: Record>(record: &R, columns: &[&TableColumn], currency: CurrencyCode) -> RowView {
    RowView {
        id: record.id(),
        title: record.title(),
        trashed: !matches!(record.value("deleted_at"), CellValue::Null),
        cells: columns
            .iter()
            .map(|c| cell(&record.value(&c.key), c.format, currency))
            .collect(),
    }
}

/// A labelled value on the detail page.
#[derive(Debug, Clone)]
pub struct DetailEntry {
    pub label: String,
    pub value: Cell,
}

/// Every column of the record, followed by form-only text fields
/// (descriptions, notes, links).
#[must_use]
pub fn details<R: Record>(
    schema: &ResourceSchema,
    record: &R,
    currency: CurrencyCode,
) -> Vec<DetailEntry> {
    let mut entries: Vec<DetailEntry> = schema
        .columns
        .iter()
        .map(|c| DetailEntry {
            label: c.label.clone(),
            value: cell(&record.value(&c.key), c.format, currency),
        })
        .collect();

    for field in &schema.form.fields {
        let shown = schema.columns.iter().any(|c| c.key == field.name);
        let textual = matches!(
            field.kind,
            FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::Markdown
                | FieldKind::Email
                | FieldKind::Url
        );
        if shown || !textual {
            continue;
        }
        entries.push(DetailEntry {
            label: field.label.to_string(),
            value: cell(&record.value(field.name), ColumnFormat::Text, currency),
        });
    }
    entries
}

/// A selectable option with its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A form input with its current value and messages.
#[derive(Debug, Clone)]
pub struct FieldView {
    /// Input name attribute (`items.0.quantity` inside repeaters).
    pub name: String,
    pub label: String,
    /// Widget name as in [`FieldKind`] (`text`, `money`, `repeater`, ...).
    pub kind: String,
    pub value: String,
    pub checked: bool,
    pub required: bool,
    pub read_only: bool,
    pub helper: String,
    pub options: Vec<OptionView>,
    pub errors: Vec<String>,
    /// Rows of a repeater; the last one is blank for adding a line.
    pub rows: Vec<Vec<FieldView>>,
}

/// Option lists for relationship selects, loaded by the page handler.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub brands: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub products: Vec<SelectOption>,
    pub customers: Vec<SelectOption>,
}

impl SelectOptions {
    fn for_field(&self, field: &FormField) -> &[SelectOption] {
        use super::OptionSource;
        match field.options {
            Some(OptionSource::Brands) => &self.brands,
            Some(OptionSource::Categories) => &self.categories,
            Some(OptionSource::Products) => &self.products,
            Some(OptionSource::Customers) => &self.customers,
            None => &[],
        }
    }
}

/// Text of a JSON value as it goes into an input.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn kind_name(kind: FieldKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn field_view(
    field: &FormField,
    name: String,
    value: &Value,
    options: &SelectOptions,
    errors: &FieldErrors,
) -> FieldView {
    let selected: Vec<String> = match value {
        Value::Array(values) => values.iter().map(value_text).collect(),
        other => vec![value_text(other)],
    };
    let option_views: Vec<OptionView> = if field.choices.is_empty() {
        options
            .for_field(field)
            .iter()
            .map(|o| OptionView {
                value: o.id.to_string(),
                label: o.name.clone(),
                selected: selected.contains(&o.id.to_string()),
            })
            .collect()
    } else {
        field
            .choices
            .iter()
            .map(|(v, l)| OptionView {
                value: (*v).to_string(),
                label: (*l).to_string(),
                selected: selected.iter().any(|s| s.as_str() == *v),
            })
            .collect()
    };

    let text = match (field.kind, value) {
        // Money inputs show two places.
        (FieldKind::Money, v) => decimal(v)
            .map(|d| format!("{d:.2}"))
            .unwrap_or_else(|| value_text(v)),
        (_, v) => value_text(v),
    };

    FieldView {
        errors: errors.get(&name).to_vec(),
        name,
        label: field.label.to_string(),
        kind: kind_name(field.kind),
        value: text,
        checked: value.as_bool().unwrap_or(false),
        required: field.is_required(),
        read_only: field.read_only,
        helper: field.helper.unwrap_or_default().to_string(),
        options: option_views,
        rows: Vec::new(),
    }
}

/// Build the inputs of a form from current `values`.
///
/// `values` holds defaults on create, the stored record on edit, and the
/// submitted input when re-rendering after a failed save.
#[must_use]
pub fn form_fields(
    schema: &ResourceSchema,
    values: &Map<String, Value>,
    options: &SelectOptions,
    errors: &FieldErrors,
) -> Vec<FieldView> {
    schema
        .form
        .fields
        .iter()
        .map(|field| {
            let value = values.get(field.name).unwrap_or(&Value::Null);
            let mut view = field_view(field, field.name.to_string(), value, options, errors);
            if field.kind == FieldKind::Repeater {
                let rows = value.as_array().map(Vec::as_slice).unwrap_or_default();
                let blank = Value::Object(Map::new());
                view.rows = rows
                    .iter()
                    .chain(std::iter::once(&blank))
                    .enumerate()
                    .map(|(index, row)| {
                        field
                            .fields
                            .iter()
                            .map(|nested| {
                                let cell = row.get(nested.name).unwrap_or(&Value::Null);
                                field_view(
                                    nested,
                                    format!("{}.{index}.{}", field.name, nested.name),
                                    cell,
                                    options,
                                    errors,
                                )
                            })
                            .collect()
                    })
                    .collect();
                view.value = String::new();
            }
            view
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use shopdesk_core::Price;

    #[test]
    fn test_money_uses_currency_symbol() {
        let c = cell(
            &CellValue::Money(Price::from_cents(2800)),
            ColumnFormat::Money,
            CurrencyCode::MYR,
        );
        assert_eq!(c.text, "RM 28.00");
        assert_eq!(c.kind, "money");
    }

    #[test]
    fn test_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        assert_eq!(
            cell(&CellValue::Date(date), ColumnFormat::Date, CurrencyCode::MYR).text,
            "03-11-2024"
        );
        let at = Utc.with_ymd_and_hms(2024, 11, 3, 9, 5, 0).unwrap();
        assert_eq!(
            cell(&CellValue::DateTime(at), ColumnFormat::DateTime, CurrencyCode::MYR).text,
            "Nov 3, 2024 09:05:00"
        );
    }

    #[test]
    fn test_boolean_and_null() {
        let c = cell(&CellValue::Bool(true), ColumnFormat::Boolean, CurrencyCode::MYR);
        assert!(c.flag);
        assert_eq!(c.kind, "boolean");
        assert_eq!(
            cell(&CellValue::Null, ColumnFormat::Money, CurrencyCode::MYR).text,
            ""
        );
    }

    #[test]
    fn test_form_fields_mark_selection_and_errors() {
        let schema = Resource::Products.schema();
        let values = json!({
            "name": "Shoe",
            "type": "deliverable",
            "price": "5",
            "category_ids": [2],
            "is_visible": true,
        });
        let options = SelectOptions {
            categories: vec![
                SelectOption { id: 1, name: "Bags".to_string() },
                SelectOption { id: 2, name: "Shoes".to_string() },
            ],
            ..SelectOptions::default()
        };
        let errors = FieldErrors::single("sku", "The sku field is required.");
        let fields = form_fields(schema, values.as_object().unwrap(), &options, &errors);

        let find = |name: &str| fields.iter().find(|f| f.name == name).unwrap();
        assert_eq!(find("price").value, "5.00");
        assert!(find("is_visible").checked);
        assert_eq!(find("sku").errors, ["The sku field is required."]);
        let selected: Vec<&str> = find("category_ids")
            .options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(selected, ["Shoes"]);
        let types: Vec<bool> = find("type").options.iter().map(|o| o.selected).collect();
        assert_eq!(types, [false, true]);
    }

    #[test]
    fn test_repeater_gets_a_blank_row() {
        let schema = Resource::Orders.schema();
        let values = json!({"items": [{"id": 4, "product_id": 1, "quantity": 2}]});
        let fields = form_fields(
            schema,
            values.as_object().unwrap(),
            &SelectOptions::default(),
            &FieldErrors::new(),
        );
        let items = fields.iter().find(|f| f.name == "items").unwrap();
        assert_eq!(items.rows.len(), 2);
        assert_eq!(items.rows[0][0].name, "items.0.id");
        assert_eq!(items.rows[0][0].value, "4");
        assert_eq!(items.rows[1][2].value, "");
    }
}
