//! Order resource.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;

use shopdesk_core::{OrderStatus, Price};

use super::{
    BulkAction, ColumnFormat, FieldDefault, FieldKind, FilterOption, FormField, FormSchema,
    OptionSource, ParamError, Resource, ResourceSchema, Rule, Summarizer, TableColumn,
    TableFilter,
};
use crate::models::{OrderFilter, Trashed};

const STATUSES: &[(&str, &str)] = &[
    (OrderStatus::Pending.as_str(), OrderStatus::Pending.label()),
    (OrderStatus::Processing.as_str(), OrderStatus::Processing.label()),
    (OrderStatus::Completed.as_str(), OrderStatus::Completed.label()),
    (OrderStatus::Declined.as_str(), OrderStatus::Declined.label()),
];

pub(super) fn schema() -> ResourceSchema {
    ResourceSchema {
        resource: Resource::Orders,
        label: "Order",
        plural_label: "Orders",
        title_column: "number",
        columns: vec![
            TableColumn::new("number", "Number").searchable(),
            TableColumn::new("customer.name", "Customer")
                .searchable()
                .sortable(),
            TableColumn::new("status", "Status").searchable().sortable(),
            TableColumn::new("total_price", "Total price")
                .format(ColumnFormat::Money)
                .sortable(),
            TableColumn::new("shipping_price", "Shipping price")
                .format(ColumnFormat::Money)
                .sortable(),
            TableColumn::timestamp("created_at", "Created at"),
            TableColumn::timestamp("updated_at", "Updated at"),
            TableColumn::timestamp("deleted_at", "Deleted at"),
        ],
        filters: vec![
            TableFilter::select(
                "status",
                "Status",
                STATUSES
                    .iter()
                    .map(|(value, label)| FilterOption::new(value, label))
                    .collect(),
            ),
            TableFilter::trashed(),
        ],
        bulk_actions: vec![BulkAction::delete()],
        summarizers: vec![Summarizer::money_sum("total_price")],
        form: FormSchema::new(vec![
            FormField::new("number", "Number", FieldKind::Text)
                .read_only()
                .helper("Generated when the order is created."),
            FormField::new("customer_id", "Customer", FieldKind::Select)
                .required()
                .options(OptionSource::Customers),
            FormField::new("status", "Status", FieldKind::Select)
                .choices(STATUSES)
                .default_value(FieldDefault::Value(Value::String(
                    OrderStatus::Pending.as_str().to_string(),
                ))),
            FormField::new("shipping_price", "Shipping price", FieldKind::Money)
                .rule(Rule::Numeric)
                .rule(Rule::Min(Decimal::ZERO))
                .rule(Rule::Max(Price::MAX_ORDER))
                .rule(Rule::MaxDecimals(Price::SCALE)),
            FormField::new("notes", "Notes", FieldKind::Markdown),
            FormField::new("total_price", "Total price", FieldKind::Money)
                .read_only()
                .helper("Line items plus shipping."),
            FormField::new("items", "Items", FieldKind::Repeater).fields(item_fields()),
        ]),
    }
}

/// Fields of one order line.
pub(crate) fn item_fields() -> Vec<FormField> {
    vec![
        FormField::new("id", "Id", FieldKind::Hidden),
        FormField::new("product_id", "Product", FieldKind::Select)
            .required()
            .options(OptionSource::Products),
        FormField::new("quantity", "Quantity", FieldKind::Number)
            .rule(Rule::Integer)
            .rule(Rule::Min(Decimal::ONE))
            .rule(Rule::Max(Decimal::from(i32::MAX)))
            .default_value(FieldDefault::Value(Value::from(1))),
        FormField::new("unit_price", "Unit price", FieldKind::Money)
            .read_only()
            .helper("Taken from the product price."),
    ]
}

/// Schema for a single order line, used by the item endpoints.
#[must_use]
pub fn item_form() -> FormSchema {
    FormSchema::new(item_fields())
}

/// Read the order table filters from query parameters.
///
/// # Errors
///
/// Returns `ParamError` for an unknown status or trashed value.
pub fn filter(params: &HashMap<String, String>) -> Result<OrderFilter, ParamError> {
    let status = match params.get("status").map(|s| s.trim()) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<OrderStatus>()
                .map_err(|_| ParamError(format!("invalid status filter: {raw}")))?,
        ),
    };
    let trashed = match params.get("trashed") {
        Some(raw) => raw.trim().parse::<Trashed>().map_err(ParamError)?,
        None => Trashed::Without,
    };
    Ok(OrderFilter { status, trashed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_filter_defaults_hide_trashed() {
        let filter = filter(&HashMap::new()).unwrap();
        assert_eq!(filter.trashed, Trashed::Without);
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_filter_parses_status_and_trashed() {
        let filter = filter(&params(&[("status", "completed"), ("trashed", "only")])).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Completed));
        assert_eq!(filter.trashed, Trashed::Only);
        assert!(super::filter(&params(&[("status", "lost")])).is_err());
        assert!(super::filter(&params(&[("trashed", "all")])).is_err());
    }

    #[test]
    fn test_item_rows_are_validated() {
        let errors = schema().form.validate(&json!({
            "customer_id": 1,
            "items": [{"product_id": 3, "quantity": 0}, {"quantity": 2}],
        }));
        assert_eq!(
            errors.get("items.0.quantity"),
            ["The quantity field must be at least 1."]
        );
        assert_eq!(
            errors.get("items.1.product_id"),
            ["The product id field is required."]
        );
    }

    #[test]
    fn test_number_and_total_are_not_writable() {
        let normalized = schema().form.normalize(&json!({
            "number": "OR-1",
            "total_price": "0.01",
            "status": "declined",
        }));
        assert_eq!(normalized, json!({"status": "declined"}));
    }
}
