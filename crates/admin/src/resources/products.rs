//! Product resource.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;

use shopdesk_core::{Price, ProductType};

use super::{
    BulkAction, ColumnFormat, FieldDefault, FieldKind, FormField, FormSchema, OptionSource,
    ParamError, Resource, ResourceSchema, Rule, TableColumn, TableFilter, id_param, ternary,
};
use crate::models::ProductFilter;

/// Hits returned by the global product search.
pub const SEARCH_LIMIT: u32 = 20;

const TYPES: &[(&str, &str)] = &[
    (ProductType::Downloadable.as_str(), ProductType::Downloadable.label()),
    (ProductType::Deliverable.as_str(), ProductType::Deliverable.label()),
];

pub(super) fn schema() -> ResourceSchema {
    ResourceSchema {
        resource: Resource::Products,
        label: "Product",
        plural_label: "Products",
        title_column: "name",
        columns: vec![
            TableColumn::new("image", "Image").format(ColumnFormat::Image),
            TableColumn::new("name", "Name").searchable(),
            TableColumn::new("slug", "Slug").hidden_by_default(),
            TableColumn::new("sku", "SKU").hidden_by_default(),
            TableColumn::new("brand.name", "Brand").sortable(),
            TableColumn::new("is_visible", "Visibility").format(ColumnFormat::Boolean),
            TableColumn::new("quantity", "Quantity").sortable(),
            TableColumn::new("price", "Price")
                .format(ColumnFormat::Money)
                .sortable(),
            TableColumn::new("type", "Type"),
            TableColumn::new("published_at", "Published at")
                .format(ColumnFormat::Date)
                .sortable(),
            TableColumn::new("is_featured", "Featured")
                .format(ColumnFormat::Boolean)
                .hidden_by_default(),
            TableColumn::timestamp("created_at", "Created at"),
            TableColumn::timestamp("updated_at", "Updated at"),
        ],
        filters: vec![
            TableFilter::ternary(
                "is_visible",
                "Visibility",
                "Only visible products",
                "Only hidden products",
            ),
            TableFilter::select("brand_id", "Brand", vec![]),
        ],
        bulk_actions: vec![BulkAction::delete()],
        summarizers: vec![],
        form: FormSchema::new(vec![
            FormField::new("name", "Name", FieldKind::Text)
                .required()
                .rule(Rule::MaxLength(255))
                .helper("Enter the product name."),
            FormField::new("slug", "Slug", FieldKind::Text)
                .read_only()
                .helper("Generated from the name."),
            FormField::new("description", "Description", FieldKind::Markdown),
            FormField::new("sku", "SKU (Stock Keeping Unit)", FieldKind::Text)
                .required()
                .rule(Rule::MaxLength(255)),
            FormField::new("price", "Price", FieldKind::Money)
                .required()
                .rule(Rule::Numeric)
                .rule(Rule::Min(Decimal::ZERO))
                .rule(Rule::Max(Price::MAX_PRODUCT))
                .rule(Rule::MaxDecimals(Price::SCALE)),
            FormField::new("quantity", "Quantity", FieldKind::Number)
                .required()
                .rule(Rule::Integer)
                .rule(Rule::Min(Decimal::ZERO))
                .rule(Rule::Max(Decimal::from(100))),
            FormField::new("type", "Type", FieldKind::Select)
                .required()
                .choices(TYPES),
            FormField::new("is_visible", "Visibility", FieldKind::Toggle)
                .helper("Enable or disable product visibility.")
                .default_value(FieldDefault::Value(Value::Bool(true))),
            FormField::new("is_featured", "Featured", FieldKind::Toggle)
                .helper("Enable or disable product featured status.")
                .default_value(FieldDefault::Value(Value::Bool(false))),
            FormField::new("published_at", "Availability", FieldKind::Date)
                .rule(Rule::Date)
                .default_value(FieldDefault::Today),
            FormField::new("image", "Image", FieldKind::Image)
                .rule(Rule::MaxLength(255))
                .helper("Path or URL of the product image."),
            FormField::new("brand_id", "Brand", FieldKind::Select).options(OptionSource::Brands),
            FormField::new("category_ids", "Categories", FieldKind::MultiSelect)
                .options(OptionSource::Categories),
        ]),
    }
}

/// Read the product table filters from query parameters.
///
/// # Errors
///
/// Returns `ParamError` for a malformed value.
pub fn filter(params: &HashMap<String, String>) -> Result<ProductFilter, ParamError> {
    Ok(ProductFilter {
        is_visible: ternary(params, "is_visible")?,
        brand_id: id_param(params, "brand_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quantity_above_hundred_is_rejected() {
        let form = &schema().form;
        let errors = form.validate(&json!({
            "name": "Shoe",
            "sku": "SH-1",
            "price": "10.00",
            "quantity": 150,
            "type": "deliverable",
        }));
        assert_eq!(
            errors.get("quantity"),
            ["The quantity field must not be greater than 100."]
        );
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn test_price_limits() {
        let form = &schema().form;
        let errors = form.validate(&json!({"price": "100000000.00"}));
        assert_eq!(
            errors.get("price"),
            ["The price field must not be greater than 99999999.99."]
        );
        let errors = form.validate(&json!({"price": "-1"}));
        assert_eq!(errors.get("price"), ["The price field must be at least 0."]);
    }

    #[test]
    fn test_filter_from_params() {
        let params: HashMap<String, String> = [("is_visible", "true"), ("brand_id", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let filter = filter(&params).unwrap();
        assert_eq!(filter.is_visible, Some(true));
        assert_eq!(filter.brand_id.map(|b| b.as_i64()), Some(2));
    }
}
