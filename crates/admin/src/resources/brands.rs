//! Brand resource.

use serde_json::Value;

use super::{
    BulkAction, ColumnFormat, FieldDefault, FieldKind, FormField, FormSchema, Resource,
    ResourceSchema, Rule, TableColumn,
};

pub(super) fn schema() -> ResourceSchema {
    ResourceSchema {
        resource: Resource::Brands,
        label: "Brand",
        plural_label: "Brands",
        title_column: "name",
        columns: vec![
            TableColumn::new("name", "Name").searchable().sortable(),
            TableColumn::new("slug", "Slug").searchable(),
            TableColumn::new("url", "Website URL").searchable(),
            TableColumn::new("primary_hex", "Primary color").format(ColumnFormat::Color),
            TableColumn::new("is_visible", "Visibility").format(ColumnFormat::Boolean),
            TableColumn::timestamp("created_at", "Created at"),
            TableColumn::timestamp("updated_at", "Updated at"),
        ],
        filters: vec![],
        bulk_actions: vec![BulkAction::delete()],
        summarizers: vec![],
        form: FormSchema::new(vec![
            FormField::new("name", "Name", FieldKind::Text)
                .required()
                .rule(Rule::MaxLength(255))
                .helper("Enter the brand name."),
            FormField::new("slug", "Slug", FieldKind::Text)
                .read_only()
                .helper("Generated from the name."),
            FormField::new("url", "Website URL", FieldKind::Url)
                .required()
                .rule(Rule::MaxLength(255))
                .rule(Rule::Url),
            FormField::new("description", "Description", FieldKind::Markdown),
            FormField::new("is_visible", "Visibility", FieldKind::Toggle)
                .helper("Enable or disable brand visibility.")
                .default_value(FieldDefault::Value(Value::Bool(true))),
            FormField::new("primary_hex", "Primary color", FieldKind::Color).rule(Rule::HexColor),
        ]),
    }
}
