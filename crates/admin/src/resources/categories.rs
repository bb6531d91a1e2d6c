//! Category resource.

use serde_json::Value;

use super::{
    BulkAction, ColumnFormat, FieldDefault, FieldKind, FormField, FormSchema, OptionSource,
    Resource, ResourceSchema, Rule, TableColumn,
};

pub(super) fn schema() -> ResourceSchema {
    ResourceSchema {
        resource: Resource::Categories,
        label: "Category",
        plural_label: "Categories",
        title_column: "name",
        columns: vec![
            TableColumn::new("name", "Name").searchable().sortable(),
            TableColumn::new("parent.name", "Parent").searchable().sortable(),
            TableColumn::new("slug", "Slug").searchable(),
            TableColumn::new("is_visible", "Visibility")
                .format(ColumnFormat::Boolean)
                .sortable(),
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
                .helper("Enter the category name."),
            FormField::new("slug", "Slug", FieldKind::Text)
                .read_only()
                .helper("Generated from the name."),
            FormField::new("description", "Description", FieldKind::Markdown),
            FormField::new("is_visible", "Visibility", FieldKind::Toggle)
                .helper("Enable or disable category visibility.")
                .default_value(FieldDefault::Value(Value::Bool(true))),
            FormField::new("parent_id", "Parent", FieldKind::Select)
                .options(OptionSource::Categories),
        ]),
    }
}
