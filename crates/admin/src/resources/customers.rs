//! Customer resource.

use super::{
    BulkAction, FieldKind, FormField, FormSchema, Resource, ResourceSchema, Rule, TableColumn,
};

pub(super) fn schema() -> ResourceSchema {
    ResourceSchema {
        resource: Resource::Customers,
        label: "Customer",
        plural_label: "Customers",
        title_column: "name",
        columns: vec![
            TableColumn::new("name", "Name").searchable().sortable(),
            TableColumn::new("email", "Email").searchable().sortable(),
            TableColumn::new("phone", "Phone").searchable(),
            TableColumn::timestamp("created_at", "Created at"),
            TableColumn::timestamp("updated_at", "Updated at"),
        ],
        filters: vec![],
        bulk_actions: vec![BulkAction::delete()],
        summarizers: vec![],
        form: FormSchema::new(vec![
            FormField::new("name", "Name", FieldKind::Text)
                .required()
                .rule(Rule::MaxLength(255)),
            FormField::new("email", "Email address", FieldKind::Email)
                .required()
                .rule(Rule::MaxLength(255))
                .rule(Rule::Email),
            FormField::new("phone", "Phone", FieldKind::Text).rule(Rule::MaxLength(255)),
        ]),
    }
}
