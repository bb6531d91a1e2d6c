//! Table configuration: columns, filters, bulk actions and summaries.

use serde::Serialize;

/// How a column value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    Text,
    /// Amount with the configured currency symbol.
    Money,
    /// Check or cross icon.
    Boolean,
    /// `d-m-Y`.
    Date,
    /// `d M Y H:i`.
    DateTime,
    /// Colour swatch.
    Color,
    /// Image thumbnail.
    Image,
}

/// Column definition for a resource table.
#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    /// Record column key (`name`, `brand.name`).
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    pub format: ColumnFormat,
    pub sortable: bool,
    /// Whether `q` searches this column.
    pub searchable: bool,
    /// Whether the column can be shown or hidden.
    pub toggleable: bool,
    /// Whether the column is visible by default.
    pub default_visible: bool,
}

impl TableColumn {
    /// Create a plain text column.
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            format: ColumnFormat::Text,
            sortable: false,
            searchable: false,
            toggleable: false,
            default_visible: true,
        }
    }

    #[must_use]
    pub const fn format(mut self, format: ColumnFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    #[must_use]
    pub const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Toggleable and hidden until the user shows it.
    #[must_use]
    pub const fn hidden_by_default(mut self) -> Self {
        self.toggleable = true;
        self.default_visible = false;
        self
    }

    /// A sortable date-time column, hidden by default.
    #[must_use]
    pub fn timestamp(key: &str, label: &str) -> Self {
        Self::new(key, label)
            .format(ColumnFormat::DateTime)
            .sortable()
            .hidden_by_default()
    }
}

/// Filter type for resource tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// `true` / `false` / any.
    Ternary,
    /// Single-select dropdown.
    Select,
    /// Soft-delete visibility: `without` / `with` / `only`.
    Trashed,
}

/// Option for select filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Filter definition for a resource table.
#[derive(Debug, Clone, Serialize)]
pub struct TableFilter {
    /// Query parameter key.
    pub key: String,
    pub label: String,
    pub filter_type: FilterType,
    /// Fixed options; relationship selects load theirs at render time.
    pub options: Vec<FilterOption>,
}

impl TableFilter {
    /// A boolean filter with labels for the two states.
    #[must_use]
    pub fn ternary(key: &str, label: &str, true_label: &str, false_label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            filter_type: FilterType::Ternary,
            options: vec![
                FilterOption::new("true", true_label),
                FilterOption::new("false", false_label),
            ],
        }
    }

    /// A select filter.
    #[must_use]
    pub fn select(key: &str, label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            filter_type: FilterType::Select,
            options,
        }
    }

    /// The soft-delete filter.
    #[must_use]
    pub fn trashed() -> Self {
        Self {
            key: "trashed".to_string(),
            label: "Deleted records".to_string(),
            filter_type: FilterType::Trashed,
            options: vec![
                FilterOption::new("without", "Without deleted records"),
                FilterOption::new("with", "With deleted records"),
                FilterOption::new("only", "Only deleted records"),
            ],
        }
    }
}

/// Bulk action definition for resource tables.
#[derive(Debug, Clone, Serialize)]
pub struct BulkAction {
    /// Action key; also the path segment under the resource API.
    pub key: String,
    pub label: String,
    /// Whether this is a destructive action.
    pub destructive: bool,
}

impl BulkAction {
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            destructive: false,
        }
    }

    /// Mark this action as destructive.
    #[must_use]
    pub const fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    /// The standard bulk delete.
    #[must_use]
    pub fn delete() -> Self {
        Self::new("bulk-delete", "Delete selected").destructive()
    }
}

/// Aggregate shown under a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Sum,
}

/// Column summary over the filtered rows.
#[derive(Debug, Clone, Serialize)]
pub struct Summarizer {
    pub column: String,
    pub kind: SummaryKind,
    pub format: ColumnFormat,
}

impl Summarizer {
    /// Sum of a money column.
    #[must_use]
    pub fn money_sum(column: &str) -> Self {
        Self {
            column: column.to_string(),
            kind: SummaryKind::Sum,
            format: ColumnFormat::Money,
        }
    }
}
