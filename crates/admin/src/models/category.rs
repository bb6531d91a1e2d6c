//! Category domain types and the parent/child tree.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{CategoryId, Slug};

use super::{CellValue, Record};

/// A product category, optionally nested under a parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub is_visible: bool,
    pub parent_id: Option<CategoryId>,
    /// Name of the parent, loaded alongside the row.
    pub parent_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category fields as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_visible: Option<bool>,
    pub parent_id: Option<CategoryId>,
}

/// Validated category fields, slug included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryData {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub is_visible: bool,
    pub parent_id: Option<CategoryId>,
}

/// A category with its children, for tree views.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Build the forest of categories: roots and siblings sorted by name.
    ///
    /// Categories whose parent is missing from `categories` are treated as roots.
    #[must_use]
    pub fn forest(categories: Vec<Category>) -> Vec<Self> {
        let known: HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();
        let mut children: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();
        for category in categories {
            let parent = category.parent_id.filter(|p| known.contains(p));
            children.entry(parent).or_default().push(category);
        }
        Self::build(None, &mut children)
    }

    fn build(
        parent: Option<CategoryId>,
        children: &mut HashMap<Option<CategoryId>, Vec<Category>>,
    ) -> Vec<Self> {
        let mut level = children.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        level
            .into_iter()
            .map(|category| {
                let nested = Self::build(Some(category.id), children);
                Self {
                    category,
                    children: nested,
                }
            })
            .collect()
    }
}

/// Whether making `parent` the parent of `id` would create a cycle.
///
/// `parents` maps every category to its current parent. Walks up from
/// `parent`; reaching `id` means `parent` is `id` itself or one of its
/// descendants.
#[must_use]
pub fn creates_cycle(
    id: CategoryId,
    parent: CategoryId,
    parents: &HashMap<CategoryId, Option<CategoryId>>,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(parent);
    while let Some(node) = current {
        if node == id {
            return true;
        }
        // Existing data is never cyclic, but stop rather than spin if it is.
        if !seen.insert(node) {
            return true;
        }
        current = parents.get(&node).copied().flatten();
    }
    false
}

impl Record for Category {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Int(self.id.as_i64()),
            "name" => self.name.as_str().into(),
            "slug" => self.slug.as_str().into(),
            "description" => self.description.clone().into(),
            "is_visible" => self.is_visible.into(),
            "parent_id" => self
                .parent_id
                .map_or(CellValue::Null, |p| CellValue::Int(p.as_i64())),
            "parent.name" => self.parent_name.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => CellValue::Null,
        }
    }
}
