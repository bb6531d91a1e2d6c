//! Brand, category and product management.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use tracing::{info, instrument};

use shopdesk_core::{BrandId, CategoryId, Price, ProductId};

use super::{ServiceError, clean, invalid_selection, present, taken, unique_slug};
use crate::db::{SlugScope, Store};
use crate::models::category::creates_cycle;
use crate::models::{
    Brand, BrandData, BrandInput, Category, CategoryData, CategoryInput, CategoryNode, ListQuery,
    Page, Product, ProductData, ProductFilter, ProductInput, SearchHit, SelectOption,
};
use crate::resources::Resource;
use crate::resources::products::SEARCH_LIMIT;

/// Catalog operations over a store.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Brands
    // =========================================================================

    /// List brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn list_brands(&self, query: &ListQuery) -> Result<Page<Brand>, ServiceError> {
        Ok(self.store.list_brands(query).await?)
    }

    /// Get a brand by ID.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the brand does not exist.
    pub async fn get_brand(&self, id: BrandId) -> Result<Brand, ServiceError> {
        self.store
            .get_brand(id)
            .await?
            .ok_or(ServiceError::NotFound("brand"))
    }

    /// Create a brand.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for invalid input or a taken URL.
    #[instrument(skip(self, input))]
    pub async fn create_brand(&self, input: &BrandInput) -> Result<Brand, ServiceError> {
        let data = self.brand_data(input, None, None).await?;
        let brand = self.store.insert_brand(&data).await?;
        info!(brand_id = %brand.id, slug = %brand.slug, "Brand created");
        Ok(brand)
    }

    /// Replace a brand's fields.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Validation`.
    #[instrument(skip(self, input), fields(brand_id = %id))]
    pub async fn update_brand(&self, id: BrandId, input: &BrandInput) -> Result<Brand, ServiceError> {
        let current = self.get_brand(id).await?;
        let data = self.brand_data(input, Some(id), Some(&current)).await?;
        let brand = self.store.update_brand(id, &data).await?;
        info!(slug = %brand.slug, "Brand updated");
        Ok(brand)
    }

    /// Delete a brand.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, or `ServiceError::Conflict` while
    /// the brand still owns products.
    #[instrument(skip(self))]
    pub async fn delete_brand(&self, id: BrandId) -> Result<(), ServiceError> {
        self.get_brand(id).await?;
        self.store.delete_brands(&[id]).await?;
        info!(brand_id = %id, "Brand deleted");
        Ok(())
    }

    /// Delete several brands, all or nothing. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if any brand still owns products.
    #[instrument(skip(self))]
    pub async fn bulk_delete_brands(&self, ids: &[BrandId]) -> Result<u64, ServiceError> {
        let deleted = self.store.delete_brands(ids).await?;
        info!(deleted, "Brands bulk deleted");
        Ok(deleted)
    }

    /// Brands as select options.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn brand_options(&self) -> Result<Vec<SelectOption>, ServiceError> {
        Ok(self.store.brand_options().await?)
    }

    async fn brand_data(
        &self,
        input: &BrandInput,
        id: Option<BrandId>,
        current: Option<&Brand>,
    ) -> Result<BrandData, ServiceError> {
        let mut errors = Resource::Brands
            .schema()
            .form
            .validate_input(input)
            .err()
            .unwrap_or_default();

        let name = clean(input.name.as_deref());
        let url = clean(input.url.as_deref());

        let slug = match &name {
            Some(name) if !errors.has("name") => {
                unique_slug(
                    self.store,
                    SlugScope::Brands,
                    name,
                    id.map(|b| b.as_i64()),
                    &mut errors,
                )
                .await?
            }
            _ => None,
        };
        if let Some(url) = &url
            && !errors.has("url")
            && self.store.brand_url_taken(url, id).await?
        {
            errors.add("url", taken("url"));
        }
        errors.into_result()?;

        Ok(BrandData {
            name: present(name, "name")?,
            slug: present(slug, "slug")?,
            url: present(url, "url")?,
            description: clean(input.description.as_deref()),
            is_visible: input
                .is_visible
                .or(current.map(|b| b.is_visible))
                .unwrap_or(true),
            primary_hex: clean(input.primary_hex.as_deref()),
        })
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn list_categories(&self, query: &ListQuery) -> Result<Page<Category>, ServiceError> {
        Ok(self.store.list_categories(query).await?)
    }

    /// Every category arranged as a forest.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>, ServiceError> {
        Ok(CategoryNode::forest(self.store.all_categories().await?))
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, ServiceError> {
        self.store
            .get_category(id)
            .await?
            .ok_or(ServiceError::NotFound("category"))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for invalid input or an unknown parent.
    #[instrument(skip(self, input))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, ServiceError> {
        let data = self.category_data(input, None, None).await?;
        let category = self.store.insert_category(&data).await?;
        info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Validation`, the
    /// latter also when the new parent is the category or a descendant.
    #[instrument(skip(self, input), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ServiceError> {
        let current = self.get_category(id).await?;
        let data = self.category_data(input, Some(id), Some(&current)).await?;
        let category = self.store.update_category(id, &data).await?;
        info!(slug = %category.slug, "Category updated");
        Ok(category)
    }

    /// Delete a category. Children become roots; products lose the link.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), ServiceError> {
        self.get_category(id).await?;
        self.store.delete_categories(&[id]).await?;
        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Delete several categories. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    #[instrument(skip(self))]
    pub async fn bulk_delete_categories(&self, ids: &[CategoryId]) -> Result<u64, ServiceError> {
        let deleted = self.store.delete_categories(ids).await?;
        info!(deleted, "Categories bulk deleted");
        Ok(deleted)
    }

    /// Categories as select options.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn category_options(&self) -> Result<Vec<SelectOption>, ServiceError> {
        Ok(self.store.category_options().await?)
    }

    async fn category_data(
        &self,
        input: &CategoryInput,
        id: Option<CategoryId>,
        current: Option<&Category>,
    ) -> Result<CategoryData, ServiceError> {
        let mut errors = Resource::Categories
            .schema()
            .form
            .validate_input(input)
            .err()
            .unwrap_or_default();

        let name = clean(input.name.as_deref());
        let slug = match &name {
            Some(name) if !errors.has("name") => {
                unique_slug(
                    self.store,
                    SlugScope::Categories,
                    name,
                    id.map(|c| c.as_i64()),
                    &mut errors,
                )
                .await?
            }
            _ => None,
        };

        if let Some(parent) = input.parent_id {
            let parents: HashMap<CategoryId, Option<CategoryId>> = self
                .store
                .all_categories()
                .await?
                .into_iter()
                .map(|c| (c.id, c.parent_id))
                .collect();
            if !parents.contains_key(&parent) {
                errors.add("parent_id", invalid_selection("parent_id"));
            } else if let Some(id) = id
                && creates_cycle(id, parent, &parents)
            {
                errors.add(
                    "parent_id",
                    "The parent id field must not be the category itself or one of its descendants.",
                );
            }
        }
        errors.into_result()?;

        Ok(CategoryData {
            name: present(name, "name")?,
            slug: present(slug, "slug")?,
            description: clean(input.description.as_deref()),
            is_visible: input
                .is_visible
                .or(current.map(|c| c.is_visible))
                .unwrap_or(true),
            parent_id: input.parent_id,
        })
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List products.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn list_products(
        &self,
        query: &ListQuery,
        filter: &ProductFilter,
    ) -> Result<Page<Product>, ServiceError> {
        Ok(self.store.list_products(query, filter).await?)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// Create a product with its category links.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for invalid input, a taken SKU or
    /// unknown brand/categories.
    #[instrument(skip(self, input))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ServiceError> {
        let data = self.product_data(input, None, None).await?;
        let product = self.store.insert_product(&data).await?;
        info!(
            product_id = %product.id,
            sku = %product.sku,
            price = %product.price,
            "Product created"
        );
        Ok(product)
    }

    /// Replace a product's fields and category links.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Validation`.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ServiceError> {
        let current = self.get_product(id).await?;
        let data = self.product_data(input, Some(id), Some(&current)).await?;
        let product = self.store.update_product(id, &data).await?;
        info!(sku = %product.sku, price = %product.price, "Product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, or `ServiceError::Conflict` if the
    /// product appears on an order.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        self.get_product(id).await?;
        self.store.delete_products(&[id]).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Delete several products, all or nothing. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if any product appears on an order.
    #[instrument(skip(self))]
    pub async fn bulk_delete_products(&self, ids: &[ProductId]) -> Result<u64, ServiceError> {
        let deleted = self.store.delete_products(ids).await?;
        info!(deleted, "Products bulk deleted");
        Ok(deleted)
    }

    /// Global product search over name, slug and description.
    ///
    /// A blank needle returns no hits.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, needle: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.store.search_products(needle, SEARCH_LIMIT).await?;
        Ok(products.iter().map(SearchHit::from_product).collect())
    }

    /// Products as select options.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn product_options(&self) -> Result<Vec<SelectOption>, ServiceError> {
        Ok(self.store.product_options().await?)
    }

    async fn product_data(
        &self,
        input: &ProductInput,
        id: Option<ProductId>,
        current: Option<&Product>,
    ) -> Result<ProductData, ServiceError> {
        let mut errors = Resource::Products
            .schema()
            .form
            .validate_input(input)
            .err()
            .unwrap_or_default();

        let name = clean(input.name.as_deref());
        let sku = clean(input.sku.as_deref());

        let slug = match &name {
            Some(name) if !errors.has("name") => {
                unique_slug(
                    self.store,
                    SlugScope::Products,
                    name,
                    id.map(|p| p.as_i64()),
                    &mut errors,
                )
                .await?
            }
            _ => None,
        };
        if let Some(sku) = &sku
            && !errors.has("sku")
            && self.store.sku_taken(sku, id).await?
        {
            errors.add("sku", taken("sku"));
        }
        if let Some(brand_id) = input.brand_id
            && self.store.get_brand(brand_id).await?.is_none()
        {
            errors.add("brand_id", invalid_selection("brand_id"));
        }

        let category_ids: Vec<CategoryId> = input
            .category_ids
            .iter()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !category_ids.is_empty() {
            let existing = self.store.existing_categories(&category_ids).await?;
            if existing.len() != category_ids.len() {
                errors.add("category_ids", invalid_selection("category_ids"));
            }
        }

        let price = match input.price {
            Some(amount) if !errors.has("price") => {
                match Price::new(amount).and_then(|p| p.ensure_at_most(Price::MAX_PRODUCT)) {
                    Ok(price) => Some(price),
                    Err(e) => {
                        errors.add("price", format!("The price field is invalid: {e}."));
                        None
                    }
                }
            }
            _ => None,
        };
        let quantity = input.quantity.and_then(|q| i32::try_from(q).ok());
        errors.into_result()?;

        Ok(ProductData {
            brand_id: input.brand_id,
            name: present(name, "name")?,
            slug: present(slug, "slug")?,
            sku: present(sku, "sku")?,
            image: clean(input.image.as_deref()),
            description: clean(input.description.as_deref()),
            quantity: present(quantity, "quantity")?,
            price: present(price, "price")?,
            is_visible: input
                .is_visible
                .or(current.map(|p| p.is_visible))
                .unwrap_or(true),
            is_featured: input
                .is_featured
                .or(current.map(|p| p.is_featured))
                .unwrap_or(false),
            product_type: present(input.product_type, "type")?,
            published_at: input
                .published_at
                .or(current.map(|p| p.published_at))
                .unwrap_or_else(|| Utc::now().date_naive()),
            category_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use rust_decimal::Decimal;
    use shopdesk_core::{FieldErrors, ProductType};

    fn brand_input(name: &str, url: &str) -> BrandInput {
        BrandInput {
            name: Some(name.to_string()),
            url: Some(url.to_string()),
            ..BrandInput::default()
        }
    }

    fn product_input(name: &str, sku: &str) -> ProductInput {
        ProductInput {
            name: Some(name.to_string()),
            sku: Some(sku.to_string()),
            price: Some(Decimal::new(1250, 2)),
            quantity: Some(5),
            product_type: Some(ProductType::Deliverable),
            ..ProductInput::default()
        }
    }

    fn errors_of(result: Result<impl std::fmt::Debug, ServiceError>) -> FieldErrors {
        match result {
            Err(ServiceError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_brand_slug_is_derived_and_suffixed() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);

        let first = service
            .create_brand(&brand_input("Acme Co", "https://acme.example"))
            .await
            .unwrap();
        let second = service
            .create_brand(&brand_input("Acme Co", "https://acme2.example"))
            .await
            .unwrap();

        assert_eq!(first.slug.as_str(), "acme-co");
        assert_eq!(second.slug.as_str(), "acme-co-2");
        assert!(first.is_visible);
    }

    #[tokio::test]
    async fn test_brand_url_must_be_unique() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        service
            .create_brand(&brand_input("Acme", "https://acme.example"))
            .await
            .unwrap();

        let errors = errors_of(
            service
                .create_brand(&brand_input("Other", "https://acme.example"))
                .await,
        );
        assert_eq!(errors.get("url"), ["The url has already been taken."]);
    }

    #[tokio::test]
    async fn test_brand_update_keeps_own_slug_and_visibility() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let mut input = brand_input("Acme", "https://acme.example");
        input.is_visible = Some(false);
        let brand = service.create_brand(&input).await.unwrap();

        let updated = service
            .update_brand(brand.id, &brand_input("Acme", "https://acme.example"))
            .await
            .unwrap();
        assert_eq!(updated.slug.as_str(), "acme");
        assert!(!updated.is_visible);
    }

    #[tokio::test]
    async fn test_brand_with_products_cannot_be_deleted() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let brand = service
            .create_brand(&brand_input("Acme", "https://acme.example"))
            .await
            .unwrap();
        let mut product = product_input("Shoe", "SH-1");
        product.brand_id = Some(brand.id);
        service.create_product(&product).await.unwrap();

        let err = service.delete_brand(brand.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(service.get_brand(brand.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_category_cannot_be_its_own_parent() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let parent = service
            .create_category(&CategoryInput {
                name: Some("Shoes".to_string()),
                ..CategoryInput::default()
            })
            .await
            .unwrap();
        let child = service
            .create_category(&CategoryInput {
                name: Some("Boots".to_string()),
                parent_id: Some(parent.id),
                ..CategoryInput::default()
            })
            .await
            .unwrap();

        for new_parent in [parent.id, child.id] {
            let errors = errors_of(
                service
                    .update_category(
                        parent.id,
                        &CategoryInput {
                            name: Some("Shoes".to_string()),
                            parent_id: Some(new_parent),
                            ..CategoryInput::default()
                        },
                    )
                    .await,
            );
            assert!(errors.has("parent_id"));
        }
    }

    #[tokio::test]
    async fn test_category_parent_must_exist() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let errors = errors_of(
            service
                .create_category(&CategoryInput {
                    name: Some("Boots".to_string()),
                    parent_id: Some(CategoryId::new(42)),
                    ..CategoryInput::default()
                })
                .await,
        );
        assert_eq!(errors.get("parent_id"), ["The selected parent id is invalid."]);
    }

    #[tokio::test]
    async fn test_product_quantity_above_hundred_is_rejected() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let mut input = product_input("Shoe", "SH-1");
        input.quantity = Some(150);

        let errors = errors_of(service.create_product(&input).await);
        assert_eq!(
            errors.get("quantity"),
            ["The quantity field must not be greater than 100."]
        );
    }

    #[tokio::test]
    async fn test_product_sku_and_categories_are_checked() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        service
            .create_product(&product_input("Shoe", "SH-1"))
            .await
            .unwrap();

        let mut input = product_input("Boot", "SH-1");
        input.category_ids = Some(vec![CategoryId::new(7)]);
        let errors = errors_of(service.create_product(&input).await);
        assert_eq!(errors.get("sku"), ["The sku has already been taken."]);
        assert_eq!(
            errors.get("category_ids"),
            ["The selected category ids is invalid."]
        );
    }

    #[tokio::test]
    async fn test_product_defaults_and_links() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let category = service
            .create_category(&CategoryInput {
                name: Some("Shoes".to_string()),
                ..CategoryInput::default()
            })
            .await
            .unwrap();
        let mut input = product_input("Trail Shoe", "TR-1");
        input.category_ids = Some(vec![category.id, category.id]);

        let product = service.create_product(&input).await.unwrap();
        assert_eq!(product.slug.as_str(), "trail-shoe");
        assert_eq!(product.price.to_string(), "12.50");
        assert!(product.is_visible);
        assert!(!product.is_featured);
        assert_eq!(product.published_at, Utc::now().date_naive());
        assert_eq!(product.category_ids, vec![category.id]);
    }

    #[tokio::test]
    async fn test_search_matches_description_and_ignores_blank() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let mut input = product_input("Trail Shoe", "TR-1");
        input.description = Some("Grippy sole for MUD".to_string());
        service.create_product(&input).await.unwrap();
        service
            .create_product(&product_input("Sandal", "SA-1"))
            .await
            .unwrap();

        let hits = service.search_products("mud").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Trail Shoe");
        assert!(service.search_products("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_caps_hits_and_lists_details() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let brand = service
            .create_brand(&brand_input("Acme", "https://acme.example"))
            .await
            .unwrap();
        for n in 1..=25 {
            let mut input = product_input(&format!("Boot {n}"), &format!("BT-{n}"));
            input.brand_id = Some(brand.id);
            input.description = Some("Waterproof".to_string());
            input.published_at = chrono::NaiveDate::from_ymd_opt(2024, 11, 1);
            service.create_product(&input).await.unwrap();
        }

        let hits = service.search_products("boot").await.unwrap();
        assert_eq!(hits.len(), 20);

        let details: Vec<(&str, &str)> = hits[0]
            .details
            .iter()
            .map(|(label, value)| (label.as_str(), value.as_str()))
            .collect();
        assert_eq!(
            details,
            [
                ("Brand", "Acme"),
                ("Description", "Waterproof"),
                ("Published", "2024-11-01"),
            ]
        );
        assert!(hits[0].url.starts_with("/products/"));
    }
}
