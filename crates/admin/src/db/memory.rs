//! In-memory store.
//!
//! Intended for tests and demos. All tables live behind one lock, so every
//! write method is atomic the same way a database transaction is. Foreign
//! keys behave like the `PostgreSQL` schema: restrict, cascade or set null.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use shopdesk_core::{
    BrandId, CategoryId, CustomerId, OrderId, OrderItemId, Price, ProductId, Slug,
};

use super::{
    BrandStore, CategoryStore, CustomerStore, OrderStore, ProductStore, RepositoryError,
    SlugScope, SlugStore, Store,
};
use crate::models::{
    Brand, BrandData, Category, CategoryData, Customer, CustomerData, ListQuery, Order,
    OrderDraft, OrderFilter, OrderItem, Page, Product, ProductData, ProductFilter, Record,
    SelectOption, paginate,
};

#[derive(Debug, Default)]
struct Tables {
    brands: BTreeMap<i64, Brand>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    customers: BTreeMap<i64, Customer>,
    orders: BTreeMap<i64, Order>,
    last_id: Sequences,
}

#[derive(Debug, Default)]
struct Sequences {
    brand: i64,
    category: i64,
    product: i64,
    customer: i64,
    order: i64,
    order_item: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl Tables {
    fn category(&self, raw: &Category) -> Category {
        let mut category = raw.clone();
        category.parent_name = raw
            .parent_id
            .and_then(|p| self.categories.get(&p.as_i64()))
            .map(|p| p.name.clone());
        category
    }

    fn product(&self, raw: &Product) -> Product {
        let mut product = raw.clone();
        product.brand_name = raw
            .brand_id
            .and_then(|b| self.brands.get(&b.as_i64()))
            .map(|b| b.name.clone());
        product
    }

    fn order(&self, raw: &Order, with_items: bool) -> Order {
        let mut order = raw.clone();
        order.customer_name = self
            .customers
            .get(&raw.customer_id.as_i64())
            .map(|c| c.name.clone());
        if with_items {
            for item in &mut order.items {
                item.product_name = self
                    .products
                    .get(&item.product_id.as_i64())
                    .map(|p| p.name.clone());
            }
        } else {
            order.items.clear();
        }
        order
    }

    fn filtered_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| filter.matches(o))
            .map(|o| self.order(o, false))
            .collect()
    }

    fn slug_taken(&self, scope: SlugScope, slug: &Slug, except: Option<i64>) -> bool {
        let others = |id: i64| Some(id) != except;
        match scope {
            SlugScope::Brands => self
                .brands
                .values()
                .any(|b| others(b.id.as_i64()) && &b.slug == slug),
            SlugScope::Categories => self
                .categories
                .values()
                .any(|c| others(c.id.as_i64()) && &c.slug == slug),
            SlugScope::Products => self
                .products
                .values()
                .any(|p| others(p.id.as_i64()) && &p.slug == slug),
        }
    }

    fn check_brand_unique(&self, data: &BrandData, except: Option<i64>) -> Result<(), RepositoryError> {
        if self.slug_taken(SlugScope::Brands, &data.slug, except) {
            return Err(RepositoryError::Conflict("brands.slug already exists".into()));
        }
        if self
            .brands
            .values()
            .any(|b| Some(b.id.as_i64()) != except && b.url == data.url)
        {
            return Err(RepositoryError::Conflict("brands.url already exists".into()));
        }
        Ok(())
    }

    fn check_product_refs(&self, data: &ProductData, except: Option<i64>) -> Result<(), RepositoryError> {
        if self.slug_taken(SlugScope::Products, &data.slug, except) {
            return Err(RepositoryError::Conflict("products.slug already exists".into()));
        }
        if self
            .products
            .values()
            .any(|p| Some(p.id.as_i64()) != except && p.sku == data.sku)
        {
            return Err(RepositoryError::Conflict("products.sku already exists".into()));
        }
        if let Some(brand) = data.brand_id
            && !self.brands.contains_key(&brand.as_i64())
        {
            return Err(RepositoryError::Conflict(format!("brand {brand} does not exist")));
        }
        if let Some(missing) = data
            .category_ids
            .iter()
            .find(|c| !self.categories.contains_key(&c.as_i64()))
        {
            return Err(RepositoryError::Conflict(format!("category {missing} does not exist")));
        }
        Ok(())
    }

    fn check_order_refs(&self, draft: &OrderDraft, except: Option<i64>) -> Result<(), RepositoryError> {
        if !self.customers.contains_key(&draft.customer_id.as_i64()) {
            return Err(RepositoryError::Conflict(format!(
                "customer {} does not exist",
                draft.customer_id
            )));
        }
        if self
            .orders
            .values()
            .any(|o| Some(o.id.as_i64()) != except && o.number == draft.number)
        {
            return Err(RepositoryError::Conflict("orders.number already exists".into()));
        }
        if let Some(line) = draft
            .items
            .iter()
            .find(|l| !self.products.contains_key(&l.product_id.as_i64()))
        {
            return Err(RepositoryError::Conflict(format!(
                "product {} does not exist",
                line.product_id
            )));
        }
        Ok(())
    }

    fn product_on_order(&self, id: ProductId) -> bool {
        self.orders
            .values()
            .any(|o| o.items.iter().any(|i| i.product_id == id))
    }
}

fn options<T: Record>(records: impl Iterator<Item = T>) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = records
        .map(|r| SelectOption {
            id: r.id(),
            name: r.title(),
        })
        .collect();
    options.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    options
}

/// Store backed by process-local maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::DataCorruption("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::DataCorruption("lock poisoned".to_string()))
    }
}

#[async_trait]
impl SlugStore for MemoryStore {
    async fn slug_taken(
        &self,
        scope: SlugScope,
        slug: &Slug,
        except: Option<i64>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.read()?.slug_taken(scope, slug, except))
    }
}

#[async_trait]
impl BrandStore for MemoryStore {
    async fn list_brands(&self, query: &ListQuery) -> Result<Page<Brand>, RepositoryError> {
        let tables = self.read()?;
        Ok(paginate(tables.brands.values().cloned().collect(), query))
    }

    async fn get_brand(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        Ok(self.read()?.brands.get(&id.as_i64()).cloned())
    }

    async fn insert_brand(&self, data: &BrandData) -> Result<Brand, RepositoryError> {
        let mut tables = self.write()?;
        tables.check_brand_unique(data, None)?;

        let now = Utc::now();
        let id = next(&mut tables.last_id.brand);
        let brand = Brand {
            id: BrandId::new(id),
            name: data.name.clone(),
            slug: data.slug.clone(),
            url: data.url.clone(),
            description: data.description.clone(),
            is_visible: data.is_visible,
            primary_hex: data.primary_hex.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.brands.insert(id, brand.clone());
        Ok(brand)
    }

    async fn update_brand(&self, id: BrandId, data: &BrandData) -> Result<Brand, RepositoryError> {
        let mut tables = self.write()?;
        tables.check_brand_unique(data, Some(id.as_i64()))?;

        let brand = tables
            .brands
            .get_mut(&id.as_i64())
            .ok_or(RepositoryError::NotFound)?;
        brand.name.clone_from(&data.name);
        brand.slug = data.slug.clone();
        brand.url.clone_from(&data.url);
        brand.description.clone_from(&data.description);
        brand.is_visible = data.is_visible;
        brand.primary_hex.clone_from(&data.primary_hex);
        brand.updated_at = Utc::now();
        Ok(brand.clone())
    }

    async fn delete_brands(&self, ids: &[BrandId]) -> Result<u64, RepositoryError> {
        let mut tables = self.write()?;
        if let Some(owner) = ids
            .iter()
            .find(|id| tables.products.values().any(|p| p.brand_id == Some(**id)))
        {
            return Err(RepositoryError::Conflict(format!(
                "brand {owner} still owns products"
            )));
        }
        let removed = ids
            .iter()
            .filter(|id| tables.brands.remove(&id.as_i64()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn brand_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        Ok(options(self.read()?.brands.values().cloned()))
    }

    async fn brand_url_taken(
        &self,
        url: &str,
        except: Option<BrandId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .read()?
            .brands
            .values()
            .any(|b| Some(b.id) != except && b.url == url))
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self, query: &ListQuery) -> Result<Page<Category>, RepositoryError> {
        let tables = self.read()?;
        let rows = tables
            .categories
            .values()
            .map(|c| tables.category(c))
            .collect();
        Ok(paginate(rows, query))
    }

    async fn all_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .values()
            .map(|c| tables.category(c))
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .get(&id.as_i64())
            .map(|c| tables.category(c)))
    }

    async fn insert_category(&self, data: &CategoryData) -> Result<Category, RepositoryError> {
        let mut tables = self.write()?;
        if tables.slug_taken(SlugScope::Categories, &data.slug, None) {
            return Err(RepositoryError::Conflict("categories.slug already exists".into()));
        }
        if let Some(parent) = data.parent_id
            && !tables.categories.contains_key(&parent.as_i64())
        {
            return Err(RepositoryError::Conflict(format!("category {parent} does not exist")));
        }

        let now = Utc::now();
        let id = next(&mut tables.last_id.category);
        let category = Category {
            id: CategoryId::new(id),
            name: data.name.clone(),
            slug: data.slug.clone(),
            description: data.description.clone(),
            is_visible: data.is_visible,
            parent_id: data.parent_id,
            parent_name: None,
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(id, category.clone());
        Ok(tables.category(&category))
    }

    async fn update_category(
        &self,
        id: CategoryId,
        data: &CategoryData,
    ) -> Result<Category, RepositoryError> {
        let mut tables = self.write()?;
        if tables.slug_taken(SlugScope::Categories, &data.slug, Some(id.as_i64())) {
            return Err(RepositoryError::Conflict("categories.slug already exists".into()));
        }
        if let Some(parent) = data.parent_id
            && !tables.categories.contains_key(&parent.as_i64())
        {
            return Err(RepositoryError::Conflict(format!("category {parent} does not exist")));
        }

        let category = tables
            .categories
            .get_mut(&id.as_i64())
            .ok_or(RepositoryError::NotFound)?;
        category.name.clone_from(&data.name);
        category.slug = data.slug.clone();
        category.description.clone_from(&data.description);
        category.is_visible = data.is_visible;
        category.parent_id = data.parent_id;
        category.updated_at = Utc::now();
        let category = category.clone();
        Ok(tables.category(&category))
    }

    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<u64, RepositoryError> {
        let mut tables = self.write()?;
        let doomed: HashSet<CategoryId> = ids.iter().copied().collect();
        let removed = ids
            .iter()
            .filter(|id| tables.categories.remove(&id.as_i64()).is_some())
            .count();

        // ON DELETE SET NULL for children, ON DELETE CASCADE for the pivot.
        for category in tables.categories.values_mut() {
            if category.parent_id.is_some_and(|p| doomed.contains(&p)) {
                category.parent_id = None;
            }
        }
        for product in tables.products.values_mut() {
            product.category_ids.retain(|c| !doomed.contains(c));
        }
        Ok(removed as u64)
    }

    async fn category_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        Ok(options(self.read()?.categories.values().cloned()))
    }

    async fn existing_categories(
        &self,
        ids: &[CategoryId],
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.categories.contains_key(&id.as_i64()))
            .collect())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(
        &self,
        query: &ListQuery,
        filter: &ProductFilter,
    ) -> Result<Page<Product>, RepositoryError> {
        let tables = self.read()?;
        let rows = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .map(|p| tables.product(p))
            .collect();
        Ok(paginate(rows, query))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables.products.get(&id.as_i64()).map(|p| tables.product(p)))
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(&id.as_i64()))
            .map(|p| tables.product(p))
            .collect())
    }

    async fn insert_product(&self, data: &ProductData) -> Result<Product, RepositoryError> {
        let mut tables = self.write()?;
        tables.check_product_refs(data, None)?;

        let now = Utc::now();
        let id = next(&mut tables.last_id.product);
        let mut category_ids = data.category_ids.clone();
        category_ids.sort();
        category_ids.dedup();
        let product = Product {
            id: ProductId::new(id),
            brand_id: data.brand_id,
            brand_name: None,
            name: data.name.clone(),
            slug: data.slug.clone(),
            sku: data.sku.clone(),
            image: data.image.clone(),
            description: data.description.clone(),
            quantity: data.quantity,
            price: data.price,
            is_visible: data.is_visible,
            is_featured: data.is_featured,
            product_type: data.product_type,
            published_at: data.published_at,
            category_ids,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(id, product.clone());
        Ok(tables.product(&product))
    }

    async fn update_product(
        &self,
        id: ProductId,
        data: &ProductData,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.write()?;
        tables.check_product_refs(data, Some(id.as_i64()))?;

        let product = tables
            .products
            .get_mut(&id.as_i64())
            .ok_or(RepositoryError::NotFound)?;
        product.brand_id = data.brand_id;
        product.name.clone_from(&data.name);
        product.slug = data.slug.clone();
        product.sku.clone_from(&data.sku);
        product.image.clone_from(&data.image);
        product.description.clone_from(&data.description);
        product.quantity = data.quantity;
        product.price = data.price;
        product.is_visible = data.is_visible;
        product.is_featured = data.is_featured;
        product.product_type = data.product_type;
        product.published_at = data.published_at;
        product.category_ids.clone_from(&data.category_ids);
        product.category_ids.sort();
        product.category_ids.dedup();
        product.updated_at = Utc::now();
        let product = product.clone();
        Ok(tables.product(&product))
    }

    async fn delete_products(&self, ids: &[ProductId]) -> Result<u64, RepositoryError> {
        let mut tables = self.write()?;
        if let Some(used) = ids.iter().find(|id| tables.product_on_order(**id)) {
            return Err(RepositoryError::Conflict(format!(
                "product {used} is referenced by order items"
            )));
        }
        let removed = ids
            .iter()
            .filter(|id| tables.products.remove(&id.as_i64()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn search_products(
        &self,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.read()?;
        let needle = needle.to_lowercase();
        let mut hits: Vec<Product> = tables
            .products
            .values()
            .filter(|p| {
                ["name", "slug", "description"]
                    .iter()
                    .any(|key| p.value(key).contains(&needle))
            })
            .map(|p| tables.product(p))
            .collect();
        hits.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn product_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        Ok(options(self.read()?.products.values().cloned()))
    }

    async fn sku_taken(
        &self,
        sku: &str,
        except: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .read()?
            .products
            .values()
            .any(|p| Some(p.id) != except && p.sku == sku))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>, RepositoryError> {
        let tables = self.read()?;
        Ok(paginate(tables.customers.values().cloned().collect(), query))
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.read()?.customers.get(&id.as_i64()).cloned())
    }

    async fn insert_customer(&self, data: &CustomerData) -> Result<Customer, RepositoryError> {
        let mut tables = self.write()?;
        if tables.customers.values().any(|c| c.email == data.email) {
            return Err(RepositoryError::Conflict("customers.email already exists".into()));
        }

        let now = Utc::now();
        let id = next(&mut tables.last_id.customer);
        let customer = Customer {
            id: CustomerId::new(id),
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        data: &CustomerData,
    ) -> Result<Customer, RepositoryError> {
        let mut tables = self.write()?;
        if tables
            .customers
            .values()
            .any(|c| c.id != id && c.email == data.email)
        {
            return Err(RepositoryError::Conflict("customers.email already exists".into()));
        }

        let customer = tables
            .customers
            .get_mut(&id.as_i64())
            .ok_or(RepositoryError::NotFound)?;
        customer.name.clone_from(&data.name);
        customer.email.clone_from(&data.email);
        customer.phone.clone_from(&data.phone);
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn delete_customers(&self, ids: &[CustomerId]) -> Result<u64, RepositoryError> {
        let mut tables = self.write()?;
        let doomed: HashSet<CustomerId> = ids.iter().copied().collect();
        let removed = ids
            .iter()
            .filter(|id| tables.customers.remove(&id.as_i64()).is_some())
            .count();
        tables.orders.retain(|_, o| !doomed.contains(&o.customer_id));
        Ok(removed as u64)
    }

    async fn customer_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        Ok(options(self.read()?.customers.values().cloned()))
    }

    async fn email_taken(
        &self,
        email: &str,
        except: Option<CustomerId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .read()?
            .customers
            .values()
            .any(|c| Some(c.id) != except && c.email.eq_ignore_ascii_case(email)))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<Page<Order>, RepositoryError> {
        let tables = self.read()?;
        Ok(paginate(tables.filtered_orders(filter), query))
    }

    async fn sum_order_totals(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<Price, RepositoryError> {
        let tables = self.read()?;
        let all = ListQuery {
            page: 1,
            per_page: u32::MAX,
            ..query.clone()
        };
        Ok(paginate(tables.filtered_orders(filter), &all)
            .items
            .iter()
            .map(|o| o.total_price)
            .sum())
    }

    async fn get_order(
        &self,
        id: OrderId,
        include_trashed: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables
            .orders
            .get(&id.as_i64())
            .filter(|o| include_trashed || !o.is_trashed())
            .map(|o| tables.order(o, true)))
    }

    async fn order_number_taken(&self, number: &str) -> Result<bool, RepositoryError> {
        Ok(self.read()?.orders.values().any(|o| o.number == number))
    }

    async fn insert_order(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let mut tables = self.write()?;
        tables.check_order_refs(draft, None)?;

        let now = Utc::now();
        let id = OrderId::new(next(&mut tables.last_id.order));
        let mut items = Vec::with_capacity(draft.items.len());
        for line in &draft.items {
            items.push(OrderItem {
                id: OrderItemId::new(next(&mut tables.last_id.order_item)),
                order_id: id,
                product_id: line.product_id,
                product_name: None,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }
        let order = Order {
            id,
            customer_id: draft.customer_id,
            customer_name: None,
            number: draft.number.clone(),
            total_price: draft.total_price(),
            status: draft.status,
            shipping_price: draft.shipping_price,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            items,
        };
        tables.orders.insert(id.as_i64(), order.clone());
        Ok(tables.order(&order, true))
    }

    async fn save_order(&self, id: OrderId, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let mut tables = self.write()?;
        tables.check_order_refs(draft, Some(id.as_i64()))?;

        let existing = tables
            .orders
            .get(&id.as_i64())
            .filter(|order| order.deleted_at.is_none())
            .ok_or(RepositoryError::NotFound)?;
        let stored: HashSet<OrderItemId> = existing.items.iter().map(|i| i.id).collect();
        if let Some(foreign) = draft
            .items
            .iter()
            .filter_map(|l| l.id)
            .find(|item_id| !stored.contains(item_id))
        {
            return Err(RepositoryError::Conflict(format!(
                "item {foreign} does not belong to order {id}"
            )));
        }

        let mut items = Vec::with_capacity(draft.items.len());
        for line in &draft.items {
            let item_id = match line.id {
                Some(item_id) => item_id,
                None => OrderItemId::new(next(&mut tables.last_id.order_item)),
            };
            items.push(OrderItem {
                id: item_id,
                order_id: id,
                product_id: line.product_id,
                product_name: None,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        let order = tables
            .orders
            .get_mut(&id.as_i64())
            .ok_or(RepositoryError::NotFound)?;
        order.customer_id = draft.customer_id;
        order.number.clone_from(&draft.number);
        order.status = draft.status;
        order.shipping_price = draft.shipping_price;
        order.notes.clone_from(&draft.notes);
        order.total_price = draft.total_price();
        order.items = items;
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(tables.order(&order, true))
    }

    async fn soft_delete_orders(&self, ids: &[OrderId]) -> Result<u64, RepositoryError> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let mut count = 0;
        for id in ids {
            if let Some(order) = tables.orders.get_mut(&id.as_i64())
                && order.deleted_at.is_none()
            {
                order.deleted_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn restore_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut tables = self.write()?;
        Ok(tables
            .orders
            .get_mut(&id.as_i64())
            .map(|order| order.deleted_at = None)
            .is_some())
    }

    async fn force_delete_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.write()?.orders.remove(&id.as_i64()).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shopdesk_core::{OrderStatus, ProductType};

    use crate::models::LineItem;

    fn brand_data(name: &str) -> BrandData {
        BrandData {
            name: name.to_string(),
            slug: Slug::from_name(name).unwrap(),
            url: format!("https://{}.test", Slug::from_name(name).unwrap()),
            description: None,
            is_visible: true,
            primary_hex: None,
        }
    }

    fn product_data(name: &str, brand: Option<BrandId>) -> ProductData {
        ProductData {
            brand_id: brand,
            name: name.to_string(),
            slug: Slug::from_name(name).unwrap(),
            sku: name.to_uppercase(),
            image: None,
            description: None,
            quantity: 5,
            price: Price::from_cents(1000),
            is_visible: true,
            is_featured: false,
            product_type: ProductType::Deliverable,
            published_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            category_ids: vec![],
        }
    }

    async fn customer(store: &MemoryStore) -> Customer {
        store
            .insert_customer(&CustomerData {
                name: "Aina".to_string(),
                email: "aina@shop.test".to_string(),
                phone: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_brand_delete_blocked_while_it_owns_products() {
        let store = MemoryStore::new();
        let brand = store.insert_brand(&brand_data("Acme")).await.unwrap();
        store
            .insert_product(&product_data("Widget", Some(brand.id)))
            .await
            .unwrap();

        let err = store.delete_brands(&[brand.id]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(store.get_brand(brand.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_brand(&brand_data("Acme")).await.unwrap();
        let mut dup = brand_data("Acme");
        dup.url = "https://other.test".to_string();
        let err = store.insert_brand(&dup).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_category_delete_detaches_children_and_pivot() {
        let store = MemoryStore::new();
        let parent = store
            .insert_category(&CategoryData {
                name: "Shoes".to_string(),
                slug: Slug::from_name("Shoes").unwrap(),
                description: None,
                is_visible: true,
                parent_id: None,
            })
            .await
            .unwrap();
        let child = store
            .insert_category(&CategoryData {
                name: "Boots".to_string(),
                slug: Slug::from_name("Boots").unwrap(),
                description: None,
                is_visible: true,
                parent_id: Some(parent.id),
            })
            .await
            .unwrap();
        assert_eq!(child.parent_name.as_deref(), Some("Shoes"));

        let mut data = product_data("Runner", None);
        data.category_ids = vec![parent.id, child.id];
        let product = store.insert_product(&data).await.unwrap();

        store.delete_categories(&[parent.id]).await.unwrap();

        let child = store.get_category(child.id).await.unwrap().unwrap();
        assert_eq!(child.parent_id, None);
        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.category_ids, vec![child.id]);
    }

    #[tokio::test]
    async fn test_save_order_syncs_items() {
        let store = MemoryStore::new();
        let customer = customer(&store).await;
        let a = store.insert_product(&product_data("Alpha", None)).await.unwrap();
        let b = store.insert_product(&product_data("Beta", None)).await.unwrap();

        let mut draft = OrderDraft {
            customer_id: customer.id,
            number: "OR-123456".to_string(),
            status: OrderStatus::Pending,
            shipping_price: None,
            notes: String::new(),
            items: vec![
                LineItem {
                    id: None,
                    product_id: a.id,
                    quantity: 1,
                    unit_price: a.price,
                },
                LineItem {
                    id: None,
                    product_id: b.id,
                    quantity: 2,
                    unit_price: b.price,
                },
            ],
        };
        let order = store.insert_order(&draft).await.unwrap();
        assert_eq!(order.total_price.to_string(), "30.00");
        assert_eq!(order.customer_name.as_deref(), Some("Aina"));

        let kept = order.items[0].id;
        draft.items = vec![LineItem {
            id: Some(kept),
            product_id: a.id,
            quantity: 4,
            unit_price: a.price,
        }];
        let saved = store.save_order(order.id, &draft).await.unwrap();
        assert_eq!(saved.items.len(), 1);
        assert_eq!(saved.items[0].id, kept);
        assert_eq!(saved.total_price.to_string(), "40.00");
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let store = MemoryStore::new();
        let customer = customer(&store).await;
        let mut draft = OrderDraft {
            customer_id: customer.id,
            number: "OR-654321".to_string(),
            status: OrderStatus::Pending,
            shipping_price: None,
            notes: String::new(),
            items: vec![],
        };
        let order = store.insert_order(&draft).await.unwrap();

        assert_eq!(store.soft_delete_orders(&[order.id]).await.unwrap(), 1);
        assert!(store.get_order(order.id, false).await.unwrap().is_none());
        let page = store
            .list_orders(&ListQuery::default(), &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        // Trashed orders reject writes even when loaded before the delete.
        draft.status = OrderStatus::Completed;
        let err = store.save_order(order.id, &draft).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        let trashed = store.get_order(order.id, true).await.unwrap().unwrap();
        assert_eq!(trashed.status, OrderStatus::Pending);

        assert!(store.restore_order(order.id).await.unwrap());
        assert!(store.get_order(order.id, false).await.unwrap().is_some());
        let saved = store.save_order(order.id, &draft).await.unwrap();
        assert_eq!(saved.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_customer_delete_cascades_orders() {
        let store = MemoryStore::new();
        let customer = customer(&store).await;
        let order = store
            .insert_order(&OrderDraft {
                customer_id: customer.id,
                number: "OR-111111".to_string(),
                status: OrderStatus::Completed,
                shipping_price: Some(Price::from_cents(500)),
                notes: String::new(),
                items: vec![],
            })
            .await
            .unwrap();

        store.delete_customers(&[customer.id]).await.unwrap();
        assert!(store.get_order(order.id, true).await.unwrap().is_none());
    }
}
