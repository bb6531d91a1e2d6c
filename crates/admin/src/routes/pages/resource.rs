//! Table, detail and form pages shared by every resource.

use std::collections::BTreeMap;

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;
use url::form_urlencoded;

use shopdesk_core::{BrandId, CategoryId, CurrencyCode, CustomerId, FieldErrors, OrderId, ProductId};

use super::{NavLink, PageError, Pairs, nav, notice, render, unprocessable};
use crate::error::AppError;
use crate::models::{
    BrandInput, CategoryInput, CustomerInput, Order, OrderInput, ProductInput, Record,
};
use crate::resources::render::{
    self as view, DetailEntry, FieldView, OptionView, RowView, SelectOptions,
};
use crate::resources::{FilterType, OptionSource, Resource, ResourceSchema, TableColumn, orders};
use crate::routes::api::{Params, parse_input};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// A sortable or plain column header.
#[derive(Debug, Clone)]
pub struct HeaderView {
    pub label: String,
    /// Link that sorts by this column; empty when unsortable.
    pub href: String,
    /// `asc`, `desc`, or empty when the table is not sorted by this column.
    pub sorted: &'static str,
}

/// A table filter with its current selection.
#[derive(Debug, Clone)]
pub struct FilterView {
    pub key: String,
    pub label: String,
    pub options: Vec<OptionView>,
}

/// Show/hide link for a toggleable column.
#[derive(Debug, Clone)]
pub struct ToggleView {
    pub label: String,
    pub href: String,
    pub visible: bool,
}

/// Query parameter carried through the search form.
#[derive(Debug, Clone)]
pub struct HiddenField {
    pub name: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "resources/index.html")]
pub struct IndexTemplate {
    pub nav: Vec<NavLink>,
    pub slug: &'static str,
    pub title: &'static str,
    pub singular: &'static str,
    pub notice: Option<String>,
    pub search: String,
    pub hidden: Vec<HiddenField>,
    pub filters: Vec<FilterView>,
    pub headers: Vec<HeaderView>,
    pub toggles: Vec<ToggleView>,
    pub rows: Vec<RowView>,
    pub bulk_delete: bool,
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
    pub prev: Option<String>,
    pub next: Option<String>,
    /// Formatted `total_price` sum for the order table.
    pub summary: Option<String>,
}

/// An order line on the order detail page.
#[derive(Debug, Clone)]
pub struct ItemView {
    pub product: String,
    pub product_href: String,
    pub quantity: i32,
    pub unit_price: String,
    pub total: String,
}

#[derive(Template)]
#[template(path = "resources/show.html")]
pub struct ShowTemplate {
    pub nav: Vec<NavLink>,
    pub slug: &'static str,
    pub singular: &'static str,
    pub id: i64,
    pub title: String,
    pub notice: Option<String>,
    pub entries: Vec<DetailEntry>,
    pub items: Vec<ItemView>,
    pub is_order: bool,
    pub trashed: bool,
}

#[derive(Template)]
#[template(path = "resources/form.html")]
pub struct FormTemplate {
    pub nav: Vec<NavLink>,
    pub slug: &'static str,
    pub title: String,
    pub action: String,
    pub cancel: String,
    pub fields: Vec<FieldView>,
    /// Messages not tied to a visible input.
    pub errors: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// The resource table.
#[instrument(skip(state))]
pub(super) async fn index(
    resource: Resource,
    State(state): State<AppState>,
    params: Params,
) -> Result<Html<String>, PageError> {
    let schema = resource.schema();
    let columns = schema.visible_columns(params.get("columns").map(String::as_str));
    let listing = listing(&state, resource, &params, &columns).await?;
    let filters = filters(&state, schema, &params).await?;

    let slug = resource.slug();
    let prev = (listing.page > 1)
        .then(|| link(slug, &params, &[("page", Some((listing.page - 1).to_string()))]));
    let next = (listing.page < listing.last_page)
        .then(|| link(slug, &params, &[("page", Some((listing.page + 1).to_string()))]));

    let template = IndexTemplate {
        nav: nav(Some(resource)),
        slug,
        title: schema.plural_label,
        singular: schema.label,
        notice: notice(&params),
        search: params.get("q").cloned().unwrap_or_default(),
        hidden: hidden_fields(schema, &params),
        filters,
        headers: headers(schema, &params, &columns),
        toggles: toggles(schema, &params, &columns),
        rows: listing.rows,
        bulk_delete: !schema.bulk_actions.is_empty(),
        total: listing.total,
        page: listing.page,
        last_page: listing.last_page,
        prev,
        next,
        summary: listing.summary,
    };
    Ok(render(&template))
}

/// Blank create form.
#[instrument(skip(state))]
pub(super) async fn create(
    resource: Resource,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let schema = resource.schema();
    let values = schema.form.defaults();
    Ok(form_page(&state, resource, None, &values, &FieldErrors::new()).await?)
}

/// Submit the create form.
#[instrument(skip(state, pairs))]
pub(super) async fn store(
    resource: Resource,
    State(state): State<AppState>,
    pairs: Pairs,
) -> Result<Response, PageError> {
    let submitted = resource.schema().form.from_form(&pairs);
    match save(&state, resource, None, &submitted).await {
        Ok(id) => Ok(Redirect::to(&format!("/{}/{id}?notice=created", resource.slug())).into_response()),
        Err(AppError::Validation(errors)) => {
            let mut values = resource.schema().form.defaults();
            overlay(&mut values, submitted);
            let page = form_page(&state, resource, None, &values, &errors).await?;
            Ok(unprocessable(page))
        }
        Err(e) => Err(e.into()),
    }
}

/// Detail page.
#[instrument(skip(state))]
pub(super) async fn show(
    resource: Resource,
    State(state): State<AppState>,
    id: i64,
    params: Params,
) -> Result<Html<String>, PageError> {
    let currency = state.config().currency;
    let schema = resource.schema();
    let loaded = load(&state, resource, id).await?;

    let items = loaded
        .order
        .as_ref()
        .map(|order| item_views(order, currency))
        .unwrap_or_default();

    let template = ShowTemplate {
        nav: nav(Some(resource)),
        slug: resource.slug(),
        singular: schema.label,
        id,
        title: loaded.title,
        notice: notice(&params),
        entries: loaded.entries,
        items,
        is_order: resource == Resource::Orders,
        trashed: loaded.order.as_ref().is_some_and(Order::is_trashed),
    };
    Ok(render(&template))
}

/// Edit form filled with the stored record.
#[instrument(skip(state))]
pub(super) async fn edit(
    resource: Resource,
    State(state): State<AppState>,
    id: i64,
) -> Result<Html<String>, PageError> {
    let loaded = load(&state, resource, id).await?;
    if loaded.order.as_ref().is_some_and(Order::is_trashed) {
        return Err(AppError::NotFound("order not found".to_string()).into());
    }
    Ok(form_page(&state, resource, Some(id), &loaded.values, &FieldErrors::new()).await?)
}

/// Submit the edit form.
#[instrument(skip(state, pairs))]
pub(super) async fn update(
    resource: Resource,
    State(state): State<AppState>,
    id: i64,
    pairs: Pairs,
) -> Result<Response, PageError> {
    let submitted = resource.schema().form.from_form(&pairs);
    match save(&state, resource, Some(id), &submitted).await {
        Ok(id) => Ok(Redirect::to(&format!("/{}/{id}?notice=saved", resource.slug())).into_response()),
        Err(AppError::Validation(errors)) => {
            let mut values = load(&state, resource, id).await?.values;
            overlay(&mut values, submitted);
            let page = form_page(&state, resource, Some(id), &values, &errors).await?;
            Ok(unprocessable(page))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete one record (orders are soft-deleted).
#[instrument(skip(state))]
pub(super) async fn destroy(
    resource: Resource,
    State(state): State<AppState>,
    id: i64,
) -> Result<Redirect, PageError> {
    match resource {
        Resource::Brands => state.catalog().delete_brand(BrandId::new(id)).await?,
        Resource::Categories => state.catalog().delete_category(CategoryId::new(id)).await?,
        Resource::Products => state.catalog().delete_product(ProductId::new(id)).await?,
        Resource::Customers => state.customers().delete(CustomerId::new(id)).await?,
        Resource::Orders => state.orders().delete(OrderId::new(id)).await?,
    }
    Ok(Redirect::to(&format!("/{}?notice=deleted", resource.slug())))
}

/// Delete the checked rows.
#[instrument(skip(state, pairs))]
pub(super) async fn bulk_delete(
    resource: Resource,
    State(state): State<AppState>,
    pairs: Pairs,
) -> Result<Redirect, PageError> {
    let ids = checked_ids(&pairs)?;
    let deleted = match resource {
        Resource::Brands => state.catalog().bulk_delete_brands(&typed(&ids)).await?,
        Resource::Categories => state.catalog().bulk_delete_categories(&typed(&ids)).await?,
        Resource::Products => state.catalog().bulk_delete_products(&typed(&ids)).await?,
        Resource::Customers => state.customers().bulk_delete(&typed(&ids)).await?,
        Resource::Orders => state.orders().bulk_delete(&typed(&ids)).await?,
    };
    tracing::debug!(%resource, deleted, "bulk delete from page");
    Ok(Redirect::to(&format!("/{}?notice=deleted", resource.slug())))
}

/// Restore a soft-deleted order.
#[instrument(skip(state))]
pub(super) async fn restore(State(state): State<AppState>, id: i64) -> Result<Redirect, PageError> {
    state.orders().restore(OrderId::new(id)).await?;
    Ok(Redirect::to(&format!("/orders/{id}?notice=restored")))
}

/// Delete an order permanently.
#[instrument(skip(state))]
pub(super) async fn force_delete(
    State(state): State<AppState>,
    id: i64,
) -> Result<Redirect, PageError> {
    state.orders().force_delete(OrderId::new(id)).await?;
    Ok(Redirect::to("/orders?notice=deleted"))
}

// =============================================================================
// Loading and saving
// =============================================================================

struct Listing {
    rows: Vec<RowView>,
    total: u64,
    page: u32,
    last_page: u32,
    summary: Option<String>,
}

async fn listing(
    state: &AppState,
    resource: Resource,
    params: &Params,
    columns: &[&TableColumn],
) -> Result<Listing, AppError> {
    let query = resource
        .schema()
        .list_query(params, state.config().per_page)?;
    let currency = state.config().currency;

    let mut summary = None;
    let page = match resource {
        Resource::Brands => state
            .catalog()
            .list_brands(&query)
            .await?
            .map(|r| view::row(&r, columns, currency)),
        Resource::Categories => state
            .catalog()
            .list_categories(&query)
            .await?
            .map(|r| view::row(&r, columns, currency)),
        Resource::Products => {
            let filter = crate::resources::products::filter(params)?;
            state
                .catalog()
                .list_products(&query, &filter)
                .await?
                .map(|r| view::row(&r, columns, currency))
        }
        Resource::Customers => state
            .customers()
            .list(&query)
            .await?
            .map(|r| view::row(&r, columns, currency)),
        Resource::Orders => {
            let list = state.orders().list(&query, &orders::filter(params)?).await?;
            summary = Some(currency.format(list.total_price_sum));
            list.page.map(|r| view::row(&r, columns, currency))
        }
    };

    Ok(Listing {
        last_page: page.last_page(),
        total: page.total,
        page: page.page,
        rows: page.items,
        summary,
    })
}

/// A stored record prepared for the detail and edit pages.
struct Loaded {
    title: String,
    values: Map<String, Value>,
    entries: Vec<DetailEntry>,
    order: Option<Order>,
}

impl Loaded {
    fn new<R: Record + Serialize>(
        schema: &ResourceSchema,
        record: &R,
        currency: CurrencyCode,
    ) -> Result<Self, AppError> {
        let values = match serde_json::to_value(record) {
            Ok(Value::Object(values)) => values,
            Ok(_) => Map::new(),
            Err(e) => return Err(AppError::Internal(format!("serialize record: {e}"))),
        };
        Ok(Self {
            title: record.title(),
            values,
            entries: view::details(schema, record, currency),
            order: None,
        })
    }
}

async fn load(state: &AppState, resource: Resource, id: i64) -> Result<Loaded, AppError> {
    let schema = resource.schema();
    let currency = state.config().currency;
    let loaded = match resource {
        Resource::Brands => {
            Loaded::new(schema, &state.catalog().get_brand(BrandId::new(id)).await?, currency)?
        }
        Resource::Categories => Loaded::new(
            schema,
            &state.catalog().get_category(CategoryId::new(id)).await?,
            currency,
        )?,
        Resource::Products => Loaded::new(
            schema,
            &state.catalog().get_product(ProductId::new(id)).await?,
            currency,
        )?,
        Resource::Customers => Loaded::new(
            schema,
            &state.customers().get(CustomerId::new(id)).await?,
            currency,
        )?,
        Resource::Orders => {
            let order = state.orders().get(OrderId::new(id)).await?;
            let mut loaded = Loaded::new(schema, &order, currency)?;
            loaded.order = Some(order);
            loaded
        }
    };
    Ok(loaded)
}

/// Validate and write submitted values, returning the record id.
async fn save(
    state: &AppState,
    resource: Resource,
    id: Option<i64>,
    submitted: &Value,
) -> Result<i64, AppError> {
    let form = &resource.schema().form;
    let saved = match resource {
        Resource::Brands => {
            let input: BrandInput = parse_input(form, submitted)?;
            let catalog = state.catalog();
            let record = match id {
                Some(id) => catalog.update_brand(BrandId::new(id), &input).await?,
                None => catalog.create_brand(&input).await?,
            };
            record.id.as_i64()
        }
        Resource::Categories => {
            let input: CategoryInput = parse_input(form, submitted)?;
            let catalog = state.catalog();
            let record = match id {
                Some(id) => catalog.update_category(CategoryId::new(id), &input).await?,
                None => catalog.create_category(&input).await?,
            };
            record.id.as_i64()
        }
        Resource::Products => {
            let input: ProductInput = parse_input(form, submitted)?;
            let catalog = state.catalog();
            let record = match id {
                Some(id) => catalog.update_product(ProductId::new(id), &input).await?,
                None => catalog.create_product(&input).await?,
            };
            record.id.as_i64()
        }
        Resource::Customers => {
            let input: CustomerInput = parse_input(form, submitted)?;
            let customers = state.customers();
            let record = match id {
                Some(id) => customers.update(CustomerId::new(id), &input).await?,
                None => customers.create(&input).await?,
            };
            record.id.as_i64()
        }
        Resource::Orders => {
            let input: OrderInput = parse_input(form, submitted)?;
            let orders = state.orders();
            let record = match id {
                Some(id) => orders.update(OrderId::new(id), &input).await?,
                None => orders.create(&input).await?,
            };
            record.id.as_i64()
        }
    };
    Ok(saved)
}

/// Options for every relationship select on the resource form.
async fn select_options(
    state: &AppState,
    schema: &ResourceSchema,
) -> Result<SelectOptions, AppError> {
    let mut sources: Vec<OptionSource> = Vec::new();
    for field in &schema.form.fields {
        for source in field
            .options
            .into_iter()
            .chain(field.fields.iter().filter_map(|f| f.options))
        {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
    }

    let mut options = SelectOptions::default();
    for source in sources {
        match source {
            OptionSource::Brands => options.brands = state.catalog().brand_options().await?,
            OptionSource::Categories => {
                options.categories = state.catalog().category_options().await?;
            }
            OptionSource::Products => options.products = state.catalog().product_options().await?,
            OptionSource::Customers => options.customers = state.customers().options().await?,
        }
    }
    Ok(options)
}

async fn form_page(
    state: &AppState,
    resource: Resource,
    id: Option<i64>,
    values: &Map<String, Value>,
    errors: &FieldErrors,
) -> Result<Html<String>, AppError> {
    let schema = resource.schema();
    let options = select_options(state, schema).await?;
    let fields = view::form_fields(schema, values, &options, errors);
    let slug = resource.slug();

    let (title, action, cancel) = match id {
        Some(id) => {
            let name = values
                .get(schema.title_column)
                .map(view::value_text)
                .unwrap_or_default();
            (
                format!("Edit {name}"),
                format!("/{slug}/{id}"),
                format!("/{slug}/{id}"),
            )
        }
        None => (
            format!("Create {}", schema.label),
            format!("/{slug}"),
            format!("/{slug}"),
        ),
    };

    let template = FormTemplate {
        nav: nav(Some(resource)),
        slug,
        title,
        action,
        cancel,
        fields,
        errors: loose_errors(schema, errors),
    };
    Ok(render(&template))
}

/// Messages whose key has no input on the page (`total_price`, `input`).
fn loose_errors(schema: &ResourceSchema, errors: &FieldErrors) -> Vec<String> {
    errors
        .iter()
        .filter(|(key, _)| {
            let root = key.split('.').next().unwrap_or_default();
            schema
                .form
                .field(root)
                .is_none_or(|f| f.read_only)
        })
        .flat_map(|(_, messages)| messages.iter().cloned())
        .collect()
}

/// Replace `values` with what the user submitted, key by key.
fn overlay(values: &mut Map<String, Value>, submitted: Value) {
    if let Value::Object(submitted) = submitted {
        values.extend(submitted);
    }
}

fn item_views(order: &Order, currency: CurrencyCode) -> Vec<ItemView> {
    order
        .items
        .iter()
        .map(|item| ItemView {
            product: item
                .product_name
                .clone()
                .unwrap_or_else(|| format!("#{}", item.product_id)),
            product_href: format!("/products/{}", item.product_id),
            quantity: item.quantity,
            unit_price: currency.format(item.unit_price),
            total: currency.format(item.line_total()),
        })
        .collect()
}

fn checked_ids(pairs: &Pairs) -> Result<Vec<i64>, AppError> {
    pairs
        .iter()
        .filter(|(key, _)| key == "ids[]" || key == "ids")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::BadRequest(format!("invalid id: {value}")))
        })
        .collect()
}

fn typed<T: From<i64>>(ids: &[i64]) -> Vec<T> {
    ids.iter().copied().map(T::from).collect()
}

// =============================================================================
// Table chrome
// =============================================================================

/// Link to the table with some query parameters replaced (`Some`) or
/// removed (`None`). The one-shot `notice` is always dropped.
fn link(slug: &str, params: &Params, overrides: &[(&str, Option<String>)]) -> String {
    let mut merged: BTreeMap<&str, &str> = params
        .iter()
        .filter(|(key, value)| key.as_str() != "notice" && !value.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    for (key, value) in overrides {
        match value {
            Some(value) => merged.insert(*key, value.as_str()),
            None => merged.remove(*key),
        };
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(merged)
        .finish();
    if query.is_empty() {
        format!("/{slug}")
    } else {
        format!("/{slug}?{query}")
    }
}

/// Parameters the search form must keep. It sets `q` and the filters
/// itself and starts again from the first page.
fn hidden_fields(schema: &ResourceSchema, params: &Params) -> Vec<HiddenField> {
    let mut fields: Vec<HiddenField> = params
        .iter()
        .filter(|(key, value)| {
            !matches!(key.as_str(), "q" | "page" | "notice")
                && !schema.filters.iter().any(|f| &f.key == *key)
                && !value.is_empty()
        })
        .map(|(name, value)| HiddenField {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    fields
}

fn headers(schema: &ResourceSchema, params: &Params, columns: &[&TableColumn]) -> Vec<HeaderView> {
    let current = params.get("sort").map(String::as_str);
    let descending = params.get("direction").map(String::as_str) == Some("desc");
    columns
        .iter()
        .map(|column| {
            let active = current == Some(column.key.as_str());
            let sorted = match (active, descending) {
                (false, _) => "",
                (true, false) => "asc",
                (true, true) => "desc",
            };
            let href = if column.sortable {
                let direction = if sorted == "asc" { "desc" } else { "asc" };
                link(
                    schema.resource.slug(),
                    params,
                    &[
                        ("sort", Some(column.key.clone())),
                        ("direction", Some(direction.to_string())),
                        ("page", None),
                    ],
                )
            } else {
                String::new()
            };
            HeaderView {
                label: column.label.clone(),
                href,
                sorted,
            }
        })
        .collect()
}

fn toggles(schema: &ResourceSchema, params: &Params, columns: &[&TableColumn]) -> Vec<ToggleView> {
    let shown: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
    schema
        .columns
        .iter()
        .filter(|c| c.toggleable)
        .map(|column| {
            let visible = shown.contains(&column.key.as_str());
            let keys: Vec<&str> = schema
                .columns
                .iter()
                .map(|c| c.key.as_str())
                .filter(|key| {
                    if *key == column.key {
                        !visible
                    } else {
                        shown.contains(key)
                    }
                })
                .collect();
            ToggleView {
                label: column.label.clone(),
                href: link(
                    schema.resource.slug(),
                    params,
                    &[("columns", Some(keys.join(",")))],
                ),
                visible,
            }
        })
        .collect()
}

async fn filters(
    state: &AppState,
    schema: &ResourceSchema,
    params: &Params,
) -> Result<Vec<FilterView>, AppError> {
    let mut views = Vec::with_capacity(schema.filters.len());
    for filter in &schema.filters {
        let current = params.get(&filter.key).map_or("", String::as_str);
        let mut choices: Vec<(String, String)> = filter
            .options
            .iter()
            .map(|o| (o.value.clone(), o.label.clone()))
            .collect();
        if filter.filter_type == FilterType::Select && choices.is_empty() && filter.key == "brand_id"
        {
            choices = state
                .catalog()
                .brand_options()
                .await?
                .into_iter()
                .map(|o| (o.id.to_string(), o.name))
                .collect();
        }
        let current = if filter.filter_type == FilterType::Trashed && current.is_empty() {
            "without"
        } else {
            current
        };
        if filter.filter_type != FilterType::Trashed {
            choices.insert(0, (String::new(), "All".to_string()));
        }
        views.push(FilterView {
            key: filter.key.clone(),
            label: filter.label.clone(),
            options: choices
                .into_iter()
                .map(|(value, label)| OptionView {
                    selected: value == current,
                    value,
                    label,
                })
                .collect(),
        });
    }
    Ok(views)
}
