//! Server-rendered admin pages.
//!
//! Every resource gets the same set of pages, driven by its schema: a table
//! with search, sorting, filters and bulk delete; a detail page; and a
//! create/edit form that re-renders with field messages when a save fails.

mod resource;
mod search;

use askama::Template;
use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::error::AppError;
use crate::resources::{ParamError, Resource};
use crate::routes::api::Params;
use crate::services::ServiceError;
use crate::state::AppState;

/// Submitted `application/x-www-form-urlencoded` pairs, in order.
type Pairs = Vec<(String, String)>;

/// Build the page router.
pub fn router() -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(home))
        .route("/search", get(search::index))
        .route(
            "/orders/{id}/restore",
            post(|state: State<AppState>, Path(id): Path<i64>| resource::restore(state, id)),
        )
        .route(
            "/orders/{id}/force-delete",
            post(|state: State<AppState>, Path(id): Path<i64>| resource::force_delete(state, id)),
        );

    for r in Resource::ALL {
        let base = format!("/{}", r.slug());
        router = router
            .route(
                &base,
                get(move |state: State<AppState>, Query(params): Query<Params>| {
                    resource::index(r, state, params)
                })
                .post(move |state: State<AppState>, Form(pairs): Form<Pairs>| {
                    resource::store(r, state, pairs)
                }),
            )
            .route(
                &format!("{base}/create"),
                get(move |state: State<AppState>| resource::create(r, state)),
            )
            .route(
                &format!("{base}/bulk-delete"),
                post(move |state: State<AppState>, Form(pairs): Form<Pairs>| {
                    resource::bulk_delete(r, state, pairs)
                }),
            )
            .route(
                &format!("{base}/{{id}}"),
                get(
                    move |state: State<AppState>,
                          Path(id): Path<i64>,
                          Query(params): Query<Params>| {
                        resource::show(r, state, id, params)
                    },
                )
                .post(
                    move |state: State<AppState>, Path(id): Path<i64>, Form(pairs): Form<Pairs>| {
                        resource::update(r, state, id, pairs)
                    },
                ),
            )
            .route(
                &format!("{base}/{{id}}/edit"),
                get(move |state: State<AppState>, Path(id): Path<i64>| {
                    resource::edit(r, state, id)
                }),
            )
            .route(
                &format!("{base}/{{id}}/delete"),
                post(move |state: State<AppState>, Path(id): Path<i64>| {
                    resource::destroy(r, state, id)
                }),
            );
    }
    router
}

async fn home() -> Redirect {
    Redirect::to(&format!("/{}", Resource::Products.slug()))
}

/// A navigation entry.
#[derive(Debug, Clone)]
pub struct NavLink {
    pub href: String,
    pub label: String,
    pub active: bool,
}

/// Sidebar links, one per resource.
fn nav(active: Option<Resource>) -> Vec<NavLink> {
    Resource::ALL
        .into_iter()
        .map(|r| NavLink {
            href: format!("/{}", r.slug()),
            label: r.schema().plural_label.to_string(),
            active: active == Some(r),
        })
        .collect()
}

/// Fixed texts for the `notice` query parameter set after a redirect.
fn notice(params: &Params) -> Option<String> {
    let text = match params.get("notice").map(String::as_str)? {
        "created" => "Created",
        "saved" => "Saved",
        "deleted" => "Deleted",
        "restored" => "Restored",
        _ => return None,
    };
    Some(text.to_string())
}

/// Render a template, falling back to a plain error body.
fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Vec<NavLink>,
    pub status: u16,
    pub title: String,
    pub message: String,
}

/// An [`AppError`] rendered as an HTML page.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<ServiceError> for PageError {
    fn from(err: ServiceError) -> Self {
        Self(err.into())
    }
}

impl From<ParamError> for PageError {
    fn from(err: ParamError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        self.0.report();
        let status = self.0.status();
        let template = ErrorTemplate {
            nav: nav(None),
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.0.public_message(),
        };
        (status, render(&template)).into_response()
    }
}

/// Response for a form that failed validation.
fn unprocessable(page: Html<String>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}
