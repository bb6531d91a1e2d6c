//! Global search page.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::Html,
};
use tracing::instrument;

use super::{NavLink, PageError, nav, render};
use crate::models::SearchHit;
use crate::routes::api::Params;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub nav: Vec<NavLink>,
    pub query: String,
    pub hits: Vec<SearchHit>,
}

/// Products matching `q` by name, slug or description.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Html<String>, PageError> {
    let query = params.get("q").map(|q| q.trim().to_string()).unwrap_or_default();
    let hits = state.catalog().search_products(&query).await?;
    Ok(render(&SearchTemplate {
        nav: nav(None),
        query,
        hits,
    }))
}
