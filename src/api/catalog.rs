//! Public storefront catalog.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::domain::aggregates::Category;
use crate::error::Result;
use crate::services::catalog::{self, ListParams, PaginatedResponse, ProductView};
use crate::state::AppState;

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<ProductView>>> {
    Ok(Json(catalog::list(&s, p).await?))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProductView>> {
    Ok(Json(catalog::visible_product(&s, id).await?))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    let mut categories = catalog::listed_categories(&s).await?;
    categories.sort_by_cached_key(|c| c.name().to_lowercase());
    Ok(Json(categories))
}
