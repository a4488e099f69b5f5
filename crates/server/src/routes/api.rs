//! JSON API route handlers: search, proximity, heart toggle.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use savory_core::{Coordinates, StoreId};

use crate::db::{stores::StoreRepository, users::UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::models::{Store, StorePin, User};
use crate::state::AppState;

/// Query parameters for text search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Query parameters for the proximity lookup.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: f64,
    pub lat: f64,
}

/// `GET /api/search?q=` - top 5 stores matching the query, by relevance.
///
/// An empty query returns an empty list rather than an error.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Store>>> {
    let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(Json(Vec::new()));
    };

    let stores = StoreRepository::new(state.pool()).search(q).await?;
    Ok(Json(stores))
}

/// `GET /api/stores/near?lng=&lat=` - up to 10 stores within 10 km.
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<StorePin>>> {
    let origin = Coordinates::new(query.lng, query.lat)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let pins = StoreRepository::new(state.pool()).near(origin).await?;
    Ok(Json(pins))
}

/// `POST /api/stores/{id}/heart` - toggle a heart, returning the updated
/// user with their heart list.
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(store_id): Path<StoreId>,
) -> Result<Json<User>> {
    let updated = UserRepository::new(state.pool())
        .toggle_heart(user.id, store_id)
        .await?;
    Ok(Json(updated))
}
