//! Review route handlers.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use savory_core::{Rating, StoreId};

use crate::db::{reviews::ReviewRepository, stores::StoreRepository};
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::state::AppState;

/// Review form data. The rating radio group is optional.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub text: String,
    pub rating: Option<i16>,
}

/// Handle a review submission for store `{id}`.
///
/// Redirects back to the store page with a confirmation message.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(store_id): Path<StoreId>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let text = form.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest(
            "Your review must have some text".to_owned(),
        ));
    }

    let rating = form
        .rating
        .map(Rating::new)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let store = StoreRepository::new(state.pool())
        .get_by_id(store_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {store_id}")))?;

    ReviewRepository::new(state.pool())
        .add(user.id, store.id, text, rating)
        .await?;

    let target = format!(
        "/store/{}?success={}",
        store.slug,
        urlencoding::encode("Review saved!")
    );
    Ok(Redirect::to(&target).into_response())
}
