//! Store route handlers: listing, detail, create/edit, tags, top, map,
//! hearts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use savory_core::{Coordinates, StoreId};

use crate::db::{
    reviews::ReviewRepository,
    stores::{STORES_PER_PAGE, StoreInput, StoreRepository},
    users::UserRepository,
};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::auth::{OptionalAuth, RequireAuth};
use crate::models::{CurrentUser, ReviewWithAuthor, Store, TagCount, TopStore};
use crate::services::photos;
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for flash-style messages carried across redirects.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub info: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// A store plus its heart state for the current viewer.
pub struct StoreCard {
    pub store: Store,
    pub hearted: bool,
}

fn into_cards(stores: Vec<Store>, hearts: &[StoreId]) -> Vec<StoreCard> {
    stores
        .into_iter()
        .map(|store| StoreCard {
            hearted: hearts.contains(&store.id),
            store,
        })
        .collect()
}

/// Paginated store listing template.
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub title: String,
    pub stores: Vec<StoreCard>,
    pub page: i64,
    pub pages: i64,
    pub count: i64,
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub info: Option<String>,
}

/// Store detail template with reviews.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub store: Store,
    pub hearted: bool,
    pub reviews: Vec<ReviewWithAuthor>,
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// The fixed tag vocabulary offered as checkboxes on the store form.
pub const TAG_CHOICES: [&str; 5] = ["Wifi", "Open Late", "Family Friendly", "Vegetarian", "Licensed"];

/// One tag checkbox with its checked state.
pub struct TagChoice {
    pub name: &'static str,
    pub checked: bool,
}

fn tag_choices(store: Option<&Store>) -> Vec<TagChoice> {
    TAG_CHOICES
        .iter()
        .map(|&name| TagChoice {
            name,
            checked: store.is_some_and(|s| s.tags.iter().any(|t| t == name)),
        })
        .collect()
}

/// Add/edit store form template.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct EditStoreTemplate {
    pub title: String,
    pub store: Option<Store>,
    pub tag_choices: Vec<TagChoice>,
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
}

/// Tag listing template.
#[derive(Template, WebTemplate)]
#[template(path = "tag.html")]
pub struct TagTemplate {
    pub title: String,
    pub active_tag: Option<String>,
    pub tags: Vec<TagCount>,
    pub stores: Vec<StoreCard>,
    pub user: Option<CurrentUser>,
}

/// Top stores template.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub stores: Vec<TopStore>,
    pub user: Option<CurrentUser>,
}

/// Map page template.
#[derive(Template, WebTemplate)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub user: Option<CurrentUser>,
}

// =============================================================================
// Listing Routes
// =============================================================================

/// Display the first page of stores.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(msg): Query<MessageQuery>,
) -> Result<Response> {
    render_store_page(&state, user, 1, msg).await
}

/// Display a specific page of stores.
///
/// Asking for a page past the end redirects to the last page rather than
/// rendering an empty list.
pub async fn page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(page): Path<i64>,
    Query(msg): Query<MessageQuery>,
) -> Result<Response> {
    render_store_page(&state, user, page.max(1), msg).await
}

async fn render_store_page(
    state: &AppState,
    user: Option<CurrentUser>,
    page: i64,
    msg: MessageQuery,
) -> Result<Response> {
    let repo = StoreRepository::new(state.pool());
    let (stores, count) = repo.page(page).await?;

    let pages = page_count(count);
    if stores.is_empty() && page > pages {
        let info = format!(
            "Hey! You asked for page {page}. But that doesn't exist. So I put you on page {pages}"
        );
        let target = format!(
            "/stores/page/{pages}?info={}",
            urlencoding::encode(&info)
        );
        return Ok(Redirect::to(&target).into_response());
    }

    let hearts = hearts_for(state, user.as_ref()).await?;

    Ok(StoresTemplate {
        title: "Stores".to_owned(),
        stores: into_cards(stores, &hearts),
        page,
        pages,
        count,
        user,
        error: msg.error,
        success: msg.success,
        info: msg.info,
    }
    .into_response())
}

/// Display a single store with its reviews.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
    Query(msg): Query<MessageQuery>,
) -> Result<Response> {
    let store = StoreRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {slug}")))?;

    let reviews = ReviewRepository::new(state.pool()).for_store(store.id).await?;
    let hearts = hearts_for(&state, user.as_ref()).await?;

    Ok(StoreTemplate {
        hearted: hearts.contains(&store.id),
        store,
        reviews,
        user,
        error: msg.error,
        success: msg.success,
    }
    .into_response())
}

// =============================================================================
// Create / Edit Routes
// =============================================================================

/// Display the add-store form.
pub async fn add_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    EditStoreTemplate {
        title: "Add Store".to_owned(),
        store: None,
        tag_choices: tag_choices(None),
        user: Some(user),
        error: None,
    }
}

/// Handle the add-store form submission.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let input = parse_store_form(&state, multipart).await?;

    let store = StoreRepository::new(state.pool())
        .create(user.id, &input)
        .await?;

    let success = format!(
        "Successfully created {}. Care to leave a review?",
        store.name
    );
    let target = format!(
        "/store/{}?success={}",
        store.slug,
        urlencoding::encode(&success)
    );
    Ok(Redirect::to(&target).into_response())
}

/// Display the edit form for a store the user owns.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> Result<Response> {
    let store = StoreRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;

    if !store.is_owned_by(user.id) {
        return Err(AppError::Forbidden(
            "You must own a store in order to edit it!".to_owned(),
        ));
    }

    Ok(EditStoreTemplate {
        title: format!("Edit {}", store.name),
        tag_choices: tag_choices(Some(&store)),
        store: Some(store),
        user: Some(user),
        error: None,
    }
    .into_response())
}

/// Handle the edit-store form submission.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    multipart: Multipart,
) -> Result<Response> {
    let repo = StoreRepository::new(state.pool());

    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;
    if !existing.is_owned_by(user.id) {
        return Err(AppError::Forbidden(
            "You must own a store in order to edit it!".to_owned(),
        ));
    }

    let input = parse_store_form(&state, multipart).await?;
    let store = repo.update(id, &input).await?;

    let success = format!("Successfully updated {}", store.name);
    let target = format!(
        "/store/{}?success={}",
        store.slug,
        urlencoding::encode(&success)
    );
    Ok(Redirect::to(&target).into_response())
}

// =============================================================================
// Tags / Top / Map / Hearts
// =============================================================================

/// Display every tag and all tagged stores.
pub async fn tags_index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    render_tag_page(&state, user, None).await
}

/// Display stores carrying one tag.
pub async fn tags_show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(tag): Path<String>,
) -> Result<Response> {
    render_tag_page(&state, user, Some(tag)).await
}

async fn render_tag_page(
    state: &AppState,
    user: Option<CurrentUser>,
    tag: Option<String>,
) -> Result<Response> {
    let repo = StoreRepository::new(state.pool());

    // Both aggregations are independent reads; run them together.
    let (tags, stores) = tokio::try_join!(repo.tags_list(), repo.by_tag(tag.as_deref()))?;

    let hearts = hearts_for(state, user.as_ref()).await?;
    let title = tag.clone().unwrap_or_else(|| "Tags".to_owned());

    Ok(TagTemplate {
        title,
        active_tag: tag,
        tags,
        stores: into_cards(stores, &hearts),
        user,
    }
    .into_response())
}

/// Display the top-rated stores.
pub async fn top(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let stores = StoreRepository::new(state.pool()).top().await?;
    Ok(TopTemplate { stores, user }.into_response())
}

/// Display the map page. Pins are loaded client-side from the proximity API.
pub async fn map_page(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    MapTemplate { user }
}

/// Display the stores the user has hearted.
pub async fn hearts(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let stores = StoreRepository::new(state.pool())
        .hearted_by(user.id)
        .await?;
    let hearts: Vec<StoreId> = stores.iter().map(|s| s.id).collect();

    Ok(StoresTemplate {
        title: "Hearted Stores".to_owned(),
        count: stores.len() as i64,
        stores: into_cards(stores, &hearts),
        page: 1,
        pages: 1,
        user: Some(user),
        error: None,
        success: None,
        info: None,
    }
    .into_response())
}

// =============================================================================
// Helpers
// =============================================================================

/// Number of list pages needed for `count` stores, at least one.
fn page_count(count: i64) -> i64 {
    let pages = count / STORES_PER_PAGE + i64::from(count % STORES_PER_PAGE != 0);
    pages.max(1)
}

/// Current heart set for rendering, empty when nobody is logged in.
async fn hearts_for(
    state: &AppState,
    user: Option<&CurrentUser>,
) -> Result<Vec<StoreId>> {
    let Some(user) = user else {
        return Ok(Vec::new());
    };

    let full = UserRepository::new(state.pool()).get_by_id(user.id).await?;
    Ok(full.map(|u| u.hearts).unwrap_or_default())
}

/// Parse the store add/edit multipart form into a [`StoreInput`].
///
/// An uploaded photo is validated and resized here; its stored filename goes
/// into the input. A missing or empty photo field leaves `photo` as `None`.
async fn parse_store_form(state: &AppState, mut multipart: Multipart) -> Result<StoreInput> {
    let mut name = None;
    let mut description = String::new();
    let mut address = None;
    let mut lng = None;
    let mut lat = None;
    let mut tags = Vec::new();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid form: {e}")))?
    {
        let Some(field_name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };

        match field_name.as_str() {
            "name" => name = Some(read_text(field).await?),
            "description" => description = read_text(field).await?,
            "address" => address = Some(read_text(field).await?),
            "lng" => lng = Some(read_text(field).await?),
            "lat" => lat = Some(read_text(field).await?),
            "tags" => {
                let tag = read_text(field).await?;
                if !tag.is_empty() && !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            "photo" => {
                let content_type = field.content_type().map(ToOwned::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                if data.is_empty() {
                    continue;
                }
                let content_type = content_type.unwrap_or_default();
                let filename =
                    photos::process_upload(&state.config().uploads_dir, &content_type, &data)
                        .await?;
                photo = Some(filename);
            }
            _ => {}
        }
    }

    let name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("You must supply a store name".to_owned()))?;
    let address = address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("You must supply an address!".to_owned()))?;

    let lng = parse_coordinate(lng, "longitude")?;
    let lat = parse_coordinate(lat, "latitude")?;
    let coordinates = Coordinates::new(lng, lat)
        .map_err(|e| AppError::BadRequest(format!("invalid coordinates: {e}")))?;

    Ok(StoreInput {
        name,
        description,
        tags,
        coordinates,
        address,
        photo,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map(|s| s.trim().to_owned())
        .map_err(|e| AppError::BadRequest(format!("invalid form field: {e}")))
}

fn parse_coordinate(value: Option<String>, which: &str) -> Result<f64> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("You must supply {which}!")))?
        .parse::<f64>()
        .map_err(|_| AppError::BadRequest(format!("invalid {which}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(4), 1);
        assert_eq!(page_count(5), 2);
        assert_eq!(page_count(8), 2);
        assert_eq!(page_count(9), 3);
    }
}
