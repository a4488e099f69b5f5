//! HTTP route handlers for the store directory.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Store list (page 1)
//! GET  /health                 - Health check
//!
//! # Stores
//! GET  /stores                 - Store list (page 1)
//! GET  /stores/page/{page}     - Paginated store list
//! GET  /add                    - Add store form (auth)
//! POST /add                    - Create store (auth, multipart)
//! POST /add/{id}               - Update store (auth, multipart)
//! GET  /stores/{id}/edit       - Edit store form (owner only)
//! GET  /store/{slug}           - Store detail with reviews
//! GET  /tags                   - Tag listing with all tagged stores
//! GET  /tags/{tag}             - Stores filtered by tag
//! GET  /top                    - Top-rated stores
//! GET  /map                    - Map page
//! GET  /hearts                 - Hearted stores (auth)
//!
//! # Reviews
//! POST /reviews/{id}           - Add a review to store {id} (auth)
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! GET  /logout                 - Logout action
//!
//! # Account (requires auth except reset)
//! GET  /account                - Account page
//! POST /account                - Update profile
//! GET  /account/forgot         - Forgot password page
//! POST /account/forgot         - Request a reset email
//! GET  /account/reset/{token}  - Reset form (token checked)
//! POST /account/reset/{token}  - Perform the reset
//!
//! # JSON API
//! GET  /api/search?q=          - Top-5 text matches
//! GET  /api/stores/near?lng=&lat= - Stores within 10 km
//! POST /api/stores/{id}/heart  - Toggle a heart (auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod reviews;
pub mod stores;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/stores/page/{page}", get(stores::page))
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(stores::tags_index))
        .route("/tags/{tag}", get(stores::tags_show))
        .route("/top", get(stores::top))
        .route("/map", get(stores::map_page))
        .route("/hearts", get(stores::hearts))
        .route("/reviews/{id}", post(reviews::create))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index).post(account::update))
        .route("/forgot", get(account::forgot_page).post(account::forgot))
        .route(
            "/reset/{token}",
            get(account::reset_page).post(account::reset),
        )
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/stores/near", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(store_routes())
        .merge(auth_routes())
        .nest("/account", account_routes())
        .nest("/api", api_routes())
}
