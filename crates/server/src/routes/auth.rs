//! Authentication route handlers.
//!
//! Handles login, registration, and logout against the local user store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub user: Option<CurrentUser>,
}

/// Register page template.
///
/// Failed submissions re-render with the message and the entered values so
/// the user does not retype everything.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub name: String,
    pub email: String,
    pub user: Option<CurrentUser>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error,
        success: query.success,
        user: None,
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            };

            if let Err(e) = set_current_user(&session, &current).await {
                tracing::error!("Failed to set session: {}", e);
                return Ok(Redirect::to("/login?error=session").into_response());
            }
            set_sentry_user(&user.id, Some(user.email.as_str()));

            let target = format!("/?success={}", urlencoding::encode("You are now logged in!"));
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            let target = format!(
                "/login?error={}",
                urlencoding::encode("Failed Login!")
            );
            Ok(Redirect::to(&target).into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        error: query.error,
        name: String::new(),
        email: String::new(),
        user: None,
    }
}

/// Handle registration form submission.
///
/// Validation failures re-render the form with a message; success logs the
/// new user in and lands them on the store list.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let registration = Registration {
        name: &form.name,
        email: &form.email,
        password: &form.password,
        password_confirm: &form.password_confirm,
    };

    match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            };

            if let Err(e) = set_current_user(&session, &current).await {
                tracing::error!("Failed to set session after registration: {}", e);
                return Ok(Redirect::to("/login?error=session").into_response());
            }
            set_sentry_user(&user.id, Some(user.email.as_str()));

            let target = format!(
                "/?success={}",
                urlencoding::encode("Welcome! Your account has been created.")
            );
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => {
            tracing::warn!("Registration failed: {}", e);
            Ok(RegisterTemplate {
                error: Some(registration_message(&e)),
                name: form.name,
                email: form.email,
                user: None,
            }
            .into_response())
        }
    }
}

/// User-facing message for a failed registration.
fn registration_message(e: &crate::services::auth::AuthError) -> String {
    use crate::services::auth::AuthError;
    match e {
        AuthError::UserAlreadyExists => "An account with this email already exists".to_owned(),
        AuthError::InvalidEmail(_) => "That Email is not valid!".to_owned(),
        AuthError::PasswordMismatch => "Oops! Your passwords do not match".to_owned(),
        AuthError::WeakPassword(msg) | AuthError::InvalidName(msg) => msg.clone(),
        _ => "Registration failed. Please try again.".to_owned(),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout: drop the session and the error-tracking user context.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    let target = format!(
        "/?success={}",
        urlencoding::encode("You are now logged out!")
    );
    Redirect::to(&target).into_response()
}
