//! Account route handlers: profile updates and the password reset flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, Result, set_sentry_user};
use crate::filters;
use crate::middleware::auth::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Account update form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
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

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub account: User,
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub token: String,
    pub error: Option<String>,
    pub user: Option<CurrentUser>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub user: Option<CurrentUser>,
}

// =============================================================================
// Account Routes
// =============================================================================

/// Display the account page.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let account = crate::db::users::UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_owned()))?;

    Ok(AccountTemplate {
        account,
        user: Some(user),
        error: query.error,
        success: query.success,
    }
    .into_response())
}

/// Handle the account update form submission.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .update_account(user.id, &form.name, &form.email)
        .await
    {
        Ok(updated) => {
            // Keep the session identity in sync with the new name/email.
            let current = CurrentUser {
                id: updated.id,
                email: updated.email.clone(),
                name: updated.name.clone(),
            };
            if let Err(e) = set_current_user(&session, &current).await {
                tracing::error!("Failed to refresh session after account update: {}", e);
            }

            let target = format!(
                "/account?success={}",
                urlencoding::encode("Updated the profile!")
            );
            Ok(Redirect::to(&target).into_response())
        }
        Err(e @ (AuthError::UserAlreadyExists
        | AuthError::InvalidEmail(_)
        | AuthError::InvalidName(_))) => {
            let target = format!(
                "/account?error={}",
                urlencoding::encode(&account_error_message(&e))
            );
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn account_error_message(e: &AuthError) -> String {
    match e {
        AuthError::UserAlreadyExists => "An account with this email already exists".to_owned(),
        AuthError::InvalidEmail(_) => "That Email is not valid!".to_owned(),
        AuthError::InvalidName(msg) => msg.clone(),
        _ => "Could not update the profile".to_owned(),
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: query.error,
        success: query.success,
        user: None,
    }
}

/// Handle the forgot password form submission.
///
/// Always answers with the same message whether or not the email is
/// registered, to prevent account enumeration.
pub async fn forgot(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response> {
    if let Some((user, token)) = AuthService::new(state.pool())
        .start_password_reset(&form.email)
        .await?
    {
        let reset_url = format!(
            "{}/account/reset/{}",
            state.config().base_url.trim_end_matches('/'),
            token
        );

        match state.mailer() {
            Some(mailer) => {
                mailer
                    .send_password_reset(user.email.as_str(), &reset_url)
                    .await?;
            }
            None => {
                // No SMTP configured; surface the link in the logs so local
                // development still works end to end.
                tracing::info!(email = %user.email, url = %reset_url, "Password reset link");
            }
        }
    }

    let target = format!(
        "/login?success={}",
        urlencoding::encode("You have been emailed a password reset link.")
    );
    Ok(Redirect::to(&target).into_response())
}

/// Display the reset form, provided the token is live.
pub async fn reset_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .user_for_reset_token(&token)
        .await
    {
        Ok(_) => Ok(ResetPasswordTemplate {
            token,
            error: query.error,
            user: None,
        }
        .into_response()),
        Err(AuthError::InvalidResetToken) => Ok(invalid_token_redirect()),
        Err(e) => Err(e.into()),
    }
}

/// Handle the reset form submission: set the new password and log in.
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let service = AuthService::new(state.pool());

    match service
        .reset_password(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            };
            if let Err(e) = set_current_user(&session, &current).await {
                tracing::error!("Failed to set session after password reset: {}", e);
                return Ok(Redirect::to("/login?error=session").into_response());
            }
            set_sentry_user(&user.id, Some(user.email.as_str()));

            let target = format!(
                "/?success={}",
                urlencoding::encode("Nice! Your password has been reset! You are now logged in.")
            );
            Ok(Redirect::to(&target).into_response())
        }
        Err(AuthError::InvalidResetToken) => Ok(invalid_token_redirect()),
        Err(e @ (AuthError::WeakPassword(_) | AuthError::PasswordMismatch)) => {
            let message = match &e {
                AuthError::WeakPassword(msg) => msg.clone(),
                _ => "Oops! Your passwords do not match".to_owned(),
            };
            let target = format!(
                "/account/reset/{}?error={}",
                token,
                urlencoding::encode(&message)
            );
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn invalid_token_redirect() -> Response {
    let target = format!(
        "/login?error={}",
        urlencoding::encode("Password reset is invalid or has expired")
    );
    Redirect::to(&target).into_response()
}
