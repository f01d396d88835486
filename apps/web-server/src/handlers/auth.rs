//! Account handlers: signup, login and logout.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tera::Context;

use yatube_core::domain::{USERNAME_MAX_LEN, User};
use yatube_core::ports::{BaseRepository, TokenService};
use yatube_shared::{FormErrors, LoginRequest, SignupRequest};

use super::html;
use crate::config::SESSION_COOKIE;
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;

const BAD_CREDENTIALS: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const USERNAME_INVALID: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

fn session_cookie(tokens: &dyn TokenService, user: &User) -> AppResult<Cookie<'static>> {
    let token = tokens.generate_token(user.id, &user.username)?;
    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(tokens.expiration_seconds()))
        .finish())
}

fn signed_in(cookie: Cookie<'static>, location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, location))
        .cookie(cookie)
        .finish()
}

fn render_login(
    state: &AppState,
    identity: &OptionalIdentity,
    username: &str,
    next: Option<&str>,
    errors: FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("username", username);
    context.insert("next", &next);
    context.insert("errors", &errors);
    let body = state
        .renderer
        .page("auth/login.html", identity.viewer().as_ref(), context)?;
    Ok(html(body))
}

fn render_signup(
    state: &AppState,
    identity: &OptionalIdentity,
    username: &str,
    errors: FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("username", username);
    context.insert("errors", &errors);
    context.insert("min_password_len", &MIN_PASSWORD_LEN);
    let body = state
        .renderer
        .page("auth/signup.html", identity.viewer().as_ref(), context)?;
    Ok(html(body))
}

/// GET /auth/login/
pub async fn login_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    render_login(&state, &identity, "", query.next.as_deref(), FormErrors::new())
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
    form: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = form.into_inner();
    let next = req.next.as_deref().or(query.next.as_deref());
    let username = req.username.trim();

    let user = match state.users.find_by_username(username).await? {
        Some(user) if state.passwords.verify(&req.password, &user.password_hash)? => user,
        _ => {
            tracing::debug!(username = %username, "Rejected login");
            let mut errors = FormErrors::new();
            errors.add(FormErrors::NON_FIELD, BAD_CREDENTIALS);
            return render_login(&state, &identity, username, next, errors);
        }
    };

    let cookie = session_cookie(state.tokens.as_ref(), &user)?;
    tracing::info!(username = %user.username, "User logged in");
    Ok(signed_in(cookie, safe_next(next)))
}

/// GET /auth/signup/
pub async fn signup_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    render_signup(&state, &identity, "", FormErrors::new())
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    form: web::Form<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = form.into_inner();
    let username = req.username.trim();
    let mut errors = FormErrors::new();

    if username.is_empty() {
        errors.add("username", crate::forms::REQUIRED);
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_LEN} characters."),
        );
    } else if !User::is_valid_username(username) {
        errors.add("username", USERNAME_INVALID);
    } else if state.users.find_by_username(username).await?.is_some() {
        errors.add("username", USERNAME_TAKEN);
    }

    if req.password.is_empty() {
        errors.add("password", crate::forms::REQUIRED);
    } else if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!(
                "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
            ),
        );
    }

    if !errors.is_empty() {
        return render_signup(&state, &identity, username, errors);
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let user = state
        .users
        .save(User::new(username.to_string(), password_hash))
        .await?;

    let cookie = session_cookie(state.tokens.as_ref(), &user)?;
    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
    Ok(signed_in(cookie, "/"))
}

/// GET|POST /auth/logout/
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, "/"))
        .cookie(cookie)
        .finish()
}
