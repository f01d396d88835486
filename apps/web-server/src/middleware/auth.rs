//! Session identity extractors.
//!
//! The session token is read from the `yatube_session` cookie, or from an
//! `Authorization: Bearer` header for non-browser clients.

use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use uuid::Uuid;

use yatube_core::ports::BaseRepository;
use yatube_shared::Viewer;

use crate::config::SESSION_COOKIE;
use crate::middleware::error::AppError;
use crate::state::AppState;

/// Authenticated user identity extractor.
///
/// Handlers taking an `Identity` redirect anonymous visitors to the login
/// page with `next` set to the requested path.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl Identity {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            id: self.user_id,
            username: self.username.clone(),
        }
    }
}

fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Resolve the session to a live account. `Ok(None)` means anonymous.
///
/// A session whose account no longer exists resolves to anonymous.
async fn authenticate(
    state: Option<web::Data<AppState>>,
    token: Option<String>,
) -> Result<Option<Identity>, AppError> {
    let Some(state) = state else {
        tracing::error!("AppState not found in app data");
        return Err(AppError::Internal("Server configuration error".to_string()));
    };
    let Some(token) = token else {
        return Ok(None);
    };

    let claims = match state.tokens.validate_token(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            return Ok(None);
        }
    };

    match state.users.find_by_id(claims.user_id).await? {
        Some(user) => Ok(Some(Identity {
            user_id: user.id,
            username: user.username,
        })),
        None => {
            tracing::debug!(user_id = %claims.user_id, "Session of a deleted account");
            Ok(None)
        }
    }
}

/// Path plus query string of the current request, the login return target.
pub fn requested_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string())
}

type ExtractFuture<T> = Pin<Box<dyn Future<Output = Result<T, AppError>>>>;

impl FromRequest for Identity {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = session_token(req);
        let next = requested_path(req);

        Box::pin(async move {
            match authenticate(state, token).await? {
                Some(identity) => Ok(identity),
                None => {
                    tracing::debug!(path = %next, "Login required");
                    Err(AppError::LoginRequired { next })
                }
            }
        })
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn viewer(&self) -> Option<Viewer> {
        self.0.as_ref().map(Identity::viewer)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = session_token(req);

        Box::pin(async move { Ok(OptionalIdentity(authenticate(state, token).await?)) })
    }
}
