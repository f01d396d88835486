//! Follow feed and follow/unfollow actions.

use actix_web::{HttpResponse, web};
use tera::Context;

use yatube_core::domain::{Follow, User};
use yatube_core::ports::{BaseRepository, PostFilter};

use super::{PageQuery, html, redirect};
use crate::config::FEED_POSTS_PER_PAGE;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::presenter::{self, profile_url};
use crate::state::AppState;

async fn load_author(state: &AppState, username: &str) -> AppResult<User> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {username}")))
}

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = presenter::post_page(
        &state,
        PostFilter::FollowedBy(identity.user_id),
        query.page.as_deref(),
        FEED_POSTS_PER_PAGE,
    )
    .await?;

    let mut context = Context::new();
    context.insert("page_obj", &page);
    let body = state
        .renderer
        .page("posts/follow.html", Some(&identity.viewer()), context)?;

    Ok(html(body))
}

/// GET|POST /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = load_author(&state, &path).await?;

    if Follow::is_allowed(identity.user_id, author.id) {
        let (follow, created) = state
            .follows
            .get_or_create(identity.user_id, author.id)
            .await?;
        if created {
            tracing::info!(follow_id = %follow.id, user = %identity.username, author = %author.username, "Followed author");
        }
    } else {
        tracing::debug!(user = %identity.username, "Ignored self-follow");
    }

    Ok(redirect(&profile_url(&author.username)))
}

/// GET|POST /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = load_author(&state, &path).await?;

    let follow = state
        .follows
        .find(identity.user_id, author.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("follow of {}", author.username)))?;
    state.follows.delete(follow.id).await?;

    tracing::info!(user = %identity.username, author = %author.username, "Unfollowed author");
    Ok(redirect(&profile_url(&author.username)))
}
