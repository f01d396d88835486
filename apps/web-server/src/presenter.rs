//! Builds template view models from domain entities.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use yatube_core::domain::{Comment, Group, Post, User};
use yatube_core::ports::PostFilter;
use yatube_core::{Page, PageWindow};
use yatube_shared::{CommentView, GroupChoice, GroupLink, PostCard};

use crate::middleware::error::AppResult;
use crate::state::AppState;

pub fn display_time(at: DateTime<Utc>) -> String {
    at.format("%d %b %Y %H:%M").to_string()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_url(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

fn unique_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn usernames(state: &AppState, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, String>> {
    let users: Vec<User> = state.users.find_by_ids(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

/// Cards for a batch of posts, two lookups regardless of batch size.
pub async fn post_cards(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostCard>> {
    let authors = usernames(state, unique_ids(posts.iter().map(|p| p.author_id))).await?;
    let group_ids = unique_ids(posts.iter().filter_map(|p| p.group_id));
    let groups: HashMap<Uuid, Group> = state
        .groups
        .find_by_ids(&group_ids)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    Ok(posts
        .into_iter()
        .map(|post| {
            let group = post.group_id.and_then(|id| groups.get(&id)).map(|g| GroupLink {
                title: g.title.clone(),
                slug: g.slug.clone(),
            });
            PostCard {
                id: post.id,
                excerpt: post.excerpt(),
                created_at: display_time(post.created_at),
                author_id: post.author_id,
                author_username: authors.get(&post.author_id).cloned().unwrap_or_default(),
                group,
                image_url: post.image.as_deref().map(|r| state.config.media_url_for(r)),
                text: post.text,
            }
        })
        .collect())
}

pub async fn post_card(state: &AppState, post: Post) -> AppResult<PostCard> {
    let mut cards = post_cards(state, vec![post]).await?;
    cards
        .pop()
        .ok_or_else(|| crate::middleware::error::AppError::Internal("empty card batch".into()))
}

pub async fn comment_views(state: &AppState, comments: Vec<Comment>) -> AppResult<Vec<CommentView>> {
    let authors = usernames(state, unique_ids(comments.iter().map(|c| c.author_id))).await?;

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            id: comment.id,
            author_username: authors.get(&comment.author_id).cloned().unwrap_or_default(),
            created_at: display_time(comment.created_at),
            text: comment.text,
        })
        .collect())
}

/// One page of post cards for `filter`.
pub async fn post_page(
    state: &AppState,
    filter: PostFilter,
    raw_page: Option<&str>,
    per_page: u64,
) -> AppResult<Page<PostCard>> {
    let count = state.posts.count(filter).await?;
    let window = PageWindow::locate(raw_page, count, per_page);
    let posts = state
        .posts
        .list(filter, window.offset(), window.limit())
        .await?;

    Ok(Page::new(post_cards(state, posts).await?, window))
}

pub async fn group_choices(state: &AppState, selected: Option<Uuid>) -> AppResult<Vec<GroupChoice>> {
    Ok(state
        .groups
        .list_all()
        .await?
        .into_iter()
        .map(|g| GroupChoice {
            selected: Some(g.id) == selected,
            id: g.id,
            title: g.title,
        })
        .collect())
}
