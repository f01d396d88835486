use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{App, test};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use yatube_core::domain::{Comment, Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, MediaStorage, PostFilter,
    PostRepository, TokenService, UserRepository,
};
use yatube_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryMediaStorage, InMemoryStore, JwtConfig,
    JwtTokenService, LocalMediaStorage,
};

use super::configure_app;
use crate::config::{AppConfig, FEED_POSTS_PER_PAGE, POSTS_PER_PAGE, SESSION_COOKIE};
use crate::forms::tests::png_bytes;
use crate::forms::{INVALID_CHOICE, INVALID_IMAGE, REQUIRED};
use crate::state::{AppState, Repositories};

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().configure(configure_app($state.clone()))).await
    };
}

struct Fixture {
    store: InMemoryStore,
    media: InMemoryMediaStorage,
    state: AppState,
}

fn state_with(repos: Repositories, media: Arc<dyn MediaStorage>) -> AppState {
    let passwords = Argon2PasswordService::with_params(8, 1, 1).unwrap();
    AppState::from_parts(
        AppConfig::default(),
        repos,
        Arc::new(InMemoryCache::new()),
        media,
        Arc::new(JwtTokenService::new(JwtConfig::default())),
        Arc::new(passwords),
    )
    .unwrap()
}

fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let media = InMemoryMediaStorage::new();
    let state = state_with(Repositories::in_memory(&store), Arc::new(media.clone()));

    Fixture {
        store,
        media,
        state,
    }
}

/// Post repository that reads normally but refuses every write.
struct ReadOnlyPosts(Arc<dyn PostRepository>);

#[async_trait]
impl BaseRepository<Post, Uuid> for ReadOnlyPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn save(&self, _post: Post) -> Result<Post, RepoError> {
        Err(RepoError::Query("read-only replica".to_string()))
    }

    async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
        Err(RepoError::Query("read-only replica".to_string()))
    }
}

#[async_trait]
impl PostRepository for ReadOnlyPosts {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        self.0.count(filter).await
    }

    async fn list(&self, filter: PostFilter, offset: u64, limit: u64) -> Result<Vec<Post>, RepoError> {
        self.0.list(filter, offset, limit).await
    }
}

impl Fixture {
    async fn user(&self, username: &str) -> User {
        self.store
            .users()
            .save(User::new(username.to_string(), "unused".to_string()))
            .await
            .unwrap()
    }

    async fn group(&self, slug: &str) -> Group {
        self.store
            .groups()
            .save(Group::new(
                format!("Group {slug}"),
                slug.to_string(),
                "Test group".to_string(),
            ))
            .await
            .unwrap()
    }

    /// A post `minutes_ago` old.
    async fn post(&self, author: &User, text: &str, minutes_ago: i64) -> Post {
        let mut post = Post::new(author.id, text.to_string(), None, None);
        post.created_at = Utc::now() - Duration::minutes(minutes_ago);
        self.store.posts().save(post).await.unwrap()
    }

    fn session(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        Cookie::new(SESSION_COOKIE, token)
    }

    async fn post_count(&self) -> u64 {
        self.store.posts().count(PostFilter::All).await.unwrap()
    }
}

fn location(resp: &actix_web::dev::ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_text(resp: actix_web::dev::ServiceResponse) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

fn card_count(html: &str) -> usize {
    html.matches("<article class=\"post\"").count()
}

const BOUNDARY: &str = "yatube-test-boundary";

/// A `multipart/form-data` body with text fields and an optional image part.
fn multipart(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(data) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"small.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

#[actix_web::test]
async fn test_protected_pages_redirect_to_login() {
    let fx = fixture();
    let author = fx.user("author").await;
    let post = fx.post(&author, "text", 0).await;
    let app = app!(fx.state);

    let edit = format!("/posts/{}/edit/", post.id);
    let comment = format!("/posts/{}/comment/", post.id);
    for path in ["/create/", edit.as_str(), "/follow/", comment.as_str(), "/profile/author/follow/"] {
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND, "{path}");
        assert_eq!(location(&resp), format!("/auth/login/?next={path}"));
    }
}

#[actix_web::test]
async fn test_unknown_objects_are_404() {
    let fx = fixture();
    let app = app!(fx.state);

    let missing_post = format!("/posts/{}/", Uuid::new_v4());
    for path in [
        "/group/unknown/",
        "/profile/nobody/",
        missing_post.as_str(),
        "/posts/not-a-uuid/",
        "/no/such/route/",
    ] {
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[actix_web::test]
async fn test_public_pages_render() {
    let fx = fixture();
    let author = fx.user("leo").await;
    let group = fx.group("cats").await;
    let mut post = Post::new(author.id, "Grouped post".to_string(), Some(group.id), None);
    post = fx.store.posts().save(post).await.unwrap();
    let app = app!(fx.state);

    let post_path = format!("/posts/{}/", post.id);
    for path in ["/", "/group/cats/", "/profile/leo/", post_path.as_str()] {
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body = body_text(resp).await;
        assert!(body.contains("Grouped post"), "{path}");
    }
}

#[actix_web::test]
async fn test_create_post() {
    let fx = fixture();
    let author = fx.user("writer").await;
    let group = fx.group("news").await;
    let group_id = group.id.to_string();
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&author))
        .set_form([("text", "Fresh post"), ("group", group_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/writer/");
    assert_eq!(fx.post_count().await, 1);

    let created = fx.store.posts().list(PostFilter::All, 0, 1).await.unwrap();
    assert_eq!(created[0].author_id, author.id);
    assert_eq!(created[0].text, "Fresh post");
    assert_eq!(created[0].group_id, Some(group.id));
}

#[actix_web::test]
async fn test_create_post_invalid_rerenders_form() {
    let fx = fixture();
    let author = fx.user("writer").await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&author))
        .set_form([("text", "   "), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(REQUIRED));
    assert_eq!(fx.post_count().await, 0);
}

#[actix_web::test]
async fn test_create_post_with_image() {
    let fx = fixture();
    let author = fx.user("painter").await;
    let app = app!(fx.state);

    let body = multipart(&[("text", "With a picture"), ("group", "")], Some(&png_bytes()));
    let req = multipart_request("/create/", body)
        .cookie(fx.session(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let posts = fx.store.posts().list(PostFilter::All, 0, 1).await.unwrap();
    let reference = posts[0].image.clone().unwrap();
    assert!(reference.starts_with("posts/"));
    assert!(reference.ends_with(".png"));
    assert_eq!(fx.media.open(&reference).await.unwrap(), png_bytes());

    let req = test::TestRequest::get()
        .uri(&format!("/media/{reference}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
}

#[actix_web::test]
async fn test_create_post_rejects_corrupt_image() {
    let fx = fixture();
    let author = fx.user("painter").await;
    let app = app!(fx.state);

    let body = multipart(&[("text", "Broken picture")], Some(b"not really a png"));
    let req = multipart_request("/create/", body)
        .cookie(fx.session(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(INVALID_IMAGE));
    assert_eq!(fx.post_count().await, 0);
    assert!(fx.media.is_empty().await);
}

#[actix_web::test]
async fn test_author_edits_post() {
    let fx = fixture();
    let author = fx.user("author").await;
    let group = fx.group("travel").await;
    let mut post = Post::new(author.id, "Original".to_string(), None, Some("posts/old.png".into()));
    post = fx.store.posts().save(post).await.unwrap();
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(fx.session(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Original"));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(fx.session(&author))
        .set_form([("text", "Edited"), ("group", group.id.to_string().as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    assert_eq!(fx.post_count().await, 1);

    let edited = fx.store.posts().find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Edited");
    assert_eq!(edited.group_id, Some(group.id));
    assert_eq!(edited.author_id, author.id);
    assert_eq!(edited.created_at, post.created_at);
    assert_eq!(edited.image.as_deref(), Some("posts/old.png"));
}

#[actix_web::test]
async fn test_edit_can_clear_image() {
    let fx = fixture();
    let author = fx.user("author").await;
    let mut post = Post::new(author.id, "Pictured".to_string(), None, Some("posts/old.png".into()));
    post = fx.store.posts().save(post).await.unwrap();
    let app = app!(fx.state);

    let body = multipart(&[("text", "No picture"), ("image-clear", "on")], None);
    let req = multipart_request(&format!("/posts/{}/edit/", post.id), body)
        .cookie(fx.session(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let edited = fx.store.posts().find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "No picture");
    assert_eq!(edited.image, None);
}

#[actix_web::test]
async fn test_non_author_edit_is_silently_redirected() {
    let fx = fixture();
    let author = fx.user("author").await;
    let intruder = fx.user("intruder").await;
    let post = fx.post(&author, "Untouchable", 0).await;
    let app = app!(fx.state);

    for req in [
        test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(fx.session(&intruder))
            .to_request(),
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(fx.session(&intruder))
            .set_form([("text", "Hijacked")])
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    }

    let unchanged = fx.store.posts().find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged, post);
}

#[actix_web::test]
async fn test_comments() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "Discuss", 0).await;
    let app = app!(fx.state);
    let uri = format!("/posts/{}/comment/", post.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(fx.session(&reader))
        .set_form([("text", "First!")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    // An empty comment is dropped but still lands on the post.
    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(fx.session(&reader))
        .set_form([("text", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let comments = fx.store.comments().list_for_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "First!");
    assert_eq!(comments[0].author_id, reader.id);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", Uuid::new_v4()))
        .cookie(fx.session(&reader))
        .set_form([("text", "Lost")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_comments_render_oldest_first() {
    let fx = fixture();
    let author = fx.user("author").await;
    let post = fx.post(&author, "Discuss", 10).await;
    let now = Utc::now();
    for (text, seconds_ago) in [("second comment", 10), ("first comment", 20), ("third comment", 0)] {
        let mut comment = Comment::new(post.id, author.id, text.to_string());
        comment.created_at = now - Duration::seconds(seconds_ago);
        fx.store.comments().save(comment).await.unwrap();
    }
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body = body_text(test::call_service(&app, req).await).await;

    let first = body.find("first comment").unwrap();
    let second = body.find("second comment").unwrap();
    let third = body.find("third comment").unwrap();
    assert!(first < second && second < third);
}

#[actix_web::test]
async fn test_listings_paginate_and_clamp() {
    let fx = fixture();
    let author = fx.user("prolific").await;
    for i in 0..13 {
        fx.post(&author, &format!("post number {i}"), i).await;
    }
    let app = app!(fx.state);

    for base in ["/", "/profile/prolific/"] {
        let cases = [
            ("", POSTS_PER_PAGE as usize),
            ("?page=2", 3),
            ("?page=99", 3),
            ("?page=0", 3),
            ("?page=abc", POSTS_PER_PAGE as usize),
        ];
        for (query, expected) in cases {
            let uri = format!("{base}{query}");
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            assert_eq!(card_count(&body_text(resp).await), expected, "{uri}");
        }
    }
}

#[actix_web::test]
async fn test_listings_are_newest_first() {
    let fx = fixture();
    let author = fx.user("author").await;
    fx.post(&author, "middle post", 5).await;
    fx.post(&author, "newest post", 1).await;
    fx.post(&author, "oldest post", 9).await;
    let app = app!(fx.state);

    let req = test::TestRequest::get().uri("/profile/author/").to_request();
    let body = body_text(test::call_service(&app, req).await).await;

    let newest = body.find("newest post").unwrap();
    let middle = body.find("middle post").unwrap();
    let oldest = body.find("oldest post").unwrap();
    assert!(newest < middle && middle < oldest);
}

#[actix_web::test]
async fn test_group_listing_only_shows_group_posts() {
    let fx = fixture();
    let author = fx.user("author").await;
    let cats = fx.group("cats").await;
    fx.group("dogs").await;
    let post = Post::new(author.id, "about cats".to_string(), Some(cats.id), None);
    fx.store.posts().save(post).await.unwrap();
    fx.post(&author, "ungrouped", 0).await;
    let app = app!(fx.state);

    let req = test::TestRequest::get().uri("/group/cats/").to_request();
    let body = body_text(test::call_service(&app, req).await).await;
    assert_eq!(card_count(&body), 1);
    assert!(body.contains("about cats"));

    let req = test::TestRequest::get().uri("/group/dogs/").to_request();
    let body = body_text(test::call_service(&app, req).await).await;
    assert_eq!(card_count(&body), 0);
}

#[actix_web::test]
async fn test_index_is_cached_until_cleared() {
    let fx = fixture();
    let author = fx.user("author").await;
    let doomed = fx.post(&author, "soon deleted", 0).await;
    let app = app!(fx.state);

    let req = test::TestRequest::get().uri("/").to_request();
    let before = body_text(test::call_service(&app, req).await).await;
    assert!(before.contains("soon deleted"));

    fx.store.posts().delete(doomed.id).await.unwrap();

    let req = test::TestRequest::get().uri("/").to_request();
    let cached = body_text(test::call_service(&app, req).await).await;
    assert_eq!(cached, before);

    fx.state.page_cache.clear().await.unwrap();

    let req = test::TestRequest::get().uri("/").to_request();
    let fresh = body_text(test::call_service(&app, req).await).await;
    assert!(!fresh.contains("soon deleted"));
}

#[actix_web::test]
async fn test_follow_is_idempotent_and_self_follow_ignored() {
    let fx = fixture();
    let reader = fx.user("reader").await;
    let author = fx.user("author").await;
    let app = app!(fx.state);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/profile/author/follow/")
            .cookie(fx.session(&reader))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/author/");
    }
    assert_eq!(fx.store.follows().count_followers(author.id).await.unwrap(), 1);

    let req = test::TestRequest::get()
        .uri("/profile/reader/follow/")
        .cookie(fx.session(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/reader/");
    assert_eq!(fx.store.follows().count_followers(reader.id).await.unwrap(), 0);

    let req = test::TestRequest::get()
        .uri("/profile/ghost/follow/")
        .cookie(fx.session(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_unfollow() {
    let fx = fixture();
    let reader = fx.user("reader").await;
    let author = fx.user("author").await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/profile/author/unfollow/")
        .cookie(fx.session(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    fx.store
        .follows()
        .get_or_create(reader.id, author.id)
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/profile/author/unfollow/")
        .cookie(fx.session(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author/");
    assert!(fx.store.follows().find(reader.id, author.id).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_follow_feed() {
    let fx = fixture();
    let reader = fx.user("reader").await;
    let followed = fx.user("followed").await;
    let stranger = fx.user("stranger").await;
    for i in 0..7 {
        fx.post(&followed, &format!("followed post {i}"), i).await;
    }
    fx.post(&stranger, "stranger post", 0).await;
    fx.store
        .follows()
        .get_or_create(reader.id, followed.id)
        .await
        .unwrap();
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(fx.session(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert_eq!(card_count(&body), FEED_POSTS_PER_PAGE as usize);
    assert!(!body.contains("stranger post"));

    let req = test::TestRequest::get()
        .uri("/follow/?page=2")
        .cookie(fx.session(&reader))
        .to_request();
    let body = body_text(test::call_service(&app, req).await).await;
    assert_eq!(card_count(&body), 2);

    // Someone following nobody sees an empty feed.
    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(fx.session(&stranger))
        .to_request();
    let body = body_text(test::call_service(&app, req).await).await;
    assert_eq!(card_count(&body), 0);
}

#[actix_web::test]
async fn test_profile_shows_follow_stats() {
    let fx = fixture();
    let author = fx.user("author").await;
    let fan = fx.user("fan").await;
    fx.post(&author, "hello", 0).await;
    fx.store.follows().get_or_create(fan.id, author.id).await.unwrap();
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/profile/author/")
        .cookie(fx.session(&fan))
        .to_request();
    let body = body_text(test::call_service(&app, req).await).await;

    assert!(body.contains("<span id=\"posts-count\">1</span>"));
    assert!(body.contains("<span id=\"followers-count\">1</span>"));
    assert!(body.contains("id=\"unfollow\""));

    let req = test::TestRequest::get()
        .uri("/profile/author/")
        .cookie(fx.session(&author))
        .to_request();
    let body = body_text(test::call_service(&app, req).await).await;
    assert!(!body.contains("id=\"follow\""));
    assert!(!body.contains("id=\"unfollow\""));
}

#[actix_web::test]
async fn test_bearer_token_is_accepted() {
    let fx = fixture();
    let user = fx.user("api").await;
    let token = fx.state.tokens.generate_token(user.id, &user.username).unwrap();
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/create/")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_signup_login_logout() {
    let fx = fixture();
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "newbie"), ("password", "long-enough")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(resp.response().cookies().any(|c| c.name() == SESSION_COOKIE));
    assert!(fx.store.users().find_by_username("newbie").await.unwrap().is_some());

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "newbie"), ("password", "short")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("already exists"));
    assert!(body.contains("too short"));

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "newbie"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Please enter a correct username and password"));

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([
            ("username", "newbie"),
            ("password", "long-enough"),
            ("next", "/follow/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/follow/");
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
        .unwrap();

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/auth/logout/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let removal = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    assert_eq!(removal.value(), "");
}

#[actix_web::test]
async fn test_health() {
    let fx = fixture();
    let app = app!(fx.state);

    let req = test::TestRequest::get().uri("/health/").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "memory");
}

#[actix_web::test]
async fn test_session_of_deleted_account_requires_login() {
    let fx = fixture();
    let ghost = fx.user("ghost").await;
    let session = fx.session(&ghost);
    fx.store.users().delete(ghost.id).await.unwrap();
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(session.clone())
        .set_form([("text", "hello")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
    assert_eq!(fx.post_count().await, 0);

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(session.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/follow/");

    let req = test::TestRequest::get().uri("/").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("/auth/login/"));
}

#[actix_web::test]
async fn test_author_invalid_edit_rerenders_form() {
    let fx = fixture();
    let author = fx.user("author").await;
    let post = fx.post(&author, "Original", 0).await;
    let app = app!(fx.state);
    let uri = format!("/posts/{}/edit/", post.id);
    let unknown_group = Uuid::new_v4().to_string();

    let cases = [
        ([("text", ""), ("group", "")], REQUIRED),
        ([("text", "Edited"), ("group", unknown_group.as_str())], INVALID_CHOICE),
    ];
    for (fields, message) in cases {
        let req = test::TestRequest::post()
            .uri(&uri)
            .cookie(fx.session(&author))
            .set_form(fields)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains(message));
    }

    let unchanged = fx.store.posts().find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged, post);
}

#[actix_web::test]
async fn test_edit_replaces_image() {
    let fx = fixture();
    let author = fx.user("author").await;
    let mut post = Post::new(author.id, "Pictured".to_string(), None, Some("posts/old.png".into()));
    post = fx.store.posts().save(post).await.unwrap();
    let app = app!(fx.state);

    let body = multipart(&[("text", "New picture")], Some(&png_bytes()));
    let req = multipart_request(&format!("/posts/{}/edit/", post.id), body)
        .cookie(fx.session(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let edited = fx.store.posts().find_by_id(post.id).await.unwrap().unwrap();
    let reference = edited.image.unwrap();
    assert_ne!(reference, "posts/old.png");
    assert!(reference.starts_with("posts/") && reference.ends_with(".png"));
    assert_eq!(fx.media.open(&reference).await.unwrap(), png_bytes());
    assert_eq!(edited.text, "New picture");
}

#[actix_web::test]
async fn test_unknown_post_is_404_for_logged_in_user() {
    let fx = fixture();
    let user = fx.user("reader").await;
    let app = app!(fx.state);
    let missing = Uuid::new_v4();

    for req in [
        test::TestRequest::get()
            .uri(&format!("/posts/{missing}/edit/"))
            .cookie(fx.session(&user))
            .to_request(),
        test::TestRequest::post()
            .uri(&format!("/posts/{missing}/edit/"))
            .cookie(fx.session(&user))
            .set_form([("text", "Edited")])
            .to_request(),
        test::TestRequest::post()
            .uri(&format!("/posts/{missing}/comment/"))
            .cookie(fx.session(&user))
            .set_form([("text", "Hello")])
            .to_request(),
        test::TestRequest::get()
            .uri("/posts/not-a-uuid/edit/")
            .cookie(fx.session(&user))
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

#[actix_web::test]
async fn test_paths_are_normalized_with_trailing_slash() {
    let fx = fixture();
    fx.group("cats").await;
    let reference = fx.media.store("posts", "png", &png_bytes()).await.unwrap();
    let app = test::init_service(
        App::new()
            .wrap(NormalizePath::new(TrailingSlash::Always))
            .configure(configure_app(fx.state.clone())),
    )
    .await;

    let req = test::TestRequest::get().uri("/group/cats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/media/{reference}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await.to_vec(), png_bytes());

    let req = test::TestRequest::get().uri("/media/posts/missing.png").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_media_on_disk_supports_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalMediaStorage::new(dir.path());
    let reference = storage.store("posts", "png", &png_bytes()).await.unwrap();
    let store = InMemoryStore::new();
    let state = state_with(Repositories::in_memory(&store), Arc::new(storage));
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri(&format!("/media/{reference}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert!(resp.headers().contains_key(header::ETAG));

    let req = test::TestRequest::get()
        .uri(&format!("/media/{reference}"))
        .insert_header((header::RANGE, "bytes=0-3"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(test::read_body(resp).await.to_vec(), png_bytes()[..4].to_vec());

    for path in ["/media/posts/missing.png", "/media/posts/"] {
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[actix_web::test]
async fn test_failed_save_removes_stored_upload() {
    let store = InMemoryStore::new();
    let media = InMemoryMediaStorage::new();
    let repos = Repositories {
        posts: Arc::new(ReadOnlyPosts(Arc::new(store.posts()))),
        ..Repositories::in_memory(&store)
    };
    let state = state_with(repos, Arc::new(media.clone()));
    let author = store
        .users()
        .save(User::new("painter".to_string(), "unused".to_string()))
        .await
        .unwrap();
    let token = state.tokens.generate_token(author.id, &author.username).unwrap();
    let app = app!(state);

    let body = multipart(&[("text", "Doomed picture")], Some(&png_bytes()));
    let req = multipart_request("/create/", body)
        .cookie(Cookie::new(SESSION_COOKIE, token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(media.is_empty().await);
}
