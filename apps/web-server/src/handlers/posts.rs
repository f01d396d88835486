//! Post listings, detail page, post create/edit and comments.

use actix_multipart::form::MultipartForm;
use actix_web::{Either, HttpRequest, HttpResponse, web};
use tera::Context;
use uuid::Uuid;

use yatube_core::domain::{Comment, Post};
use yatube_core::ports::{BaseRepository, PostFilter};
use yatube_shared::{CommentFormData, FormErrors, PostFormData, PostFormView, ProfileView, Viewer};

use super::{PageQuery, html, parse_post_id, redirect};
use crate::config::{POST_IMAGE_DIR, POSTS_PER_PAGE};
use crate::forms::{CleanPost, ImageChange, PostForm, PostUpload, validate_comment};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::page_cache::PageCache;
use crate::presenter::{self, post_url, profile_url};
use crate::state::AppState;

/// Create/edit payload: url-encoded without an image, multipart with one.
type PostPayload = Either<web::Form<PostFormData>, MultipartForm<PostUpload>>;

fn into_post_form(payload: PostPayload) -> PostForm {
    match payload {
        Either::Left(form) => form.into_inner().into(),
        Either::Right(upload) => upload.into_inner().into(),
    }
}

/// GET /
///
/// The post list is cached whole for the configured TTL and rendered without
/// viewer data, so one cached copy serves every visitor.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let key = PageCache::key(req.path(), req.query_string());

    let content = match state.page_cache.get(&key).await {
        Some(content) => content,
        None => {
            let page = presenter::post_page(
                &state,
                PostFilter::All,
                query.page.as_deref(),
                POSTS_PER_PAGE,
            )
            .await?;

            let mut context = Context::new();
            context.insert("page_obj", &page);
            let content = state
                .renderer
                .fragment("posts/index_content.html", &context)?;
            state.page_cache.put(&key, &content).await;
            content
        }
    };

    let mut context = Context::new();
    context.insert("content", &content);
    let body = state
        .renderer
        .page("posts/index.html", identity.viewer().as_ref(), context)?;

    Ok(html(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found(format!("group {slug}")))?;

    let page = presenter::post_page(
        &state,
        PostFilter::Group(group.id),
        query.page.as_deref(),
        POSTS_PER_PAGE,
    )
    .await?;

    let mut context = Context::new();
    context.insert("group", &group);
    context.insert("page_obj", &page);
    let body = state
        .renderer
        .page("posts/group_list.html", identity.viewer().as_ref(), context)?;

    Ok(html(body))
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {username}")))?;

    let page = presenter::post_page(
        &state,
        PostFilter::Author(author.id),
        query.page.as_deref(),
        POSTS_PER_PAGE,
    )
    .await?;

    let following = match identity.user_id() {
        Some(viewer_id) if viewer_id != author.id => {
            state.follows.find(viewer_id, author.id).await?.is_some()
        }
        _ => false,
    };

    let profile = ProfileView {
        username: author.username.clone(),
        posts_count: page.count,
        followers_count: state.follows.count_followers(author.id).await?,
        following_count: state.follows.count_following(author.id).await?,
        following,
        is_self: identity.user_id() == Some(author.id),
    };

    let mut context = Context::new();
    context.insert("author", &profile);
    context.insert("page_obj", &page);
    let body = state
        .renderer
        .page("posts/profile.html", identity.viewer().as_ref(), context)?;

    Ok(html(body))
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let post = load_post(&state, post_id).await?;
    let author_posts = state.posts.count(PostFilter::Author(post.author_id)).await?;

    let comments = state.comments.list_for_post(post.id).await?;
    let comments = presenter::comment_views(&state, comments).await?;
    let card = presenter::post_card(&state, post).await?;

    let mut context = Context::new();
    context.insert("post", &card);
    context.insert("author_posts_count", &author_posts);
    context.insert("comments", &comments);
    context.insert("comment_form", &CommentFormData::default());
    context.insert("comment_errors", &FormErrors::new());
    context.insert("can_edit", &(identity.user_id() == Some(card.author_id)));
    let body = state
        .renderer
        .page("posts/post_detail.html", identity.viewer().as_ref(), context)?;

    Ok(html(body))
}

async fn load_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("post {post_id}")))
}

/// Render the create/edit form page.
async fn render_post_form(
    state: &AppState,
    viewer: &Viewer,
    form: &PostForm,
    errors: FormErrors,
    editing: Option<&Post>,
) -> AppResult<HttpResponse> {
    let selected = Uuid::parse_str(form.group.trim()).ok();
    let groups = presenter::group_choices(state, selected).await?;
    let current_image = editing
        .and_then(|post| post.image.as_deref())
        .map(|reference| state.config.media_url_for(reference));

    let view = PostFormView::new(form.text.clone(), groups)
        .with_errors(errors)
        .with_current_image(current_image);

    let mut context = Context::new();
    context.insert("errors", &view.errors);
    context.insert("form", &view);
    context.insert("is_edit", &editing.is_some());
    if let Some(post) = editing {
        context.insert("post_id", &post.id);
    }
    let body = state
        .renderer
        .page("posts/create_post.html", Some(viewer), context)?;

    Ok(html(body))
}

/// Image reference a post ends up with.
struct ImageOutcome {
    reference: Option<String>,
    /// Set when this request stored a new file.
    stored: Option<String>,
}

/// Persist a new image if one was uploaded.
async fn apply_image(
    state: &AppState,
    change: ImageChange,
    current: Option<String>,
) -> AppResult<ImageOutcome> {
    match change {
        ImageChange::Keep => Ok(ImageOutcome {
            reference: current,
            stored: None,
        }),
        ImageChange::Clear => Ok(ImageOutcome {
            reference: None,
            stored: None,
        }),
        ImageChange::Replace { data, extension } => {
            let reference = state.media.store(POST_IMAGE_DIR, extension, &data).await?;
            Ok(ImageOutcome {
                reference: Some(reference.clone()),
                stored: Some(reference),
            })
        }
    }
}

/// Save `post`; an upload stored for it is removed again if the row is not written.
async fn save_post(state: &AppState, post: Post, stored: Option<String>) -> AppResult<Post> {
    match state.posts.save(post).await {
        Ok(post) => Ok(post),
        Err(e) => {
            if let Some(reference) = stored {
                if let Err(cleanup) = state.media.delete(&reference).await {
                    tracing::warn!(
                        reference = %reference,
                        error = %cleanup,
                        "Failed to remove orphaned upload"
                    );
                }
            }
            Err(e.into())
        }
    }
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    render_post_form(
        &state,
        &identity.viewer(),
        &PostForm::default(),
        FormErrors::new(),
        None,
    )
    .await
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    identity: Identity,
    payload: PostPayload,
) -> AppResult<HttpResponse> {
    let form = into_post_form(payload);

    let CleanPost {
        text,
        group_id,
        image,
    } = match form.validate(state.groups.as_ref()).await? {
        Ok(clean) => clean,
        Err(errors) => {
            return render_post_form(&state, &identity.viewer(), &form, errors, None).await;
        }
    };

    let image = apply_image(&state, image, None).await?;
    let post = save_post(
        &state,
        Post::new(identity.user_id, text, group_id, image.reference),
        image.stored,
    )
    .await?;

    tracing::info!(post_id = %post.id, author = %identity.username, "Post created");
    Ok(redirect(&profile_url(&identity.username)))
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, parse_post_id(&path)?).await?;
    if !post.is_authored_by(identity.user_id) {
        return Ok(deny_edit(&post, &identity));
    }

    let form = PostForm {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
        ..PostForm::default()
    };
    render_post_form(&state, &identity.viewer(), &form, FormErrors::new(), Some(&post)).await
}

/// Non-authors are sent back to the post without any change.
fn deny_edit(post: &Post, identity: &Identity) -> HttpResponse {
    tracing::warn!(
        post_id = %post.id,
        user = %identity.username,
        "Edit attempt by non-author"
    );
    redirect(&post_url(post.id))
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    payload: PostPayload,
) -> AppResult<HttpResponse> {
    let mut post = load_post(&state, parse_post_id(&path)?).await?;
    if !post.is_authored_by(identity.user_id) {
        return Ok(deny_edit(&post, &identity));
    }

    let form = into_post_form(payload);
    let clean = match form.validate(state.groups.as_ref()).await? {
        Ok(clean) => clean,
        Err(errors) => {
            return render_post_form(&state, &identity.viewer(), &form, errors, Some(&post))
                .await;
        }
    };

    post.text = clean.text;
    post.group_id = clean.group_id;
    let image = apply_image(&state, clean.image, post.image.take()).await?;
    post.image = image.reference;
    let post = save_post(&state, post, image.stored).await?;

    tracing::info!(post_id = %post.id, "Post updated");
    Ok(redirect(&post_url(post.id)))
}

/// GET|POST /posts/{post_id}/comment/
///
/// Always ends on the post page; an invalid comment is simply not saved.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    form: Option<web::Form<CommentFormData>>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, parse_post_id(&path)?).await?;

    let submitted = form.map(web::Form::into_inner).unwrap_or_default();
    match validate_comment(&submitted) {
        Ok(text) => {
            let comment = state
                .comments
                .save(Comment::new(post.id, identity.user_id, text))
                .await?;
            tracing::info!(comment_id = %comment.id, post_id = %post.id, "Comment added");
        }
        Err(_) => {
            tracing::debug!(post_id = %post.id, "Discarded empty comment");
        }
    }

    Ok(redirect(&post_url(post.id)))
}
