//! HTTP handlers and route configuration.

mod auth;
mod follow;
mod health;
mod media;
mod posts;

#[cfg(test)]
mod tests;

use actix_multipart::form::MultipartFormConfig;
use actix_web::{HttpResponse, http::header, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::MAX_UPLOAD_BYTES;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// `?page=` on every listing. Kept raw so bad values fall back instead of failing.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Malformed ids name no post, so they are a 404 like unknown ones.
pub(crate) fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(format!("post {raw}")))
}

/// App data (state and body limits) plus the route table.
pub fn configure_app(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(state))
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .app_data(web::FormConfig::default().limit(MAX_UPLOAD_BYTES))
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(MAX_UPLOAD_BYTES)
                    .memory_limit(MAX_UPLOAD_BYTES),
            )
            .configure(configure_routes);
    }
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(follow::profile_follow))
                .route(web::post().to(follow::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(follow::profile_unfollow))
                .route(web::post().to(follow::profile_unfollow)),
        )
        .route("/follow/", web::get().to(follow::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .service(
            web::resource("/posts/{post_id}/comment/")
                .route(web::get().to(posts::add_comment))
                .route(web::post().to(posts::add_comment)),
        )
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                ),
        )
        .route("/media/{reference:.+}", web::get().to(media::serve))
        .route("/health/", web::get().to(health::health_check))
        .default_service(web::to(not_found));
}

async fn not_found() -> AppResult<HttpResponse> {
    Err(AppError::not_found("route"))
}
