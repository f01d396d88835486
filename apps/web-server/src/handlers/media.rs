//! Serves stored media files.

use std::io;
use std::path::Path;

use actix_files::NamedFile;
use actix_web::{HttpRequest, HttpResponse, web};

use yatube_core::ports::MediaError;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /media/{reference}
///
/// Files on disk go through `NamedFile` (ranges, ETag, Last-Modified);
/// other backends are read through the storage port.
pub async fn serve(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    // Path normalization appends a slash to every route.
    let reference = path.into_inner();
    let reference = reference.trim_end_matches('/');

    match state.media.local_path(reference) {
        Ok(Some(file_path)) => return serve_file(&req, reference, &file_path).await,
        Ok(None) => {}
        Err(e) => return Err(media_error(reference, e)),
    }

    let data = state
        .media
        .open(reference)
        .await
        .map_err(|e| media_error(reference, e))?;

    let content_type = image::guess_format(&data)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok(HttpResponse::Ok().content_type(content_type).body(data))
}

async fn serve_file(req: &HttpRequest, reference: &str, path: &Path) -> AppResult<HttpResponse> {
    let not_found = || AppError::not_found(format!("media {reference}"));

    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Err(not_found()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(MediaError::Io(e.to_string()).into()),
    }

    let file = NamedFile::open_async(path)
        .await
        .map_err(|e| AppError::from(MediaError::Io(e.to_string())))?;
    Ok(file.into_response(req))
}

fn media_error(reference: &str, err: MediaError) -> AppError {
    match err {
        MediaError::NotFound(_) | MediaError::InvalidReference(_) => {
            AppError::not_found(format!("media {reference}"))
        }
        e => e.into(),
    }
}
