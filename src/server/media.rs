use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio_util::io::ReaderStream;

use crate::auth::{RequireStaff, RequireUser};
use crate::media::MediaStorageError;
use crate::server::AppState;
use crate::server::dto::UploadResponse;
use crate::server::response::{ApiError, ApiResponse};
use crate::service::media::{self, Upload};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const UPLOAD_FIELD: &str = "file";

pub fn media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads/avatar", post(upload_avatar))
        .route("/uploads/resource", post(upload_resource))
        .route("/assets/{id}/content", get(asset_content))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Reads the `file` field; other fields are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        return Ok(Upload {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }
    Err(ApiError::bad_request("File is required"))
}

async fn upload_avatar(
    RequireUser(auth): RequireUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let upload = read_upload(multipart).await?;
    let asset =
        media::save_avatar_upload(state.store.as_ref(), &state.media, upload, auth.id()).await?;
    Ok::<_, ApiError>(Json(ApiResponse::success(UploadResponse::from(&asset))))
}

async fn upload_resource(
    RequireStaff(auth): RequireStaff,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let upload = read_upload(multipart).await?;
    let asset =
        media::save_resource_upload(state.store.as_ref(), &state.media, upload, auth.id()).await?;
    Ok::<_, ApiError>(Json(ApiResponse::success(UploadResponse::from(&asset))))
}

/// Keeps header-safe ASCII only.
fn disposition_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn asset_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let asset = media::get_asset(state.store.as_ref(), &id)?;

    let (reader, size) = match state.media.open(asset.bucket, &asset.storage_key).await {
        Ok(result) => result,
        Err(MediaStorageError::NotFound) => {
            return Err(ApiError::not_found("File no longer exists"));
        }
        Err(e) => return Err(crate::error::Error::from(e).into()),
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, asset.content_type.as_str())
        .header(header::CONTENT_LENGTH, size)
        .header("X-Content-Type-Options", "nosniff");
    if let Some(filename) = &asset.filename {
        response = response.header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", disposition_filename(filename)),
        );
    }

    let body = Body::from_stream(ReaderStream::new(reader));
    Ok(response
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(disposition_filename("notes 1.pdf"), "notes 1.pdf");
        assert_eq!(disposition_filename("a\"b\\c.png"), "a_b_c.png");
        assert_eq!(disposition_filename("lecție.pdf"), "lec_ie.pdf");
    }
}
