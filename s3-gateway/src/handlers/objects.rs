use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::QueryRejection,
        OriginalUri, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult, ErrorKind, BLANK_KEY_MESSAGE};
use crate::AppState;

/// Multipart field that carries the upload
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// A validated upload: derived key plus content
#[derive(Debug)]
struct Upload {
    key: String,
    data: Bytes,
}

/// Object key for an uploaded filename: spaces become underscores, nothing else changes.
pub fn object_key_for(filename: &str) -> String {
    filename.replace(' ', "_")
}

/// Handle `POST /s3/create`
pub async fn create_file(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, String)> {
    let path = uri.path();
    let multipart = multipart.map_err(|e| ApiError::from_rejection(e, path))?;
    let upload = read_upload(multipart, path).await?;

    tracing::info!("Received upload for key {} ({} bytes)", upload.key, upload.data.len());

    state
        .storage
        .put(&upload.key, upload.data)
        .await
        .map_err(|e| ApiError::from_storage(e, path))?;

    Ok((
        StatusCode::CREATED,
        format!("File uploaded with key: {}", upload.key),
    ))
}

/// Handle `PUT /s3/replace`
pub async fn replace_file(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, String)> {
    let path = uri.path();
    let multipart = multipart.map_err(|e| ApiError::from_rejection(e, path))?;
    let upload = read_upload(multipart, path).await?;

    state
        .storage
        .replace(&upload.key, upload.data)
        .await
        .map_err(|e| ApiError::from_storage(e, path))?;

    Ok((
        StatusCode::OK,
        format!("File replaced with key: {}", upload.key),
    ))
}

/// Handle `GET /s3/read?key=`
pub async fn read_file(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let path = uri.path();
    let Query(query) = query.map_err(|e| ApiError::from_query(e, path))?;
    let key = query.key.unwrap_or_default();
    if key.trim().is_empty() {
        return Err(ApiError::new(ErrorKind::InvalidArgument, BLANK_KEY_MESSAGE, path));
    }

    let data = state
        .storage
        .get(&key)
        .await
        .map_err(|e| ApiError::from_storage(e, path))?;

    let disposition = HeaderValue::try_from(attachment_disposition(&key)).map_err(|e| {
        tracing::error!("Cannot build Content-Disposition for {:?}: {}", key, e);
        ApiError::new(ErrorKind::Unexpected, "", path)
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

/// Handle `DELETE /s3/delete?key=`
///
/// Blank keys are left to the storage wrapper, which rejects them.
pub async fn delete_file(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> ApiResult<String> {
    let path = uri.path();
    let Query(query) = query.map_err(|e| ApiError::from_query(e, path))?;
    let key = query.key.unwrap_or_default();

    state
        .storage
        .delete(&key)
        .await
        .map_err(|e| ApiError::from_storage(e, path))?;

    Ok(format!("File deleted with key: {}", key))
}

/// Handle `GET /s3/info`
pub async fn storage_info(State(state): State<AppState>) -> String {
    state.storage.info()
}

/// Pull the `file` field out of the form and validate it.
async fn read_upload(mut multipart: Multipart, path: &str) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, path))?
    {
        if field.name() != Some(FILE_FIELD) {
            tracing::debug!("Skipping multipart field: {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_multipart(e, path))?;

        if filename.trim().is_empty() || data.is_empty() {
            tracing::warn!("Rejected upload: filename={:?}, size={}", filename, data.len());
            return Err(ApiError::invalid_file(path));
        }

        return Ok(Upload {
            key: object_key_for(&filename),
            data,
        });
    }

    Err(ApiError::invalid_file(path))
}

/// `attachment` with an ASCII `filename` fallback and the exact key in `filename*`.
///
/// Keys come from the bucket and may hold control or non-ASCII characters,
/// which are replaced by `_` in the fallback.
fn attachment_disposition(key: &str) -> String {
    let fallback: String = key
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    let escaped = fallback.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        escaped,
        urlencoding::encode(key)
    )
}
