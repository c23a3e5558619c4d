use axum::extract::multipart::Field;

use crate::api::errors::ApiError;

/// Drain a multipart field into memory, failing once the cap is exceeded
/// instead of buffering an arbitrarily large upload.
pub(crate) async fn read_field_capped(
    field: &mut Field<'_>,
    cap: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Malformed multipart body: {err}")))?
    {
        if buffer.len() + chunk.len() > cap {
            return Err(ApiError::BadRequest("Uploaded file exceeds the size limit".to_string()));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

pub(crate) fn content_type_for(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "csv" => "text/csv",
        "txt" => "text/plain; charset=utf-8",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
