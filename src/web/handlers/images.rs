//! Image delivery handler
//!
//! `GET /image/{directory}/{filename}` returns the JPEG rendition of
//! `<image_root>/<directory>/<filename>`, served from the cache when present.

use axum::{
    extract::{Path, State},
    response::Response,
};
use tracing::debug;

use crate::errors::AppResult;
use crate::web::{AppState, responses::jpeg_attachment};

pub async fn get_image(
    Path((directory, filename)): Path<(String, String)>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let image = state.image_service.serve(&directory, &filename).await?;

    debug!(
        directory = %directory,
        filename = %filename,
        origin = image.origin.as_str(),
        size = image.bytes.len(),
        "Serving image"
    );

    Ok(jpeg_attachment(image, &state.content_disposition))
}
