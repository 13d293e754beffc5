use axum::extract::Multipart;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use super::dto::{ImageUpload, MovieForm};
use crate::error::ApiError;
use crate::state::AppState;

/// Drains the multipart body into a `MovieForm`. Unknown fields are ignored;
/// an empty `image` part (no file selected) counts as no upload.
pub async fn read_movie_form(multipart: &mut Multipart) -> Result<MovieForm, ApiError> {
    let mut form = MovieForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart payload: {e}")))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };

        if name == "image" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("failed to read image: {e}")))?;
            if !bytes.is_empty() {
                form.upload = Some(ImageUpload {
                    bytes,
                    content_type,
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read field {name}: {e}")))?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "director" => form.director = Some(value),
            "genre" => form.genre = Some(value),
            "year" => form.year = Some(value),
            "score" => form.score = Some(value),
            "review" => form.review = Some(value),
            "watched" => form.watched = Some(value),
            "imageUrl" => form.image_url = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

/// Image resolution for a new movie: an uploaded file wins; otherwise a
/// well-formed `imageUrl` is recorded verbatim; a malformed one rejects.
pub async fn resolve_new_image(
    state: &AppState,
    form: &MovieForm,
) -> Result<Option<String>, ApiError> {
    if let Some(upload) = &form.upload {
        return Ok(Some(store_upload(state, upload).await?));
    }
    match form.image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            Url::parse(url).map_err(|_| ApiError::InvalidImageUrl)?;
            Ok(Some(url.to_string()))
        }
        _ => Ok(None),
    }
}

/// Image replacement for an update:
/// - a new upload replaces the image and best-effort deletes the previous
///   locally-stored file (external URLs are never deleted);
/// - an explicit empty `imageUrl` clears the image;
/// - an absent `imageUrl` with no upload leaves the image untouched;
/// - a malformed non-empty `imageUrl` rejects.
pub async fn apply_image_update(
    state: &AppState,
    current: Option<&str>,
    form: &MovieForm,
) -> Result<Option<String>, ApiError> {
    if let Some(upload) = &form.upload {
        let stored = store_upload(state, upload).await?;
        if let Some(old) = current {
            if !old.starts_with("http") {
                let key = old.strip_prefix("uploads/").unwrap_or(old);
                if let Err(e) = state.storage.delete_object(key).await {
                    warn!(error = %e, path = old, "failed to remove replaced image");
                }
            }
        }
        return Ok(Some(stored));
    }

    match form.image_url.as_deref() {
        None => Ok(current.map(str::to_string)),
        Some("") => Ok(None),
        Some(url) => {
            Url::parse(url).map_err(|_| ApiError::InvalidImageUrl)?;
            Ok(Some(url.to_string()))
        }
    }
}

async fn store_upload(state: &AppState, upload: &ImageUpload) -> Result<String, ApiError> {
    let ext = ext_from_mime(&upload.content_type).unwrap_or("bin");
    let key = format!("image-{}.{}", Uuid::new_v4(), ext);
    state
        .storage
        .put_object(&key, upload.bytes.clone(), &upload.content_type)
        .await?;
    Ok(state.storage.public_url(&key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn form_with_url(url: Option<&str>) -> MovieForm {
        MovieForm {
            image_url: url.map(str::to_string),
            ..MovieForm::default()
        }
    }

    fn form_with_upload() -> MovieForm {
        MovieForm {
            upload: Some(ImageUpload {
                bytes: Bytes::from_static(b"fake image"),
                content_type: "image/png".into(),
            }),
            ..MovieForm::default()
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn new_image_prefers_the_upload() {
        let state = AppState::fake();
        let mut form = form_with_upload();
        form.image_url = Some("https://example.com/poster.jpg".into());

        let path = resolve_new_image(&state, &form).await.unwrap().unwrap();
        assert!(path.starts_with("uploads/image-"));
        assert!(path.ends_with(".png"));
    }

    #[tokio::test]
    async fn new_image_accepts_a_well_formed_url() {
        let state = AppState::fake();
        let form = form_with_url(Some("https://example.com/poster.jpg"));
        assert_eq!(
            resolve_new_image(&state, &form).await.unwrap(),
            Some("https://example.com/poster.jpg".to_string())
        );
    }

    #[tokio::test]
    async fn new_image_rejects_a_malformed_url() {
        let state = AppState::fake();
        let form = form_with_url(Some("not a url"));
        assert!(matches!(
            resolve_new_image(&state, &form).await,
            Err(ApiError::InvalidImageUrl)
        ));
    }

    #[tokio::test]
    async fn new_image_absent_or_blank_means_none() {
        let state = AppState::fake();
        assert_eq!(
            resolve_new_image(&state, &form_with_url(None)).await.unwrap(),
            None
        );
        assert_eq!(
            resolve_new_image(&state, &form_with_url(Some("  ")))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn update_absent_field_keeps_current_image() {
        let state = AppState::fake();
        let form = form_with_url(None);
        assert_eq!(
            apply_image_update(&state, Some("uploads/old.jpg"), &form)
                .await
                .unwrap(),
            Some("uploads/old.jpg".to_string())
        );
    }

    #[tokio::test]
    async fn update_empty_field_clears_the_image() {
        let state = AppState::fake();
        let form = form_with_url(Some(""));
        assert_eq!(
            apply_image_update(&state, Some("uploads/old.jpg"), &form)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn update_rejects_a_malformed_url() {
        let state = AppState::fake();
        let form = form_with_url(Some("nope"));
        assert!(matches!(
            apply_image_update(&state, None, &form).await,
            Err(ApiError::InvalidImageUrl)
        ));
    }

    #[tokio::test]
    async fn update_upload_replaces_the_image() {
        let state = AppState::fake();
        let form = form_with_upload();
        let path = apply_image_update(&state, Some("uploads/old.jpg"), &form)
            .await
            .unwrap()
            .unwrap();
        assert!(path.starts_with("uploads/image-"));
        assert_ne!(path, "uploads/old.jpg");
    }

    #[tokio::test]
    async fn update_upload_over_external_url_still_replaces() {
        let state = AppState::fake();
        let form = form_with_upload();
        let path = apply_image_update(&state, Some("https://example.com/a.jpg"), &form)
            .await
            .unwrap()
            .unwrap();
        assert!(path.starts_with("uploads/image-"));
    }
}
