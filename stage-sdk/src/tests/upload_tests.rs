//! Multipart parsing through an in-memory router.

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::{DefaultBodyLimit, Multipart};
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::server::StageRejection;
    use crate::testing::{multipart_body, multipart_content_type, png_bytes};
    use crate::upload::{ensure_allowed_type, ImageForm};

    async fn echo_upload(multipart: Multipart) -> Result<Json<Value>, StageRejection> {
        let mut form = ImageForm::read(multipart).await?;
        let image = form.take_image()?;
        ensure_allowed_type(&image)?;
        Ok(Json(json!({
            "filename": image.filename(),
            "content_type": image.content_type(),
            "len": image.len(),
            "image_type": form.text("image_type"),
        })))
    }

    fn app() -> Router {
        Router::new().route("/upload", post(echo_upload))
    }

    async fn send(body: Vec<u8>) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(header::CONTENT_TYPE, multipart_content_type())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_reads_image_and_fields() {
        let png = png_bytes();
        let (status, body) = send(multipart_body(
            Some(("scan.png", "image/png", &png)),
            &[("image_type", " X-ray ")],
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "scan.png");
        assert_eq!(body["content_type"], "image/png");
        assert_eq!(body["len"], png.len());
        assert_eq!(body["image_type"], "X-ray");
    }

    #[tokio::test]
    async fn test_missing_image_is_rejected() {
        let (status, body) = send(multipart_body(None, &[("image_type", "CT")])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image provided");
    }

    #[tokio::test]
    async fn test_empty_filename_is_rejected() {
        let png = png_bytes();
        let (status, body) = send(multipart_body(Some(("", "image/png", &png)), &[])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No selected file");
    }

    #[tokio::test]
    async fn test_disallowed_extension_is_rejected() {
        let (status, body) = send(multipart_body(
            Some(("notes.txt", "text/plain", b"hello")),
            &[],
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid file type");
    }

    #[tokio::test]
    async fn test_body_over_limit_is_too_large() {
        let response = app()
            .layer(DefaultBodyLimit::max(256))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(header::CONTENT_TYPE, multipart_content_type())
                    .body(Body::from(multipart_body(
                        Some(("scan.png", "image/png", &vec![0u8; 4096])),
                        &[],
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Upload exceeds the size limit");
        assert_eq!(body["kind"], "BadPayload");
    }

    #[tokio::test]
    async fn test_rejection_carries_bad_payload_kind() {
        let (_, body) = send(multipart_body(None, &[])).await;
        assert_eq!(body["kind"], "BadPayload");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_malformed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // axum rejects the extractor itself before the handler runs
        assert!(response.status().is_client_error());
    }
}
