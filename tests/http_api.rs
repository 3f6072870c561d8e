//! Handler-level tests running the service routes against temp directories

use std::io::Cursor;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use image::{DynamicImage, ImageBuffer, Rgb};
use tempfile::TempDir;

use rendition_service::config::{AppConfig, Config, LimitsConfig, StorageConfig};
use rendition_service::handlers;
use rendition_service::services::{BatchProcessor, ImageRsCodec};
use rendition_service::storage::{FsStore, OutputStore};
use rendition_service::AppError;

const BOUNDARY: &str = "----rendition-test-boundary";

struct TestContext {
    _uploads: TempDir,
    _outputs: TempDir,
    config: Config,
    store: Arc<dyn OutputStore>,
    processor: BatchProcessor,
}

fn test_context() -> TestContext {
    let uploads = TempDir::new().unwrap();
    let outputs = TempDir::new().unwrap();
    let config = Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            env: "test".to_string(),
        },
        storage: StorageConfig {
            upload_dir: uploads.path().to_path_buf(),
            output_dir: outputs.path().to_path_buf(),
        },
        limits: LimitsConfig {
            max_batch_size: 10,
            max_file_bytes: 20 * 1024 * 1024,
        },
    };
    let store: Arc<dyn OutputStore> = Arc::new(FsStore::new(outputs.path()));
    let processor = BatchProcessor::new(
        store.clone(),
        Arc::new(ImageRsCodec),
        config.limits.max_batch_size,
    );
    TestContext {
        _uploads: uploads,
        _outputs: outputs,
        config,
        store,
        processor,
    }
}

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.config.clone()))
                .app_data(web::Data::from($ctx.store.clone()))
                .app_data(web::Data::new($ctx.processor.clone()))
                .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                    AppError::Validation(format!("malformed request body: {err}")).into()
                }))
                .service(
                    web::scope("/api/v1/images")
                        .route("", web::post().to(handlers::upload_images))
                        .route("/archive", web::post().to(handlers::download_archive))
                        .route("/{identifier}", web::get().to(handlers::get_image)),
                ),
        )
        .await
    };
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let buf: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 32])
    });
    let mut data = Vec::new();
    DynamicImage::ImageRgb8(buf)
        .write_to(&mut Cursor::new(&mut data), image::ImageOutputFormat::Png)
        .unwrap();
    data
}

fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, content_type, data) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[(&str, &str, &[u8])]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/images")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(parts))
}

#[actix_web::test]
async fn upload_single_image_returns_full_manifest() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(200, 100);
    let req = upload_request(&[("cat.jpg", "image/png", &png)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["images"][0]["originalName"], "cat.jpg");
    assert_eq!(body["images"][0]["files"]["png"], "cat.png");
    assert_eq!(body["images"][0]["files"]["webp"], "cat.webp");
    assert_eq!(body["images"][0]["files"]["png2x"], "cat@2x.png");
    assert_eq!(body["images"][0]["files"]["webp2x"], "cat@2x.webp");
}

#[actix_web::test]
async fn upload_without_files_is_rejected() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = upload_request(&[]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn upload_rejects_non_image_mime() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = upload_request(&[("notes.txt", "text/plain", b"hello")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("not an image"));
}

#[actix_web::test]
async fn upload_rejects_eleventh_file() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(20, 20);
    let parts: Vec<(String, &str, &[u8])> = (0..11)
        .map(|i| (format!("img{i}.png"), "image/png", png.as_slice()))
        .collect();
    let borrowed: Vec<(&str, &str, &[u8])> = parts
        .iter()
        .map(|(name, ct, data)| (name.as_str(), *ct, *data))
        .collect();

    let req = upload_request(&borrowed).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn upload_accepts_ten_files() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(20, 20);
    let parts: Vec<(String, &str, &[u8])> = (0..10)
        .map(|i| (format!("img{i}.png"), "image/png", png.as_slice()))
        .collect();
    let borrowed: Vec<(&str, &str, &[u8])> = parts
        .iter()
        .map(|(name, ct, data)| (name.as_str(), *ct, *data))
        .collect();

    let req = upload_request(&borrowed).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["images"].as_array().unwrap().len(), 10);
}

#[actix_web::test]
async fn upload_rejects_file_over_size_limit() {
    let mut ctx = test_context();
    ctx.config.limits.max_file_bytes = 1024;
    let app = init_app!(ctx);

    // Larger than the 1 KiB limit configured above
    let png = png_bytes(400, 400);
    assert!(png.len() > 1024);
    let req = upload_request(&[("big.png", "image/png", &png)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("file limit"));
}

#[actix_web::test]
async fn upload_accepts_file_exactly_at_size_limit() {
    let mut ctx = test_context();
    ctx.config.limits.max_file_bytes = 1024;
    let app = init_app!(ctx);

    // Exactly at the limit passes validation; the body is not a decodable
    // image, so the batch succeeds with a per-image error entry instead
    let exact = vec![0u8; 1024];
    let req = upload_request(&[("exact.png", "image/png", &exact)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let over = vec![0u8; 1025];
    let req = upload_request(&[("over.png", "image/png", &over)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn retrieval_roundtrips_uploaded_rendition() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(100, 100);
    let req = upload_request(&[("cat.jpg", "image/png", &png)]).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/images/cat.webp")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/webp"
    );
    let first = test::read_body(resp).await;
    assert!(!first.is_empty());

    // Byte-identical on repeat retrieval
    let req = test::TestRequest::get()
        .uri("/api/v1/images/cat.webp")
        .to_request();
    let second = test::read_body(test::call_service(&app, req).await).await;
    assert_eq!(first, second);
}

#[actix_web::test]
async fn retrieval_download_flag_sets_attachment_disposition() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(50, 50);
    let req = upload_request(&[("cat.jpg", "image/png", &png)]).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/images/cat.png?download=true")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/png"
    );
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("cat.png"));
}

#[actix_web::test]
async fn retrieval_of_unknown_identifier_is_404() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/v1/images/ghost.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().is_some());
}

#[actix_web::test]
async fn retrieval_rejects_traversal_identifier() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/v1/images/..")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn archive_endpoint_bundles_requested_files() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(60, 40);
    let req = upload_request(&[("cat.jpg", "image/png", &png)]).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/images/archive")
        .set_json(serde_json::json!({"files": ["cat.png", "cat.webp"]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/zip"
    );
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.contains("images.zip"));

    let body = test::read_body(resp).await;
    let mut zip = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
    assert_eq!(zip.len(), 2);
    assert!(zip.by_name("cat.png").is_ok());
}

#[actix_web::test]
async fn archive_endpoint_rejects_empty_list() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/images/archive")
        .set_json(serde_json::json!({"files": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn archive_endpoint_rejects_malformed_body() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/images/archive")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn duplicate_names_in_one_upload_are_both_suffixed() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let png = png_bytes(40, 40);
    let req = upload_request(&[
        ("cat.jpg", "image/png", &png),
        ("cat.png", "image/png", &png),
    ])
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let first = body["images"][0]["files"]["png"].as_str().unwrap();
    let second = body["images"][1]["files"]["png"].as_str().unwrap();
    assert_ne!(first, second);
    assert!(first.starts_with("cat-"));
    assert!(second.starts_with("cat-"));
    assert_eq!(body["images"][0]["originalName"], "cat.jpg");
    assert_eq!(body["images"][1]["originalName"], "cat.png");
}
