/// Rendition Service - HTTP Server
///
/// Accepts batches of uploaded images, produces standard and 2x PNG/WebP
/// renditions, and serves them back individually or as a ZIP archive.
use actix_web::{middleware as actix_middleware, web, App, HttpResponse, HttpServer};
use rendition_service::handlers;
use rendition_service::services::{BatchProcessor, ImageCodec, ImageRsCodec};
use rendition_service::storage::{FsStore, OutputStore};
use rendition_service::{AppError, Config};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");

    // Provision the upload spool and the output store directory
    std::fs::create_dir_all(&config.storage.upload_dir)?;
    std::fs::create_dir_all(&config.storage.output_dir)?;

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!(
        env = %config.app.env,
        output_dir = %config.storage.output_dir.display(),
        "Rendition Service starting HTTP server on {}",
        bind_address
    );

    let store: Arc<dyn OutputStore> = Arc::new(FsStore::new(config.storage.output_dir.clone()));
    let codec: Arc<dyn ImageCodec> = Arc::new(ImageRsCodec);
    let processor = BatchProcessor::new(store.clone(), codec, config.limits.max_batch_size);
    let store_data: web::Data<dyn OutputStore> = web::Data::from(store);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(store_data.clone())
            .app_data(web::Data::new(processor.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(format!("malformed request body: {err}")).into()
            }))
            .wrap(actix_middleware::Logger::default())
            .route(
                "/api/v1/health",
                web::get()
                    .to(|| async { HttpResponse::Ok().json(serde_json::json!({"status": "ok"})) }),
            )
            .route(
                "/api/v1/health/ready",
                web::get().to(|| async { HttpResponse::Ok().finish() }),
            )
            .route(
                "/api/v1/health/live",
                web::get().to(|| async { HttpResponse::Ok().finish() }),
            )
            .service(
                web::scope("/api/v1/images")
                    .route("", web::post().to(handlers::upload_images))
                    .route("/archive", web::post().to(handlers::download_archive))
                    .route("/{identifier}", web::get().to(handlers::get_image)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
