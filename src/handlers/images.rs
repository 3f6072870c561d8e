/// Image handlers - HTTP endpoints for the rendition pipeline
use actix_multipart::Multipart;
use actix_web::http::header::ContentDisposition;
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ArchiveRequest, RetrieveQuery};
use crate::services::{archive, BatchProcessor, SourceImage};
use crate::storage::{is_flat_key, OutputStore};

/// Upload a multipart batch of images and return the rendition manifest
pub async fn upload_images(
    config: web::Data<Config>,
    processor: web::Data<BatchProcessor>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut sources: Vec<SourceImage> = Vec::new();

    if let Err(err) = spool_batch(&config, &mut payload, &mut sources).await {
        cleanup_spooled(&sources).await;
        return Err(err);
    }

    // The processor validates batch size and deletes the spooled inputs
    let manifest = processor.process(sources).await?;
    Ok(HttpResponse::Ok().json(manifest))
}

/// Stream multipart parts to the upload directory, validating as they arrive
async fn spool_batch(
    config: &Config,
    payload: &mut Multipart,
    sources: &mut Vec<SourceImage>,
) -> Result<()> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart payload: {e}")))?
    {
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        let Some(file_name) = file_name else {
            // Non-file form fields are ignored
            continue;
        };

        if sources.len() >= config.limits.max_batch_size {
            return Err(AppError::Validation(format!(
                "too many files: batch limit is {}",
                config.limits.max_batch_size
            )));
        }

        let is_image = field
            .content_type()
            .map(|mime| mime.type_() == mime::IMAGE)
            .unwrap_or(false);
        if !is_image {
            return Err(AppError::Validation(format!(
                "{file_name} is not an image upload"
            )));
        }

        let path = config.storage.upload_dir.join(Uuid::new_v4().to_string());
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Storage(format!("cannot spool upload: {e}")))?;

        // Register before streaming so partial spools get cleaned up too
        sources.push(SourceImage {
            original_name: file_name.clone(),
            path,
            size_bytes: 0,
        });

        let mut written: u64 = 0;
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::Validation(format!("broken upload stream: {e}")))?
        {
            written += chunk.len() as u64;
            if written > config.limits.max_file_bytes {
                return Err(AppError::Validation(format!(
                    "{file_name} exceeds the {}-byte file limit",
                    config.limits.max_file_bytes
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Storage(format!("cannot spool upload: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::Storage(format!("cannot spool upload: {e}")))?;

        if let Some(source) = sources.last_mut() {
            source.size_bytes = written;
        }
    }

    Ok(())
}

/// Delete partially spooled inputs after a rejected upload
async fn cleanup_spooled(sources: &[SourceImage]) {
    for source in sources {
        if let Err(err) = tokio::fs::remove_file(&source.path).await {
            tracing::warn!(
                path = %source.path.display(),
                "failed to delete rejected upload: {}",
                err
            );
        }
    }
}

/// Retrieve a single stored rendition by output identifier
pub async fn get_image(
    store: web::Data<dyn OutputStore>,
    path: web::Path<String>,
    query: web::Query<RetrieveQuery>,
) -> Result<HttpResponse> {
    let identifier = path.into_inner();
    if !is_flat_key(&identifier) {
        return Err(AppError::Validation("invalid image identifier".to_string()));
    }

    let Some(data) = store.read(&identifier).await? else {
        return Err(AppError::NotFound(format!(
            "no stored image named {identifier}"
        )));
    };

    let content_type = if identifier.ends_with(".png") {
        "image/png"
    } else {
        "image/webp"
    };

    let mut response = HttpResponse::Ok();
    response.content_type(content_type);
    if query.download.unwrap_or(false) {
        response.insert_header(ContentDisposition::attachment(identifier));
    }
    Ok(response.body(data))
}

/// Bundle a list of output identifiers into a single ZIP download
pub async fn download_archive(
    store: web::Data<dyn OutputStore>,
    request: web::Json<ArchiveRequest>,
) -> Result<HttpResponse> {
    let identifiers = request.into_inner().files;
    let data = archive::build_archive(store.get_ref(), &identifiers).await?;

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(ContentDisposition::attachment("images.zip"))
        .body(data))
}
