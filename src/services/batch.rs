//! Batch orchestration
//!
//! Validates an upload batch, resolves output base names, fans the batch out
//! to one concurrent transcode worker per source, assembles the manifest in
//! submission order and deletes the spooled originals afterwards. Per-image
//! failures become manifest entries; only whole-store failures abort a batch.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{BatchManifest, ManifestEntry, RenditionFiles};
use crate::services::codec::ImageCodec;
use crate::services::naming;
use crate::services::transcode::{SourceImage, TranscodeWorker};
use crate::storage::OutputStore;

/// Batch processor shared across request handlers
#[derive(Clone)]
pub struct BatchProcessor {
    store: Arc<dyn OutputStore>,
    codec: Arc<dyn ImageCodec>,
    max_batch_size: usize,
}

impl BatchProcessor {
    pub fn new(
        store: Arc<dyn OutputStore>,
        codec: Arc<dyn ImageCodec>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            codec,
            max_batch_size,
        }
    }

    /// Process one upload batch into a manifest.
    ///
    /// The spooled input files are deleted before returning, whether or not
    /// their processing succeeded; deletion failures are logged only.
    pub async fn process(&self, sources: Vec<SourceImage>) -> Result<BatchManifest> {
        if sources.is_empty() {
            return Err(AppError::Validation(
                "no image files in upload batch".to_string(),
            ));
        }
        if sources.len() > self.max_batch_size {
            let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();
            cleanup_inputs(&paths).await;
            return Err(AppError::Validation(format!(
                "too many files: {} exceeds the batch limit of {}",
                sources.len(),
                self.max_batch_size
            )));
        }

        let names: Vec<String> = sources.iter().map(|s| s.original_name.clone()).collect();
        let resolved = naming::resolve(&names, self.store.as_ref()).await;

        let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();
        let worker = TranscodeWorker::new(self.codec.clone(), self.store.clone());

        // Embarrassingly parallel: every write target is unique, so the
        // workers share nothing mutable
        let mut handles = Vec::with_capacity(sources.len());
        for (source, assignment) in sources.into_iter().zip(resolved.into_iter()) {
            let worker = worker.clone();
            handles.push(tokio::spawn(async move {
                worker.transcode(&source, &assignment.base_name).await
            }));
        }

        let mut entries: Vec<ManifestEntry> = Vec::with_capacity(handles.len());
        for (handle, original_name) in handles.into_iter().zip(names.into_iter()) {
            match handle.await {
                Ok(result) => entries.push(ManifestEntry::from(result)),
                Err(err) => {
                    warn!(original = %original_name, "transcode task panicked: {}", err);
                    entries.push(ManifestEntry {
                        original_name,
                        files: RenditionFiles::default(),
                        error: Some(format!("transcode task panicked: {err}")),
                    });
                }
            }
        }

        cleanup_inputs(&paths).await;

        let processed = entries.iter().filter(|e| !e.files.is_empty()).count();
        let total = entries.len();
        info!(processed, total, "batch complete");

        Ok(BatchManifest {
            message: format!("{} of {} images processed successfully", processed, total),
            images: entries,
        })
    }
}

/// Delete spooled originals to bound storage growth. Failures must not mask
/// the primary result, so they are logged and dropped.
async fn cleanup_inputs(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), "failed to delete transient upload: {}", err);
        }
    }
}
