//! Per-image transcode worker
//!
//! Produces up to four renditions for one source image. The source is decoded
//! once; standard target dimensions come from the original's intrinsic size
//! (width capped at 1200, height rounded to preserve aspect ratio) and the 2x
//! variants simply double both. Each rendition is encoded, written to the
//! store and verified non-empty independently, so a single failed variant
//! never takes down its siblings.
//!
//! Uses `spawn_blocking` for the CPU-intensive decode and encode steps to
//! avoid blocking the async runtime.

use std::path::PathBuf;
use std::sync::Arc;

use image::GenericImageView;
use tracing::{debug, warn};

use crate::models::{ManifestEntry, RenditionFiles, RenditionKind};
use crate::services::codec::ImageCodec;
use crate::storage::OutputStore;

/// Maximum width of the standard renditions; 2x renditions double this
pub const STANDARD_MAX_WIDTH: u32 = 1200;

/// One uploaded file spooled to local disk, deleted by the orchestrator
/// after the batch completes
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub original_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Outcome of one rendition attempt, kept explicit so failure reasons stay
/// inspectable in logs and tests rather than collapsing into map-absence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionOutcome {
    Produced(String),
    Failed(String),
}

/// Per-image result reported back to the batch orchestrator.
///
/// Always returned, never thrown: an entry with four failures still carries
/// the reasons for each.
#[derive(Debug)]
pub struct PartialResult {
    pub original_name: String,
    pub outcomes: Vec<(RenditionKind, RenditionOutcome)>,
}

impl PartialResult {
    fn failed_all(original_name: String, reason: String) -> Self {
        let outcomes = RenditionKind::ALL
            .iter()
            .map(|kind| (*kind, RenditionOutcome::Failed(reason.clone())))
            .collect();
        Self {
            original_name,
            outcomes,
        }
    }

    /// Number of renditions that landed in the store
    pub fn produced_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RenditionOutcome::Produced(_)))
            .count()
    }
}

impl From<PartialResult> for ManifestEntry {
    fn from(result: PartialResult) -> Self {
        let mut files = RenditionFiles::default();
        let mut first_failure = None;

        for (kind, outcome) in result.outcomes {
            match outcome {
                RenditionOutcome::Produced(identifier) => files.set(kind, identifier),
                RenditionOutcome::Failed(reason) => {
                    if first_failure.is_none() {
                        first_failure = Some(reason);
                    }
                }
            }
        }

        // Partial success reads as success; only a fully failed image
        // carries its error into the manifest
        let error = if files.is_empty() { first_failure } else { None };

        ManifestEntry {
            original_name: result.original_name,
            files,
            error,
        }
    }
}

/// Standard rendition dimensions derived from the intrinsic size.
///
/// Never upscales the standard variant; height is rounded from the original
/// aspect ratio, clamped to at least one pixel.
fn standard_dimensions(intrinsic_width: u32, intrinsic_height: u32) -> (u32, u32) {
    let width = intrinsic_width.min(STANDARD_MAX_WIDTH);
    let height = ((width as f64 * intrinsic_height as f64 / intrinsic_width as f64).round()
        as u32)
        .max(1);
    (width, height)
}

/// Transcode worker bound to a codec and an output store
#[derive(Clone)]
pub struct TranscodeWorker {
    codec: Arc<dyn ImageCodec>,
    store: Arc<dyn OutputStore>,
}

impl TranscodeWorker {
    pub fn new(codec: Arc<dyn ImageCodec>, store: Arc<dyn OutputStore>) -> Self {
        Self { codec, store }
    }

    /// Produce the four renditions of `source` under `base_name`.
    ///
    /// Reads the spooled file but never deletes it; cleanup belongs to the
    /// batch orchestrator.
    pub async fn transcode(&self, source: &SourceImage, base_name: &str) -> PartialResult {
        let original_name = source.original_name.clone();

        let data = match tokio::fs::read(&source.path).await {
            Ok(data) => data,
            Err(err) => {
                return PartialResult::failed_all(
                    original_name,
                    format!("failed to read upload: {err}"),
                )
            }
        };

        let codec = self.codec.clone();
        let decoded = match tokio::task::spawn_blocking(move || codec.decode(&data)).await {
            Ok(Ok(image)) => Arc::new(image),
            Ok(Err(err)) => return PartialResult::failed_all(original_name, err.to_string()),
            Err(err) => {
                return PartialResult::failed_all(
                    original_name,
                    format!("decode task panicked: {err}"),
                )
            }
        };

        let (intrinsic_width, intrinsic_height) = decoded.dimensions();
        let (standard_width, standard_height) =
            standard_dimensions(intrinsic_width, intrinsic_height);

        debug!(
            original = %original_name,
            intrinsic_width,
            intrinsic_height,
            standard_width,
            standard_height,
            "transcoding image"
        );

        let mut outcomes = Vec::with_capacity(RenditionKind::ALL.len());
        for kind in RenditionKind::ALL {
            let (width, height) = if kind.is_double() {
                (standard_width * 2, standard_height * 2)
            } else {
                (standard_width, standard_height)
            };

            let identifier = kind.identifier(base_name);
            let outcome = self
                .produce(decoded.clone(), width, height, kind, identifier)
                .await;

            if let RenditionOutcome::Failed(reason) = &outcome {
                warn!(
                    original = %original_name,
                    rendition = kind.as_str(),
                    reason = %reason,
                    "rendition failed"
                );
            }
            outcomes.push((kind, outcome));
        }

        PartialResult {
            original_name,
            outcomes,
        }
    }

    async fn produce(
        &self,
        image: Arc<image::DynamicImage>,
        width: u32,
        height: u32,
        kind: RenditionKind,
        identifier: String,
    ) -> RenditionOutcome {
        let codec = self.codec.clone();
        let encoded = match tokio::task::spawn_blocking(move || {
            codec.resize_and_encode(&image, width, height, kind.format())
        })
        .await
        {
            Ok(Ok(encoded)) => encoded,
            Ok(Err(err)) => return RenditionOutcome::Failed(err.to_string()),
            Err(err) => return RenditionOutcome::Failed(format!("encode task panicked: {err}")),
        };

        if let Err(err) = self.store.write(&identifier, encoded).await {
            return RenditionOutcome::Failed(format!("store write failed: {err}"));
        }

        // Verify the artifact actually landed with content before counting it
        match self.store.size(&identifier).await {
            Ok(Some(size)) if size > 0 => RenditionOutcome::Produced(identifier),
            Ok(_) => RenditionOutcome::Failed("empty artifact after write".to_string()),
            Err(err) => RenditionOutcome::Failed(format!("artifact verification failed: {err}")),
        }
    }
}
