/// Service layer for the rendition pipeline
///
/// This module provides the decision logic of the service:
/// - naming: collision-aware base name resolution for upload batches
/// - transcode: per-image multi-format rendition worker
/// - batch: fan-out orchestration and manifest assembly
/// - archive: ZIP assembly for bulk download
/// - codec: the decode/resize/encode adapter behind the worker
pub mod archive;
pub mod batch;
pub mod codec;
pub mod naming;
pub mod transcode;

pub use batch::BatchProcessor;
pub use codec::{ImageCodec, ImageRsCodec};
pub use transcode::{SourceImage, TranscodeWorker};
