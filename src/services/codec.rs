//! Image codec adapter
//!
//! Wraps decode/resize/encode behind a trait so the transcode worker can be
//! exercised with failing fakes in tests. The default implementation uses the
//! `image` crate for decoding, Lanczos3 resampling and PNG encoding, and the
//! `webp` crate for lossy WebP encoding (the pure-Rust `image` WebP encoder
//! is lossless-only).

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageEncoder};
use thiserror::Error;

use crate::models::OutputFormat;

/// Lossy WebP quality for every WebP rendition
pub const WEBP_QUALITY: f32 = 90.0;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode {format} output: {reason}")]
    Encode { format: &'static str, reason: String },
}

/// Decode and resize-and-encode capability used by the transcode worker
pub trait ImageCodec: Send + Sync {
    /// Decode source bytes into pixels, failing on corrupt or unsupported input
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Resize to exactly `width` x `height` and encode in the target format.
    ///
    /// The caller derives the target dimensions from the original image, so
    /// aspect ratio is never recomputed from an intermediate here.
    fn resize_and_encode(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        format: OutputFormat,
    ) -> Result<Bytes, CodecError>;
}

/// Default codec backed by the `image` and `webp` crates
pub struct ImageRsCodec;

impl ImageCodec for ImageRsCodec {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory(data).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn resize_and_encode(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        format: OutputFormat,
    ) -> Result<Bytes, CodecError> {
        let resized = if image.dimensions() == (width, height) {
            image.clone()
        } else {
            image.resize_exact(width, height, FilterType::Lanczos3)
        };
        let rgba = resized.to_rgba8();

        match format {
            OutputFormat::Png => {
                // CompressionType::Best corresponds to deflate level 9
                let mut buf = Vec::new();
                let encoder = PngEncoder::new_with_quality(
                    Cursor::new(&mut buf),
                    CompressionType::Best,
                    PngFilterType::Adaptive,
                );
                encoder
                    .write_image(rgba.as_raw(), width, height, image::ColorType::Rgba8)
                    .map_err(|e| CodecError::Encode {
                        format: "png",
                        reason: e.to_string(),
                    })?;
                Ok(Bytes::from(buf))
            }
            OutputFormat::Webp => {
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
                let encoded = encoder.encode(WEBP_QUALITY);
                Ok(Bytes::copy_from_slice(&encoded))
            }
        }
    }
}
