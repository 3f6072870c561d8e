//! Rendition Service
//!
//! HTTP service that accepts batches of uploaded raster images and produces
//! four fixed renditions per image (standard and 2x widths, PNG and WebP).
//! Outputs are retrievable individually or bundled into a ZIP archive.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
