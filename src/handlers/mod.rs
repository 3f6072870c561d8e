/// HTTP handlers for the rendition service
///
/// This module contains handlers for:
/// - Images: upload a batch, retrieve one rendition, bulk-download a ZIP
pub mod images;

pub use images::{download_archive, get_image, upload_images};
