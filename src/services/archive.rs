//! Bulk-download archive assembly
//!
//! Streams previously produced renditions into a single ZIP at maximum
//! compression. Missing identifiers are skipped with a log line; the archive
//! is finalized before any byte is handed back, so consumers always read a
//! complete container.

use std::io::Write;

use bytes::Bytes;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::storage::{is_flat_key, OutputStore};

/// Build a ZIP archive over a list of output identifiers.
///
/// Rejects an empty list; identifiers that are malformed or absent from the
/// store are skipped rather than failing the archive.
pub async fn build_archive(store: &dyn OutputStore, identifiers: &[String]) -> Result<Bytes> {
    if identifiers.is_empty() {
        return Err(AppError::Validation(
            "no files requested for archive".to_string(),
        ));
    }

    let mut entries: Vec<(String, Bytes)> = Vec::new();
    for identifier in identifiers {
        if !is_flat_key(identifier) {
            warn!(identifier = %identifier, "skipping invalid archive identifier");
            continue;
        }
        match store.read(identifier).await? {
            Some(data) => entries.push((identifier.clone(), data)),
            None => warn!(identifier = %identifier, "skipping missing archive entry"),
        }
    }

    let archive = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(9));

        for (name, data) in entries {
            writer
                .start_file(name, options)
                .map_err(|e| AppError::Internal(format!("archive entry failed: {e}")))?;
            writer
                .write_all(&data)
                .map_err(|e| AppError::Internal(format!("archive write failed: {e}")))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| AppError::Internal(format!("archive finalize failed: {e}")))?;
        Ok(cursor.into_inner())
    })
    .await
    .map_err(|e| AppError::Internal(format!("archive task panicked: {e}")))??;

    Ok(Bytes::from(archive))
}
