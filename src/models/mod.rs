/// Data models for rendition-service
///
/// This module defines structures for:
/// - RenditionKind: the four fixed output variants per source image
/// - BatchManifest: the per-batch response returned to the uploader
/// - Request DTOs for retrieval and bulk download
use serde::{Deserialize, Serialize};

// ========================================
// Rendition Variants
// ========================================

/// Target encoding for a rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// One of the four fixed output variants derived from a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionKind {
    Png,
    Webp,
    Png2x,
    Webp2x,
}

impl RenditionKind {
    /// All four variants, in manifest key order
    pub const ALL: [RenditionKind; 4] = [Self::Png, Self::Webp, Self::Png2x, Self::Webp2x];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Png2x => "png2x",
            Self::Webp2x => "webp2x",
        }
    }

    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Png | Self::Png2x => OutputFormat::Png,
            Self::Webp | Self::Webp2x => OutputFormat::Webp,
        }
    }

    /// Whether this variant is rendered at twice the standard width
    pub fn is_double(&self) -> bool {
        matches!(self, Self::Png2x | Self::Webp2x)
    }

    /// The public output identifier for this variant of `base_name`.
    ///
    /// Identifiers have the form `<baseName>[@2x].<ext>` and double as both
    /// the on-disk filename and the retrieval key.
    pub fn identifier(&self, base_name: &str) -> String {
        let scale = if self.is_double() { "@2x" } else { "" };
        format!("{}{}.{}", base_name, scale, self.format().extension())
    }
}

// ========================================
// Batch Manifest
// ========================================

/// Output identifiers produced for one source image, keyed by variant.
///
/// A missing field means that rendition failed; the failure reason is logged
/// and, when all four are missing, surfaced via `ManifestEntry::error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenditionFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png2x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp2x: Option<String>,
}

impl RenditionFiles {
    pub fn set(&mut self, kind: RenditionKind, identifier: String) {
        match kind {
            RenditionKind::Png => self.png = Some(identifier),
            RenditionKind::Webp => self.webp = Some(identifier),
            RenditionKind::Png2x => self.png2x = Some(identifier),
            RenditionKind::Webp2x => self.webp2x = Some(identifier),
        }
    }

    pub fn get(&self, kind: RenditionKind) -> Option<&str> {
        match kind {
            RenditionKind::Png => self.png.as_deref(),
            RenditionKind::Webp => self.webp.as_deref(),
            RenditionKind::Png2x => self.png2x.as_deref(),
            RenditionKind::Webp2x => self.webp2x.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_none() && self.webp.is_none() && self.png2x.is_none() && self.webp2x.is_none()
    }

    pub fn len(&self) -> usize {
        RenditionKind::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_some())
            .count()
    }
}

/// Per-source result within a batch response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub original_name: String,
    pub files: RenditionFiles,
    /// Present only when every rendition for this source failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response DTO for a processed upload batch, preserving submission order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifest {
    pub message: String,
    pub images: Vec<ManifestEntry>,
}

// ========================================
// Request DTOs
// ========================================

/// Body of a bulk-download request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRequest {
    pub files: Vec<String>,
}

/// Query parameters for single-image retrieval
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveQuery {
    /// Force a content-disposition that names the file for direct download
    #[serde(default)]
    pub download: Option<bool>,
}
