//! Raw upload input and the immutable handle produced by staging

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Where an upload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrigin {
    DragDrop,
    #[default]
    FilePicker,
    CameraCapture,
}

/// Unvalidated file/blob handed over by the UI
#[derive(Debug, Clone)]
pub struct RawImageSource {
    pub bytes: Vec<u8>,
    /// Media type reported by the browser/OS; sniffed from content when absent
    pub declared_media_type: Option<String>,
    pub file_name: Option<String>,
    pub origin: ImageOrigin,
}

impl RawImageSource {
    pub fn new(bytes: Vec<u8>, declared_media_type: Option<&str>) -> Self {
        Self {
            bytes,
            declared_media_type: declared_media_type.map(str::to_string),
            file_name: None,
            origin: ImageOrigin::default(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_origin(mut self, origin: ImageOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Read a file from disk; the media type is left to content sniffing
    pub async fn from_path(path: &Path, origin: ImageOrigin) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let mut source = Self::new(bytes, None).with_origin(origin);
        source.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(source)
    }
}

/// Immutable reference to a staged image
///
/// Exclusively owns the image bytes. Not `Clone`: a new upload always
/// produces a new handle.
#[derive(Debug)]
pub struct ImageHandle {
    id: Uuid,
    bytes: Arc<[u8]>,
    media_type: String,
    file_name: Option<String>,
    origin: ImageOrigin,
    created_at: DateTime<Utc>,
}

impl ImageHandle {
    pub(crate) fn new(source: RawImageSource, media_type: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: Arc::from(source.bytes),
            media_type,
            file_name: source.file_name,
            origin: source.origin,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn origin(&self) -> ImageOrigin {
        self.origin
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read-only view of the image sent to the inference service
    pub fn payload(&self) -> ImagePayload {
        ImagePayload {
            handle_id: self.id,
            bytes: Arc::clone(&self.bytes),
            media_type: self.media_type.clone(),
        }
    }
}

/// Image data as seen by an inference service
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub handle_id: Uuid,
    pub bytes: Arc<[u8]>,
    pub media_type: String,
}
