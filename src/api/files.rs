//! File API
//!
//! Upload descriptors and the metadata returned by the file endpoints.

use crate::api::completion::ApiError;
use crate::error::{ChatwireError, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata of an uploaded file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    pub id: String,
    pub object: String,

    /// Size in bytes
    pub bytes: u64,

    pub created_at: i64,
    pub filename: String,
    pub purpose: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<String>,
}

/// Body of a file endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FileResponse {
    #[serde(flatten)]
    pub info: FileInfo,

    #[serde(default)]
    pub error: Option<ApiError>,
}

impl FileResponse {
    pub fn into_result(self) -> Result<FileInfo> {
        match self.error {
            Some(error) => Err(ChatwireError::Api(error)),
            None => Ok(self.info),
        }
    }
}

/// A file to upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub purpose: String,
    pub file_name: String,
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

impl FileUpload {
    pub fn new(purpose: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            purpose: purpose.into(),
            file_name: file_name.into(),
            data,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read a file from disk
    pub async fn from_path(purpose: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            ChatwireError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::new(purpose, file_name, data))
    }

    /// Build the multipart body (`purpose` and `file` fields)
    pub(crate) fn into_form(self) -> Result<Form> {
        let mut part = Part::bytes(self.data).file_name(self.file_name);
        if let Some(mime) = &self.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| ChatwireError::Config(format!("Invalid mime type: {}", e)))?;
        }
        Ok(Form::new().text("purpose", self.purpose).part("file", part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_response_info() {
        let json = r#"{
            "id": "file-abc123",
            "object": "file",
            "bytes": 120000,
            "created_at": 1677610602,
            "filename": "mydata.jsonl",
            "purpose": "fine-tune"
        }"#;
        let info = serde_json::from_str::<FileResponse>(json)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(info.id, "file-abc123");
        assert_eq!(info.bytes, 120000);
        assert!(info.status.is_none());
    }

    #[test]
    fn test_file_response_error() {
        let json = r#"{"error": {"message": "No such File object: file-x", "type": "invalid_request_error", "param": "id", "code": null}}"#;
        let err = serde_json::from_str::<FileResponse>(json)
            .unwrap()
            .into_result()
            .unwrap_err();
        match err {
            ChatwireError::Api(error) => assert_eq!(error.param, Some(serde_json::json!("id"))),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_mime_type() {
        let upload = FileUpload::new("assistants", "a.txt", b"hi".to_vec()).with_mime_type("not a mime");
        assert!(matches!(upload.into_form(), Err(ChatwireError::Config(_))));
    }

    #[tokio::test]
    async fn test_from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jsonl");
        std::fs::write(&path, b"{}\n").unwrap();

        let upload = FileUpload::from_path("fine-tune", &path).await.unwrap();
        assert_eq!(upload.file_name, "notes.jsonl");
        assert_eq!(upload.data, b"{}\n");
    }
}
