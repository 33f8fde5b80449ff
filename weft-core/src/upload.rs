//! Uploaded files handed over by the multipart-parsing collaborator. The
//! framework only consumes the finished name -> file mapping.

use std::collections::HashMap;

/// One file received with the submission, keyed by its form field name.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field_name: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        UploadedFile {
            field_name: field_name.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// The per-request upload mapping, populated externally before the
/// lifecycle runs.
#[derive(Debug, Clone, Default)]
pub struct UploadMap {
    files: HashMap<String, UploadedFile>,
}

impl UploadMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files without a client-side file name are discarded: the browser
    /// submits an empty part for untouched file inputs.
    pub fn insert(&mut self, file: UploadedFile) {
        if file.file_name.is_empty() {
            return;
        }
        self.files.insert(file.field_name.clone(), file);
    }

    pub fn file(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.get(field_name)
    }

    pub fn all(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
