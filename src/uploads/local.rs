//! # Local Photo Storage
//!
//! Writes validated bootcamp photos under a root directory as
//! `photo_<bootcamp id><ext>`.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{UploadError, UploadResult};

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Local filesystem photo store
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    max_size: u64,
}

impl PhotoStore {
    pub fn new(root: PathBuf, max_size: u64) -> Self {
        Self { root, max_size }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Check MIME type and size
    pub fn validate(&self, file: &IncomingFile) -> UploadResult<()> {
        if !file.content_type.starts_with("image") {
            return Err(UploadError::NotAnImage(file.content_type.clone()));
        }
        let size = file.data.len() as u64;
        if size > self.max_size {
            return Err(UploadError::FileTooLarge(size, self.max_size));
        }
        Ok(())
    }

    /// Validate and store a photo for `owner_id`, returning the stored name
    pub fn save(&self, owner_id: &str, file: &IncomingFile) -> UploadResult<String> {
        self.validate(file)?;

        if owner_id.is_empty() || owner_id.contains(['/', '\\', '.']) {
            return Err(UploadError::InvalidName(owner_id.to_string()));
        }
        let name = format!("photo_{}{}", owner_id, extension_of(&file.file_name)?);

        fs::create_dir_all(&self.root).map_err(|e| UploadError::IoError(e.to_string()))?;
        fs::write(self.root.join(&name), &file.data)
            .map_err(|e| UploadError::IoError(e.to_string()))?;

        Ok(name)
    }
}

/// Extension including the dot, or empty when the name has none
fn extension_of(file_name: &str) -> UploadResult<String> {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        None => Ok(String::new()),
        Some(ext) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => Ok(format!(".{}", ext)),
        Some(_) => Err(UploadError::InvalidName(file_name.to_string())),
    }
}
