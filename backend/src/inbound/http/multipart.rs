//! Buffered `multipart/form-data` parsing for upload endpoints.
//!
//! Upload forms carry a handful of text fields plus at most a few files, so
//! the whole form is read into memory before the handler validates it. Text
//! fields keep their last value; file parts become [`FileUpload`]s keyed by
//! field name.

use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use futures_util::TryStreamExt;
use tracing::debug;

use crate::domain::{Error, FileUpload};

/// Largest accepted file part.
pub const MAX_FILE_BYTES: usize = 50 * 1024 * 1024;
/// Largest accepted text part.
pub const MAX_TEXT_BYTES: usize = 64 * 1024;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A fully buffered multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FileUpload>,
}

impl MultipartForm {
    /// Drain `payload`, rejecting oversized or malformed parts with `400`.
    pub async fn read(mut payload: Multipart) -> Result<Self, Error> {
        let mut form = Self::default();
        while let Some(field) = payload.try_next().await.map_err(malformed)? {
            form.absorb(field).await?;
        }
        Ok(form)
    }

    async fn absorb(&mut self, mut field: Field) -> Result<(), Error> {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        let content_type = field
            .content_type()
            .map_or_else(|| FALLBACK_CONTENT_TYPE.to_owned(), ToString::to_string);
        let limit = if file_name.is_some() {
            MAX_FILE_BYTES
        } else {
            MAX_TEXT_BYTES
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if bytes.len() + chunk.len() > limit {
                return Err(too_large(&name, limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) if !bytes.is_empty() => {
                debug!(field = %name, size = bytes.len(), "buffered upload part");
                self.files.insert(
                    name,
                    FileUpload {
                        bytes,
                        file_name,
                        content_type,
                    },
                );
            }
            // Browsers send an empty part when no file was chosen.
            Some(_) => {}
            None => {
                let text = String::from_utf8(bytes).map_err(|_| {
                    Error::invalid_request(format!("{name} must be UTF-8 text"))
                })?;
                self.fields.insert(name, text);
            }
        }
        Ok(())
    }

    /// Trimmed text value, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Owned copy of [`MultipartForm::text`].
    pub fn owned(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_owned)
    }

    /// First present text value among `names`; forms use a few aliases.
    pub fn text_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.text(name))
    }

    /// Remove and return the file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<FileUpload> {
        self.files.remove(name)
    }
}

fn malformed(err: actix_multipart::MultipartError) -> Error {
    debug!(error = %err, "malformed multipart body");
    Error::invalid_request("Malformed multipart body")
}

fn too_large(field: &str, limit: usize) -> Error {
    Error::invalid_request(format!("{field} exceeds the upload limit"))
        .with_details(serde_json::json!({ "field": field, "maxBytes": limit }))
}
