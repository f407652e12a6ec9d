//! Multipart upload form.
//!
//! An [`UploadForm`] holds the negotiated fields, the synthesized
//! `Content-Disposition` field and the `file` part, in that order. Its total
//! encoded length is computed before anything is sent, so a missing length
//! fails locally instead of at the store.

mod encode;

use crate::input::{FileContent, NormalizedInput, content_disposition};
use crate::target::UploadTarget;
use crate::{Error, Result, StashConfig};

/// Tracing target for form assembly.
pub const TRACING_TARGET: &str = "nvisy_stash::form";

/// Name of the synthesized disposition field.
pub const DISPOSITION_FIELD: &str = "Content-Disposition";

/// Name of the file part.
pub const FILE_FIELD: &str = "file";

/// Plain form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
}

/// The file part of the form.
#[derive(Debug)]
pub struct FilePart {
    /// Content to upload.
    pub content: FileContent,
    /// Content type sent for the part.
    pub content_type: String,
    /// Sanitized filename.
    pub filename: String,
    /// Declared length; trusted over the content's own length.
    pub known_length: Option<u64>,
}

impl FilePart {
    /// Length of the part body: the declared one, else the content's own.
    pub fn length(&self) -> Option<u64> {
        self.known_length.or_else(|| self.content.len())
    }
}

/// Ephemeral multipart form for one upload attempt.
#[derive(Debug)]
pub struct UploadForm {
    boundary: String,
    fields: Vec<FormField>,
    file: Option<FilePart>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadForm {
    /// Creates an empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("--------------------------{}", uuid::Uuid::new_v4().simple()))
    }

    /// Creates an empty form with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
            file: None,
        }
    }

    /// Assembles the form for `target` from normalized input.
    ///
    /// Fails with [`Error::TooLarge`] when a known length exceeds
    /// `config.max_upload_size`; nothing is appended in that case. A
    /// `config.content_type` with control characters is a
    /// [`Error::Configuration`] error.
    pub fn for_target(
        target: &UploadTarget,
        input: NormalizedInput,
        config: &StashConfig,
    ) -> Result<Self> {
        if config.content_type.chars().any(char::is_control) {
            return Err(Error::configuration(
                "content type must not contain control characters",
            ));
        }

        if let Some(length) = input.effective_length()
            && length > config.max_upload_size
        {
            tracing::debug!(
                target: TRACING_TARGET,
                length,
                max = config.max_upload_size,
                "Upload exceeds the size ceiling"
            );
            return Err(Error::too_large(length, config.max_upload_size));
        }

        let mut form = Self::new();
        for (name, value) in &target.fields {
            form.append_field(name.clone(), value.clone());
        }
        form.append_field(DISPOSITION_FIELD, content_disposition(&input.filename));
        form.set_file(FilePart {
            content: input.content,
            content_type: config.content_type.clone(),
            filename: input.filename,
            known_length: input.known_length,
        });

        tracing::debug!(
            target: TRACING_TARGET,
            fields = form.fields.len(),
            "Assembled upload form"
        );

        Ok(form)
    }

    /// Appends a plain field.
    pub fn append_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(FormField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Sets the file part, replacing any previous one.
    pub fn set_file(&mut self, file: FilePart) {
        self.file = Some(file);
    }

    /// Multipart boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Plain fields in send order.
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// The file part, if set.
    pub fn file(&self) -> Option<&FilePart> {
        self.file.as_ref()
    }

    /// Value for the request `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}
