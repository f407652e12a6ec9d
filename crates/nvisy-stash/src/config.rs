//! Stash pipeline configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default upload ceiling: 150 MB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 150_000_000;

/// Filename used when neither the caller nor the input provides one.
pub const DEFAULT_FILENAME: &str = "unnamedfile";

/// Content type sent for the file part.
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

/// Configuration for [`FileStasher`](crate::FileStasher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StashConfig {
    /// Largest accepted upload in bytes (inclusive)
    #[cfg_attr(
        feature = "config",
        arg(long = "stash-max-upload-size", default_value_t = DEFAULT_MAX_UPLOAD_SIZE)
    )]
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Filename used when none can be determined
    #[cfg_attr(
        feature = "config",
        arg(long = "stash-default-filename", default_value = DEFAULT_FILENAME)
    )]
    #[serde(default = "default_filename")]
    pub default_filename: String,

    /// Content type of the uploaded file part
    #[cfg_attr(
        feature = "config",
        arg(long = "stash-content-type", default_value = DEFAULT_CONTENT_TYPE)
    )]
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_owned()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_owned()
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            max_upload_size: default_max_upload_size(),
            default_filename: default_filename(),
            content_type: default_content_type(),
        }
    }
}

impl StashConfig {
    /// Set the upload ceiling in bytes.
    #[must_use]
    pub fn with_max_upload_size(mut self, max_upload_size: u64) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }

    /// Set the fallback filename.
    #[must_use]
    pub fn with_default_filename(mut self, default_filename: impl Into<String>) -> Self {
        self.default_filename = default_filename.into();
        self
    }

    /// Set the content type of the file part.
    ///
    /// Control characters are rejected when the upload form is assembled.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Returns the fallback filename, using the built-in one if empty.
    pub fn effective_default_filename(&self) -> &str {
        if self.default_filename.is_empty() {
            DEFAULT_FILENAME
        } else {
            &self.default_filename
        }
    }
}
