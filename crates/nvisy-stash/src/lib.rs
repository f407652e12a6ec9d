#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod outcome;
mod stasher;
mod target;

pub mod form;
pub mod input;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use config::{DEFAULT_CONTENT_TYPE, DEFAULT_FILENAME, DEFAULT_MAX_UPLOAD_SIZE, StashConfig};
pub use error::{BoxedError, Error, ErrorKind, LENGTH_REQUIRED_MESSAGE, Result};
pub use input::{InputShape, ResponseBody, ResponseLike, StashInput};
pub use outcome::{STORE_LENGTH_COMPLAINT, SUCCESS_STATUS, classify};
pub use stasher::{FileStasher, TRACING_TARGET};
pub use target::{KEY_FIELD, SharedNegotiator, UploadNegotiator, UploadTarget};
