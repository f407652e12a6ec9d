//! Reqwest client module.
//!
//! Wraps a `reqwest::Client` configured from [`ReqwestConfig`] and shared by
//! the transport and the negotiator.

mod client;
mod config;

pub use client::{ReqwestClient, TRACING_TARGET};
pub use config::ReqwestConfig;
