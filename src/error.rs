//! Typed errors for collaborator boundaries.
//!
//! Scoring paths never surface these to callers: they are caught, logged and
//! turned into fallback values. The pattern detector and the CLI wrap them in
//! `anyhow::Error` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("storage error: {0}")]
    Store(String),

    #[error("invalid location ({lat}, {lng})")]
    InvalidLocation { lat: f64, lng: f64 },

    #[error("geographic validation failed: {0}")]
    Validation(String),

    #[error("enrichment failed: {0}")]
    Enrichment(String),

    #[error("config error in {path}: {message}")]
    Config { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, SiteError>;
