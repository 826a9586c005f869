use std::path::PathBuf;

use feed::FeedError;
use telemetry::JitterError;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("invalid jitter preset: {0}")]
    Jitter(#[from] JitterError),

    #[error("unavailable: {0}")]
    Unavailable(&'static str),

    #[error("cannot read auth token from {path}: {source}")]
    AuthToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
