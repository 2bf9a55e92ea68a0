use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    /// No surface with this id exists on the page
    #[error("surface not found: {0}")]
    SurfaceNotFound(String),

    /// The surface already has an animator mounted on it
    #[error("surface already animated: {0}")]
    SurfaceBusy(String),

    #[error("duplicate surface id: {0}")]
    DuplicateSurface(String),

    #[error("page has no surfaces")]
    EmptyPage,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid page file: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
