use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::utils::transport::TransportError;

/// Every way an install request can fail.
///
/// Components return these directly; only the command layer turns them into
/// user-facing text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid version format '{0}', expected X.Y.Z (e.g. 18.17.0)")]
    InvalidFormat(String),

    #[error("Node.js {0} was not found on the release server")]
    VersionNotFound(String),

    #[error("Node.js {version} has no {platform} build")]
    NoPlatformBuild { version: String, platform: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("download of {url} was interrupted: {source}")]
    Download {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("archive {} is corrupt: {source}", path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry '{0}' would be written outside the extraction directory")]
    UnsafeEntry(String),

    #[error("no payload directory in archive")]
    MissingPayload,

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a `map_err` adapter that tags an I/O error with the path involved.
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
        move |source| Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::InvalidFormat(_) => Some("Use the X.Y.Z format, for example 18.17.0"),
            Error::VersionNotFound(_) | Error::NoPlatformBuild { .. } => {
                Some("Popular versions: 18.17.0, 20.9.0, 22.0.0")
            }
            Error::Transport(_) | Error::Download { .. } => {
                Some(concat!(
                    "Check your connection, or configure a proxy with --proxy ",
                    "or PROXY_HOST/PROXY_PORT"
                ))
            }
            _ => None,
        }
    }
}
