use std::io;
use std::path::PathBuf;

use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallErrorKind {
    Query,
    Network,
    Extraction,
    Registration,
    Cleanup,
}

/// Why a font install failed. Nothing is retried; fonts registered before a
/// `Registration` failure stay installed.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("could not enumerate installed fonts")]
    Query(#[source] Cause),

    #[error("failed to download {url}")]
    Network {
        url: String,
        #[source]
        source: Cause,
    },

    #[error("failed to extract {}", archive.display())]
    Extraction {
        archive: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("failed to register {} ({registered} font file(s) were already registered)", font.display())]
    Registration {
        font: PathBuf,
        registered: usize,
        #[source]
        source: Cause,
    },

    #[error("failed to remove temporary path {}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub fn kind(&self) -> InstallErrorKind {
        match self {
            InstallError::Query(_) => InstallErrorKind::Query,
            InstallError::Network { .. } => InstallErrorKind::Network,
            InstallError::Extraction { .. } => InstallErrorKind::Extraction,
            InstallError::Registration { .. } => InstallErrorKind::Registration,
            InstallError::Cleanup { .. } => InstallErrorKind::Cleanup,
        }
    }
}
