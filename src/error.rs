use std::path::{Path, PathBuf};

pub type FolioResult<T> = Result<T, FolioError>;

#[derive(thiserror::Error, Debug)]
pub enum FolioError {
    #[error("asset error ({}): {message}", path.display())]
    Asset { path: PathBuf, message: String },

    #[error("render error in {section} section: {message}")]
    Render {
        section: &'static str,
        message: String,
    },

    #[error("merge error: {0}")]
    Merge(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("generation timed out during {stage}")]
    Timeout { stage: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub fn asset(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Asset {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn render(section: &'static str, message: impl Into<String>) -> Self {
        Self::Render {
            section,
            message: message.into(),
        }
    }

    pub fn merge(message: impl Into<String>) -> Self {
        Self::Merge(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Pipeline stage the failure is attributed to.
    pub fn stage(&self) -> &'static str {
        match self {
            FolioError::Asset { .. } => "asset",
            FolioError::Render { section, .. } => section,
            FolioError::Merge(_) => "assemble",
            FolioError::InvalidConfiguration(_) => "config",
            FolioError::Timeout { stage } => stage,
            FolioError::Io(_) => "io",
        }
    }
}
