use std::path::PathBuf;
use thiserror::Error;

/// Why a retrieval produced no match.
///
/// Every variant leads to the same empty result line; the distinction only
/// reaches the logs and library callers.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("folder '{}' does not exist", .0.display())]
    FolderNotFound(PathBuf),

    #[error("could not list folder '{}': {source}", .path.display())]
    ListFolder {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("no files with a recognized image extension")]
    NoCandidates,

    #[error("none of the {0} candidate images could be loaded")]
    NoDecodableImages(usize),

    #[error("model failure: {0:#}")]
    Model(anyhow::Error),

    #[error("model panicked: {0}")]
    ModelPanicked(String),
}

impl RetrievalError {
    /// Short stable label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FolderNotFound(_) => "folder_not_found",
            Self::ListFolder { .. } => "list_folder",
            Self::NoCandidates => "no_candidates",
            Self::NoDecodableImages(_) => "no_decodable_images",
            Self::Model(_) => "model",
            Self::ModelPanicked(_) => "model_panicked",
        }
    }
}
