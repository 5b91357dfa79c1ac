//! Error kinds specific to exporting; failures of child processes are
//! [`atomic_migrate_utils::CommandError`].

/// Errors raised by the export pipeline itself.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ExportError {
    /// Dangling images exist and the operator declined to remove them.
    #[error("Please delete dangling images before running atomic migrate export")]
    DanglingImagesPresent,
    /// The operator agreed to remove dangling images, but that failed.
    #[error("Failed to delete dangling images")]
    DanglingRemovalFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// Removal claimed success, yet the engine still reports dangling images.
    #[error("Dangling images remain after removal: {}", .ids.join(", "))]
    DanglingImagesRemain { ids: Vec<String> },
}
