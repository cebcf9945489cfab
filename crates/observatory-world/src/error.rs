//! Error types for world state persistence.

/// Errors that can occur while persisting or restoring the world snapshot.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot document could not be (de)serialized.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
