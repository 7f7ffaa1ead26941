//! Writer backend trait for families
//!
//! Defines the interface for persisting families to different backends.

use super::error::FamilyError;
use super::family::Family;
use async_trait::async_trait;

#[derive(Debug)]
pub enum FamilyWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
    Family(FamilyError),
}

impl From<std::io::Error> for FamilyWriterError {
    fn from(err: std::io::Error) -> Self {
        FamilyWriterError::Io(err)
    }
}

impl From<serde_json::Error> for FamilyWriterError {
    fn from(err: serde_json::Error) -> Self {
        FamilyWriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for FamilyWriterError {
    fn from(err: rusqlite::Error) -> Self {
        FamilyWriterError::Database(err.to_string())
    }
}

impl From<FamilyError> for FamilyWriterError {
    fn from(err: FamilyError) -> Self {
        match err {
            FamilyError::Io(e) => FamilyWriterError::Io(e),
            other => FamilyWriterError::Family(other),
        }
    }
}

impl std::fmt::Display for FamilyWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FamilyWriterError::Io(e) => write!(f, "IO error: {}", e),
            FamilyWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            FamilyWriterError::Database(e) => write!(f, "Database error: {}", e),
            FamilyWriterError::Family(e) => write!(f, "Family error: {}", e),
        }
    }
}

impl std::error::Error for FamilyWriterError {}

/// Backend trait for writing families
#[async_trait]
pub trait FamilyWriterBackend: Send {
    /// Write every detection of one family
    async fn write_family(&mut self, family: &Family) -> Result<(), FamilyWriterError>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> Result<(), FamilyWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
