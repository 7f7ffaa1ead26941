//! Unified writer interface for families
//!
//! Routes writes to either the detection-record or SQLite backend based on configuration.

use super::codec::TextEncoding;
use super::family::Family;
use super::sqlite_writer::SqliteFamilyWriter;
use super::text_writer::TextFamilyWriter;
use super::writer_backend::{FamilyWriterBackend, FamilyWriterError};
use crate::config::BackendType;
use std::path::PathBuf;

/// Unified writer that routes to either the text or SQLite backend
pub enum FamilyWriter {
    Text(TextFamilyWriter),
    Sqlite(SqliteFamilyWriter),
}

impl FamilyWriter {
    /// `path` is a directory for the text backend and a database file for SQLite
    pub fn new(backend: BackendType, path: PathBuf, encoding: TextEncoding) -> Result<Self, FamilyWriterError> {
        match backend {
            BackendType::Text => {
                let writer = TextFamilyWriter::new(path, encoding)?;
                Ok(FamilyWriter::Text(writer))
            }
            BackendType::Sqlite => {
                let writer = SqliteFamilyWriter::new(path)?;
                Ok(FamilyWriter::Sqlite(writer))
            }
        }
    }

    pub async fn write_family(&mut self, family: &Family) -> Result<(), FamilyWriterError> {
        match self {
            FamilyWriter::Text(w) => {
                w.write_family(family)?;
                Ok(())
            }
            FamilyWriter::Sqlite(w) => w.write_family(family).await,
        }
    }

    pub async fn flush(&mut self) -> Result<(), FamilyWriterError> {
        match self {
            FamilyWriter::Text(w) => w.flush().await,
            FamilyWriter::Sqlite(w) => w.flush().await,
        }
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            FamilyWriter::Text(w) => w.backend_type(),
            FamilyWriter::Sqlite(w) => w.backend_type(),
        }
    }

    /// Only the text backend can be read back into families
    pub fn is_round_trip(&self) -> bool {
        matches!(self, FamilyWriter::Text(_))
    }
}
