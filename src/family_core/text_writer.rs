//! Detection-record writer - one `<template>.csv` file per family
//!
//! This is the only export that can be read back into a [`Family`].

use super::codec::TextEncoding;
use super::family::Family;
use super::store::write_family_file;
use super::writer_backend::{FamilyWriterBackend, FamilyWriterError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct TextFamilyWriter {
    base_path: PathBuf,
    encoding: TextEncoding,
    files_written: usize,
}

impl TextFamilyWriter {
    pub fn new(base_path: PathBuf, encoding: TextEncoding) -> std::io::Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        log::info!("📝 Writing detection records to: {}", base_path.display());
        Ok(Self {
            base_path,
            encoding,
            files_written: 0,
        })
    }

    /// File a family is written to. Spaces and path separators in the
    /// template name become underscores.
    pub fn path_for(&self, family: &Family) -> PathBuf {
        let name: String = family
            .template_name()
            .chars()
            .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.base_path.join(format!("{}.csv", name))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn write_family(&mut self, family: &Family) -> Result<PathBuf, FamilyWriterError> {
        let path = self.path_for(family);
        write_family_file(&path, family, self.encoding)?;
        self.files_written += 1;
        log::debug!("✅ {} written to {}", family, path.display());
        Ok(path)
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }
}

#[async_trait]
impl FamilyWriterBackend for TextFamilyWriter {
    async fn write_family(&mut self, family: &Family) -> Result<(), FamilyWriterError> {
        TextFamilyWriter::write_family(self, family)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), FamilyWriterError> {
        // Each family file is flushed and closed as it is written
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "Text"
    }
}
