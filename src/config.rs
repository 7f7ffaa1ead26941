//! Runtime configuration from environment variables

use crate::family_core::codec::TextEncoding;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Detection-record files, readable back into families
    Text,
    /// One-way SQLite catalog export
    Sqlite,
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "csv" => Ok(BackendType::Text),
            "sqlite" => Ok(BackendType::Sqlite),
            _ => Err(format!("Unknown backend '{}'", s)),
        }
    }
}

/// Configuration for merging and exporting families
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct FamilyConfig {
    pub backend: BackendType,

    /// Directory for detection-record files
    pub output_path: PathBuf,

    /// SQLite database file for the catalog export
    pub db_path: PathBuf,

    /// Encoding of detection-record files, read and write
    pub encoding: TextEncoding,

    /// Estimate an origin when regenerating events on read
    pub estimate_origin: bool,

    pub deduplicate: bool,
    pub sort: bool,
}

impl FamilyConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FAMILY_BACKEND` (default: text)
    /// - `FAMILY_OUTPUT_PATH` (default: families)
    /// - `FAMILY_DB_PATH` (default: data/families.db)
    /// - `FAMILY_ENCODING` (default: utf8)
    /// - `FAMILY_ESTIMATE_ORIGIN` (default: true)
    /// - `FAMILY_DEDUPLICATE` (default: true)
    /// - `FAMILY_SORT` (default: true)
    pub fn from_env() -> Self {
        let backend = match env::var("FAMILY_BACKEND") {
            Ok(s) => s.parse::<BackendType>().unwrap_or_else(|e| {
                log::warn!("Invalid FAMILY_BACKEND: {}, defaulting to text", e);
                BackendType::Text
            }),
            Err(_) => BackendType::Text,
        };

        let encoding = match env::var("FAMILY_ENCODING") {
            Ok(s) => s.parse::<TextEncoding>().unwrap_or_else(|e| {
                log::warn!("Invalid FAMILY_ENCODING: {}, defaulting to utf8", e);
                TextEncoding::Utf8
            }),
            Err(_) => TextEncoding::Utf8,
        };

        Self {
            backend,

            output_path: env::var("FAMILY_OUTPUT_PATH")
                .unwrap_or_else(|_| "families".to_string())
                .into(),

            db_path: env::var("FAMILY_DB_PATH")
                .unwrap_or_else(|_| "data/families.db".to_string())
                .into(),

            encoding,

            estimate_origin: env::var("FAMILY_ESTIMATE_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),

            deduplicate: env::var("FAMILY_DEDUPLICATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),

            sort: env::var("FAMILY_SORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        }
    }

    /// Where the configured backend writes to
    pub fn output_target(&self) -> PathBuf {
        match self.backend {
            BackendType::Text => self.output_path.clone(),
            BackendType::Sqlite => self.db_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "FAMILY_BACKEND",
        "FAMILY_OUTPUT_PATH",
        "FAMILY_DB_PATH",
        "FAMILY_ENCODING",
        "FAMILY_ESTIMATE_ORIGIN",
        "FAMILY_DEDUPLICATE",
        "FAMILY_SORT",
    ];

    // Single test so the env var changes do not race each other
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = FamilyConfig::from_env();
        assert_eq!(config.backend, BackendType::Text);
        assert_eq!(config.output_path, PathBuf::from("families"));
        assert_eq!(config.db_path, PathBuf::from("data/families.db"));
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert!(config.estimate_origin);
        assert!(config.deduplicate);
        assert!(config.sort);
        assert_eq!(config.output_target(), PathBuf::from("families"));

        env::set_var("FAMILY_BACKEND", "sqlite");
        env::set_var("FAMILY_DB_PATH", "/tmp/test_families.db");
        env::set_var("FAMILY_ENCODING", "latin-1");
        env::set_var("FAMILY_DEDUPLICATE", "false");

        let config = FamilyConfig::from_env();
        assert_eq!(config.backend, BackendType::Sqlite);
        assert_eq!(config.encoding, TextEncoding::Latin1);
        assert!(!config.deduplicate);
        assert_eq!(config.output_target(), PathBuf::from("/tmp/test_families.db"));

        env::set_var("FAMILY_BACKEND", "parquet");
        assert_eq!(FamilyConfig::from_env().backend, BackendType::Text);

        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("SQLite".parse::<BackendType>(), Ok(BackendType::Sqlite));
        assert_eq!("csv".parse::<BackendType>(), Ok(BackendType::Text));
        assert!("tar".parse::<BackendType>().is_err());
    }
}
