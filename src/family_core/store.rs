//! Detection-record files: one family per file, one detection per line

use super::codec::{decode_bytes, encode_detection, DecodeContext, TextEncoding};
use super::error::Result;
use super::event::{EventBuilder, EventCatalog};
use super::family::Family;
use super::template::Template;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a detection-record file is read back
pub struct ReadOptions<'a> {
    pub catalog: &'a EventCatalog,
    pub encoding: TextEncoding,
    pub estimate_origin: bool,
    pub builder: Option<&'a dyn EventBuilder>,
}

/// Overwrites `path` with the family's detection records.
///
/// Every record is encoded before the target is touched, and the bytes land in
/// a sibling `.tmp` file that is renamed over `path`. A failed write leaves the
/// previous file intact.
pub fn write_family_file(path: impl AsRef<Path>, family: &Family, encoding: TextEncoding) -> Result<()> {
    let path = path.as_ref();
    let mut buffer = Vec::with_capacity(family.len() * 256);
    for detection in family.detections() {
        let mut line = encode_detection(detection);
        line.push('\n');
        buffer.extend_from_slice(&encoding.encode(&line)?);
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    let written = write_and_sync(&tmp_path, &buffer).and_then(|_| std::fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    log::debug!("Wrote {} detections to {}", family.len(), path.display());
    Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Rebuilds a family from a detection-record file.
///
/// Detections are kept in file order; template names in the file are not
/// checked against `template`.
pub fn read_family_file(
    path: impl AsRef<Path>,
    template: Arc<Template>,
    options: &ReadOptions<'_>,
) -> Result<Family> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let ctx = DecodeContext {
        catalog: options.catalog,
        template: &template,
        estimate_origin: options.estimate_origin,
        builder: options.builder,
    };
    let detections = decode_bytes(&bytes, options.encoding, &ctx)?;
    log::debug!("Read {} detections from {}", detections.len(), path.display());
    Ok(Family::new(template, detections))
}

/// Reads several detection-record files into one family, in argument order.
///
/// Every detection must belong to `template`; the first one that does not
/// aborts the merge with
/// [`TemplateMismatch`](super::error::FamilyError::TemplateMismatch).
pub fn merge_family_files<P: AsRef<Path>>(
    paths: &[P],
    template: Arc<Template>,
    options: &ReadOptions<'_>,
) -> Result<Family> {
    let mut merged = Family::new(template.clone(), Vec::new());
    for path in paths {
        let family = read_family_file(path, template.clone(), options)?;
        log::info!("📖 {} from {}", family, path.as_ref().display());
        for detection in family.into_detections() {
            merged.append(detection)?;
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family_core::detection::{Detection, DetectionKind, ThresholdKind};
    use crate::family_core::error::FamilyError;
    use crate::family_core::event::TemplateEventBuilder;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn create_test_family() -> Family {
        let detections = vec![
            Detection::new(
                "a",
                Utc.timestamp_opt(200, 0).unwrap(),
                8,
                4.2,
                1.2,
                ThresholdKind::Mad,
                8.0,
                DetectionKind::Corr,
            ),
            Detection::new(
                "a",
                Utc.timestamp_opt(0, 123_456_789).unwrap(),
                8,
                0.1 + 0.2,
                1.0 / 3.0,
                ThresholdKind::Absolute,
                std::f64::consts::PI,
                DetectionKind::Corr,
            )
            .with_channels(vec![("FOZ".to_string(), "HHZ".to_string())]),
        ];
        Family::new(Arc::new(Template::new("a")), detections)
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let family = create_test_family();
        write_family_file(&path, &family, TextEncoding::Utf8).unwrap();

        let catalog = EventCatalog::new();
        let options = ReadOptions {
            catalog: &catalog,
            encoding: TextEncoding::Utf8,
            estimate_origin: true,
            builder: Some(&TemplateEventBuilder),
        };
        let read = read_family_file(&path, family.template().clone(), &options).unwrap();

        assert_eq!(read, family);
        assert_eq!(read[1].detection_value.to_bits(), (0.1f64 + 0.2).to_bits());
        assert!(read.iter().all(|d| d.event().is_some()));
    }

    #[test]
    fn test_failed_write_keeps_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let family = create_test_family();
        write_family_file(&path, &family, TextEncoding::Latin1).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut unencodable = family.copy();
        unencodable
            .append(
                Detection::new(
                    "a",
                    Utc.timestamp_opt(400, 0).unwrap(),
                    1,
                    1.0,
                    1.0,
                    ThresholdKind::Mad,
                    8.0,
                    DetectionKind::Corr,
                )
                .with_channels(vec![("日本".to_string(), "HHZ".to_string())]),
            )
            .unwrap();
        assert!(write_family_file(&path, &unencodable, TextEncoding::Latin1).is_err());

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(!dir.path().join("a.csv.tmp").exists());
    }

    #[test]
    fn test_malformed_file_aborts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "template_name: a; detect_time: not-a-time; \n").unwrap();

        let catalog = EventCatalog::new();
        let options = ReadOptions {
            catalog: &catalog,
            encoding: TextEncoding::Utf8,
            estimate_origin: false,
            builder: None,
        };
        let err = read_family_file(&path, Arc::new(Template::new("a")), &options).unwrap_err();
        assert!(matches!(err, FamilyError::MalformedRecord { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let catalog = EventCatalog::new();
        let options = ReadOptions {
            catalog: &catalog,
            encoding: TextEncoding::Utf8,
            estimate_origin: false,
            builder: None,
        };
        let err = read_family_file(dir.path().join("nope.csv"), Arc::new(Template::new("a")), &options)
            .unwrap_err();
        assert!(matches!(err, FamilyError::Io(_)));
    }

    #[test]
    fn test_merge_concatenates_in_order() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let family = create_test_family();
        write_family_file(&first, &family, TextEncoding::Utf8).unwrap();
        write_family_file(&second, &family, TextEncoding::Utf8).unwrap();

        let catalog = EventCatalog::new();
        let options = ReadOptions {
            catalog: &catalog,
            encoding: TextEncoding::Utf8,
            estimate_origin: false,
            builder: None,
        };
        let merged = merge_family_files(&[&first, &second], family.template().clone(), &options).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[2], family[0]);
    }

    #[test]
    fn test_merge_rejects_foreign_detections() {
        let dir = tempdir().unwrap();
        let ours = dir.path().join("a.csv");
        let theirs = dir.path().join("b.csv");
        write_family_file(&ours, &create_test_family(), TextEncoding::Utf8).unwrap();
        let foreign = Family::from_detection(
            Arc::new(Template::new("b")),
            Detection::new(
                "b",
                Utc.timestamp_opt(0, 0).unwrap(),
                3,
                2.0,
                1.0,
                ThresholdKind::Mad,
                8.0,
                DetectionKind::Corr,
            ),
        );
        write_family_file(&theirs, &foreign, TextEncoding::Utf8).unwrap();

        let catalog = EventCatalog::new();
        let options = ReadOptions {
            catalog: &catalog,
            encoding: TextEncoding::Utf8,
            estimate_origin: false,
            builder: None,
        };
        let err = merge_family_files(&[ours, theirs], Arc::new(Template::new("a")), &options)
            .unwrap_err();
        assert!(matches!(err, FamilyError::TemplateMismatch { found, .. } if found == "b"));
    }
}
