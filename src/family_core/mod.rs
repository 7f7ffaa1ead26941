//! Family Core - Detection Families for Matched-Filter Template Matching
//!
//! A family groups every detection one template produced, keeps an event
//! summary aligned with those detections, and persists them as
//! detection-record files that can be read back bit-exactly.
//!
//! # Architecture
//!
//! ```text
//! Template (shared, immutable) + Detections
//!     ↓
//! Family (append / combine / sort / deduplicate)
//!     ↓
//! Event summary (attached events, or regenerated from the template)
//!     ↓
//! FamilyWriter → detection-record files or SQLite export
//!     ↓
//! read_family_file (decode records, resolve events from a catalog)
//! ```

pub mod codec;
pub mod collaborators;
pub mod detection;
pub mod error;
pub mod event;
pub mod family;
pub mod literal;
pub mod store;
pub mod template;
pub mod writer_backend;
pub mod text_writer;
pub mod sqlite_writer;
pub mod writer;

pub use codec::{DecodeContext, TextEncoding};
pub use collaborators::{DetectionPlotter, LagCalcParams, PickAligner};
pub use detection::{ChannelId, Detection, DetectionKind, ThresholdKind};
pub use error::{FamilyError, Result};
pub use event::{DerivedEvent, EventBuilder, EventCatalog, Origin, Pick, TemplateEventBuilder};
pub use family::{Family, FamilyMember};
pub use store::{merge_family_files, read_family_file, write_family_file, ReadOptions};
pub use template::{Template, TemplatePick};
pub use writer_backend::{FamilyWriterBackend, FamilyWriterError};
pub use text_writer::TextFamilyWriter;
pub use sqlite_writer::SqliteFamilyWriter;
pub use writer::FamilyWriter;
