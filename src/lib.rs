//! Lecture Indexer
//!
//! Builds a term → course → week → section JSON index of lecture videos
//! stored in a folder-per-course layout, with playback URLs and durations.

pub mod classify;
pub mod config;
pub mod error;
pub mod index;
pub mod probe;
pub mod processing;
pub mod scan;

// Re-export main types for easy access
pub use crate::classify::{ClassifiedEntry, FileIdentity, PathClassifier, Rejection, SectionKind};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{IndexError, Result};
pub use crate::index::{CourseNode, Document, Entry, IndexTree, SectionRank, TermNode, WeekNode};
pub use crate::probe::{DurationProbe, FfprobeProber};
pub use crate::processing::{IndexBuilder, IndexReport, ScanStats};
pub use crate::scan::{discover_files, DiscoveredFile};
