//! Filename classification: decides whether a file is an indexable lecture
//! video and where it belongs in the term/course/week/section hierarchy.

use crate::index::{course_title, section_title, week_title, RECAP_TITLE};
use regex::{Captures, Regex};
use std::path::{Component, Path};
use tracing::debug;

/// Which kind of section a video is within its week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// A numbered lecture section (`-w<week>c<n>`)
    Numbered(u32),
    /// The week-end summary video (`-w<week>recap`)
    Recap,
}

/// Hierarchy position extracted from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub week: u32,
    pub kind: SectionKind,
    pub course_segment: String,
}

/// A file accepted by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    pub identity: FileIdentity,
    pub filename: String,
    /// Name of the rule that matched
    pub rule: &'static str,
}

impl ClassifiedEntry {
    pub fn week(&self) -> u32 {
        self.identity.week
    }

    pub fn course_segment(&self) -> &str {
        &self.identity.course_segment
    }

    pub fn course_title(&self) -> String {
        course_title(&self.identity.course_segment)
    }

    pub fn week_title(&self) -> String {
        week_title(self.identity.week)
    }

    pub fn section_title(&self) -> String {
        match self.identity.kind {
            SectionKind::Numbered(n) => section_title(n),
            SectionKind::Recap => RECAP_TITLE.to_string(),
        }
    }
}

/// Why a file was not turned into an entry
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("not a video file")]
    NotAVideo,

    #[error("unrecognized lecture filename: {0}")]
    UnrecognizedName(String),
}

type Extractor = fn(&Captures) -> Option<(u32, SectionKind)>;

/// One filename pattern plus how to read the week and section out of it
struct NameRule {
    name: &'static str,
    pattern: Regex,
    extract: Extractor,
}

impl NameRule {
    fn apply(&self, filename: &str) -> Option<(u32, SectionKind)> {
        self.pattern
            .captures(filename)
            .and_then(|caps| (self.extract)(&caps))
    }
}

fn extract_section(caps: &Captures) -> Option<(u32, SectionKind)> {
    let week = caps.name("week")?.as_str().parse().ok()?;
    let section = caps.name("section")?.as_str().parse().ok()?;
    Some((week, SectionKind::Numbered(section)))
}

fn extract_recap(caps: &Captures) -> Option<(u32, SectionKind)> {
    let week = caps.name("week")?.as_str().parse().ok()?;
    Some((week, SectionKind::Recap))
}

/// Classifies `(relative_dir, filename)` pairs against an ordered rule list.
///
/// Rules are tried most specific first and the first match wins. The prefix
/// before the week token is matched greedily so course names may themselves
/// contain `-`.
pub struct PathClassifier {
    extension: String,
    root_course_label: String,
    rules: Vec<NameRule>,
}

impl PathClassifier {
    pub fn new(video_extension: &str, root_course_label: &str) -> Self {
        let extension = video_extension.trim_start_matches('.').to_lowercase();
        let ext = regex::escape(&extension);

        // The extension is escaped and the templates are fixed, so these
        // always compile.
        let rules = vec![
            NameRule {
                name: "section",
                pattern: Regex::new(&format!(
                    r"(?i)^.+-w(?P<week>\d+)c(?P<section>\d+)\.{ext}$"
                ))
                .expect("section pattern compiles"),
                extract: extract_section,
            },
            NameRule {
                name: "recap",
                pattern: Regex::new(&format!(r"(?i)^.+-w(?P<week>\d+)recap\.{ext}$"))
                    .expect("recap pattern compiles"),
                extract: extract_recap,
            },
        ];

        Self {
            extension,
            root_course_label: root_course_label.to_string(),
            rules,
        }
    }

    /// Names of the rules in priority order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// Check the extension against the indexed video extension
    pub fn is_video(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    /// First path component of `relative_dir`, or the root label for files
    /// sitting directly in the scan root
    pub fn course_segment(&self, relative_dir: &Path) -> String {
        relative_dir
            .components()
            .find_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .unwrap_or_else(|| self.root_course_label.clone())
    }

    pub fn classify(
        &self,
        relative_dir: &Path,
        filename: &str,
    ) -> Result<ClassifiedEntry, Rejection> {
        if !self.is_video(filename) {
            return Err(Rejection::NotAVideo);
        }

        for rule in &self.rules {
            if let Some((week, kind)) = rule.apply(filename) {
                debug!("{} matched rule '{}' (week {}, {:?})", filename, rule.name, week, kind);
                return Ok(ClassifiedEntry {
                    identity: FileIdentity {
                        week,
                        kind,
                        course_segment: self.course_segment(relative_dir),
                    },
                    filename: filename.to_string(),
                    rule: rule.name,
                });
            }
        }

        Err(Rejection::UnrecognizedName(filename.to_string()))
    }
}
