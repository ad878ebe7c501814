//! Lecture index data model, the aggregation tree that builds it, and the
//! finalization pass that turns the tree into ordered output.

use crate::classify::ClassifiedEntry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};
use std::sync::OnceLock;

/// Section title used for week-end summary videos
pub const RECAP_TITLE: &str = "回顾总结";

pub fn course_title(segment: &str) -> String {
    format!("课程：{}", segment)
}

pub fn week_title(week: u32) -> String {
    format!("第{}周", week)
}

pub fn section_title(section: u32) -> String {
    format!("第{}小节", section)
}

/// Build the playback URL for a file.
///
/// `prefix + term_folder + "/" + <relative dir> + "/" + filename`, with the
/// relative directory joined by `/` on every platform.
pub fn build_url(prefix: &str, term_folder: &str, relative_dir: &Path, filename: &str) -> String {
    let mut url = String::with_capacity(prefix.len() + term_folder.len() + filename.len() + 32);
    url.push_str(prefix);
    if !prefix.is_empty() && !prefix.ends_with('/') {
        url.push('/');
    }
    url.push_str(term_folder);

    for component in relative_dir.components() {
        if let Component::Normal(name) = component {
            url.push('/');
            url.push_str(&name.to_string_lossy());
        }
    }

    url.push('/');
    url.push_str(filename);
    url
}

/// A single playable video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub url: String,
    /// Whole seconds; 0 when probing failed or was skipped
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekNode {
    pub title: String,
    pub sections: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseNode {
    pub title: String,
    pub weeks: Vec<WeekNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermNode {
    pub title: String,
    pub courses: Vec<CourseNode>,
}

/// Root of the emitted JSON
pub type Document = Vec<TermNode>;

/// Total number of sections across a document
pub fn section_count(document: &[TermNode]) -> usize {
    document
        .iter()
        .flat_map(|t| &t.courses)
        .flat_map(|c| &c.weeks)
        .map(|w| w.sections.len())
        .sum()
}

#[derive(Debug)]
struct CourseBuilder {
    title: String,
    weeks: BTreeMap<u32, WeekNode>,
}

impl CourseBuilder {
    fn week_mut(&mut self, week: u32) -> &mut WeekNode {
        self.weeks.entry(week).or_insert_with(|| WeekNode {
            title: week_title(week),
            sections: Vec::new(),
        })
    }
}

#[derive(Debug)]
struct TermBuilder {
    title: String,
    courses: Vec<CourseBuilder>,
    course_lookup: HashMap<String, usize>,
}

impl TermBuilder {
    fn course_mut(&mut self, segment: &str) -> &mut CourseBuilder {
        let index = match self.course_lookup.get(segment) {
            Some(&index) => index,
            None => {
                self.courses.push(CourseBuilder {
                    title: course_title(segment),
                    weeks: BTreeMap::new(),
                });
                self.course_lookup.insert(segment.to_string(), self.courses.len() - 1);
                self.courses.len() - 1
            }
        };
        &mut self.courses[index]
    }
}

/// Mutable term → course → week tree filled during a scan.
///
/// Every level is ensure-or-create: inserting under an existing key merges
/// into the existing node, and only section lists ever grow. Terms and
/// courses remember first-encounter order; weeks are keyed numerically.
#[derive(Debug, Default)]
pub struct IndexTree {
    terms: Vec<TermBuilder>,
    term_lookup: HashMap<String, usize>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a term exists even if no entry is ever inserted into it
    pub fn ensure_term(&mut self, term_title: &str) {
        self.term_mut(term_title);
    }

    fn term_mut(&mut self, term_title: &str) -> &mut TermBuilder {
        let index = match self.term_lookup.get(term_title) {
            Some(&index) => index,
            None => {
                self.terms.push(TermBuilder {
                    title: term_title.to_string(),
                    courses: Vec::new(),
                    course_lookup: HashMap::new(),
                });
                self.term_lookup.insert(term_title.to_string(), self.terms.len() - 1);
                self.terms.len() - 1
            }
        };
        &mut self.terms[index]
    }

    /// Append one classified video under its term, course and week
    pub fn insert(&mut self, term_title: &str, entry: &ClassifiedEntry, url: String, duration_seconds: u64) {
        self.term_mut(term_title)
            .course_mut(entry.course_segment())
            .week_mut(entry.week())
            .sections
            .push(Entry {
                title: entry.section_title(),
                url,
                duration_seconds,
            });
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.iter().all(|t| t.courses.is_empty())
    }

    /// Sort and flatten into the output document
    pub fn finalize(self) -> Document {
        self.terms
            .into_iter()
            .map(|term| TermNode {
                title: term.title,
                courses: term
                    .courses
                    .into_iter()
                    .map(|course| CourseNode {
                        title: course.title,
                        weeks: course
                            .weeks
                            .into_values()
                            .map(|mut week| {
                                // sort_by_cached_key is stable
                                week.sections.sort_by_cached_key(|e| SectionRank::of(&e.title));
                                week
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Ordering key for sections within a week.
///
/// Numbered sections sort by number, titles without a number sort after them
/// by text, and the recap always sorts last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionRank {
    Numbered(u64),
    Named(String),
    Recap,
}

impl SectionRank {
    pub fn of(title: &str) -> Self {
        if title.contains(RECAP_TITLE) {
            return SectionRank::Recap;
        }

        static NUMBER: OnceLock<Regex> = OnceLock::new();
        let number = NUMBER.get_or_init(|| Regex::new(r"第(\d+)小节").expect("section number pattern compiles"));

        number
            .captures(title)
            .and_then(|caps| caps[1].parse().ok())
            .map(SectionRank::Numbered)
            .unwrap_or_else(|| SectionRank::Named(title.to_string()))
    }
}
