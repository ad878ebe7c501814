use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use crate::classify::{ClassifiedEntry, PathClassifier, Rejection};
use crate::config::Config;
use crate::index::{build_url, section_count, Document, IndexTree};
use crate::probe::{DurationProbe, FfprobeProber};
use crate::scan::discover_files;
use crate::{IndexError, Result};

/// Counters for one scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub files_seen: usize,
    pub sections_indexed: usize,
    pub non_video_skipped: usize,
    pub unrecognized: usize,
    pub probe_failures: usize,
    pub elapsed: Duration,
}

/// Finished index plus what it took to build it
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub document: Document,
    pub stats: ScanStats,
}

/// A classified file waiting for its duration
#[derive(Debug)]
struct PendingEntry {
    classified: ClassifiedEntry,
    path: PathBuf,
    url: String,
}

/// Drives scan → classify → probe → aggregate → finalize for one root
pub struct IndexBuilder {
    config: Config,
    classifier: PathClassifier,
    prober: Option<Arc<dyn DurationProbe>>,
    max_concurrent: usize,
}

impl IndexBuilder {
    /// Builder whose prober follows `config.probe`
    pub fn new(config: Config) -> Self {
        let prober: Option<Arc<dyn DurationProbe>> = if config.probe.enabled {
            Some(Arc::new(FfprobeProber::new(
                config.probe.program.clone(),
                Duration::from_secs(config.probe.timeout_seconds),
            )))
        } else {
            None
        };

        Self::with_prober(config, prober)
    }

    /// Builder with an explicit prober; `None` indexes every video with duration 0
    pub fn with_prober(config: Config, prober: Option<Arc<dyn DurationProbe>>) -> Self {
        let classifier = PathClassifier::new(
            &config.index.video_extension,
            &config.index.root_course_label,
        );
        let max_concurrent = config.probe.max_workers.max(1);

        info!("🔧 Initializing IndexBuilder with {} probe workers", max_concurrent);

        Self {
            config,
            classifier,
            prober,
            max_concurrent,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Index every lecture video under `root`
    pub async fn build_index(&self, root: &Path) -> Result<IndexReport> {
        let start_time = Instant::now();

        if !root.is_dir() {
            return Err(IndexError::InvalidDirectory(root.to_path_buf()));
        }

        let term_title = &self.config.index.term_title;
        // `.` or `term2/cs101/..` must still name the real directory
        let resolved_root = std::fs::canonicalize(root)?;
        let term_folder = self.config.index.term_folder_for(&resolved_root);
        let mut stats = ScanStats::default();

        info!("🔍 Scanning {} (term folder '{}')", root.display(), term_folder);
        let files = discover_files(root)?;
        stats.files_seen = files.len();

        let mut pending = Vec::new();
        for file in files {
            match self.classifier.classify(&file.relative_dir, &file.filename) {
                Ok(classified) => {
                    let url = build_url(
                        &self.config.index.base_url_prefix,
                        &term_folder,
                        &file.relative_dir,
                        &file.filename,
                    );
                    pending.push(PendingEntry {
                        classified,
                        path: file.path,
                        url,
                    });
                }
                Err(Rejection::NotAVideo) => {
                    debug!("Skipping non-video file: {}", file.path.display());
                    stats.non_video_skipped += 1;
                }
                Err(rejection @ Rejection::UnrecognizedName(_)) => {
                    warn!("⚠️ Skipping {}: {}", file.path.display(), rejection);
                    stats.unrecognized += 1;
                }
            }
        }

        info!("📹 Found {} lecture videos", pending.len());

        let durations = match self.prober {
            Some(ref prober) => {
                let (durations, failures) = self.probe_all(prober, &pending).await?;
                stats.probe_failures = failures;
                durations
            }
            None => vec![0; pending.len()],
        };

        // Insert in traversal order so course order and duplicate order do
        // not depend on which probe finished first.
        let mut tree = IndexTree::new();
        tree.ensure_term(term_title);
        for (entry, duration) in pending.into_iter().zip(durations) {
            tree.insert(term_title, &entry.classified, entry.url, duration);
        }

        let document = tree.finalize();
        stats.sections_indexed = section_count(&document);
        stats.elapsed = start_time.elapsed();

        Ok(IndexReport { document, stats })
    }

    /// Probe all pending entries with bounded concurrency.
    ///
    /// Returns durations in the same order as `pending` and the number of
    /// recoverable failures. A fatal probe error closes the pool and aborts.
    async fn probe_all(
        &self,
        prober: &Arc<dyn DurationProbe>,
        pending: &[PendingEntry],
    ) -> Result<(Vec<u64>, usize)> {
        let (tx, mut rx) = mpsc::channel(self.max_concurrent);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let total = pending.len();

        for (index, entry) in pending.iter().enumerate() {
            let prober = Arc::clone(prober);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let path = entry.path.clone();

            tokio::spawn(async move {
                // Closed after a fatal error; remaining probes are abandoned.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                debug!("⏱️  Probing {}/{}: {}", index + 1, total, path.display());
                let outcome = prober.probe_duration(&path).await;

                // Receiver is gone only when the run already aborted.
                let _ = tx.send((index, outcome)).await;
            });
        }

        // Drop the original sender to close the channel when all tasks complete
        drop(tx);

        let mut durations = vec![0; total];
        let mut received = vec![false; total];
        let mut failures = 0;
        while let Some((index, outcome)) = rx.recv().await {
            received[index] = true;
            match outcome {
                Ok(seconds) => durations[index] = seconds,
                Err(e) if e.is_fatal() => {
                    error!("❌ {}", e);
                    semaphore.close();
                    return Err(e);
                }
                Err(e) => {
                    warn!("⚠️ {}; indexing with duration 0", e);
                    failures += 1;
                }
            }
        }

        // A task that panicked dropped its sender without reporting
        for (entry, _) in pending.iter().zip(&received).filter(|(_, done)| !**done) {
            warn!(
                "⚠️ Probe task for {} ended without a result; indexing with duration 0",
                entry.path.display()
            );
            failures += 1;
        }

        Ok((durations, failures))
    }

    /// Serialize a document using the configured indentation
    pub fn render_document(&self, document: &Document) -> Result<Vec<u8>> {
        render_document(document, self.config.output.indent)
    }

    /// Write a document to `path`, creating parent directories as needed
    pub async fn write_document(&self, document: &Document, path: &Path) -> Result<()> {
        let json_data = self.render_document(document)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json_data).await?;

        info!("💾 Index saved to: {}", path.display());
        Ok(())
    }
}

/// Pretty JSON with `indent` spaces per level; non-ASCII text is kept as-is
pub fn render_document(document: &Document, indent: usize) -> Result<Vec<u8>> {
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);

    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut serializer)?;
    buf.push(b'\n');

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CourseNode, Entry, TermNode, WeekNode};

    fn sample_document() -> Document {
        vec![TermNode {
            title: "第2学期".to_string(),
            courses: vec![CourseNode {
                title: "课程：final".to_string(),
                weeks: vec![WeekNode {
                    title: "第1周".to_string(),
                    sections: vec![Entry {
                        title: "第1小节".to_string(),
                        url: "https://x.test/term2/final/final-w1c1.mp4".to_string(),
                        duration_seconds: 61,
                    }],
                }],
            }],
        }]
    }

    #[test]
    fn test_render_uses_indent_and_keeps_unicode() {
        let bytes = render_document(&sample_document(), 4).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("[\n    {\n        \"title\": \"第2学期\""));
        assert!(text.contains("\"duration\": 61"));
        assert!(!text.contains("\\u"));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn test_render_round_trips() {
        let document = sample_document();
        let bytes = render_document(&document, 2).unwrap();
        let parsed: Document = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, document);
    }

    #[tokio::test]
    async fn test_invalid_root_is_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("file.mp4");
        tokio::fs::write(&file, b"x").await.unwrap();

        let builder = IndexBuilder::with_prober(Config::default(), None);
        let err = builder.build_index(&file).await.unwrap_err();
        assert!(matches!(err, IndexError::InvalidDirectory(_)));
    }
}
