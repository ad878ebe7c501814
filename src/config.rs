use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the lecture indexer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hierarchy and URL settings
    pub index: IndexConfig,

    /// Duration probing settings
    pub probe: ProbeConfig,

    /// Output file settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Prefix prepended to every playback URL
    pub base_url_prefix: String,

    /// Title of the single term produced per run
    pub term_title: String,

    /// Folder name used for the term in URLs (defaults to the scan root's name)
    pub term_folder: Option<String>,

    /// Extension of the video files being indexed, without the dot
    pub video_extension: String,

    /// Course label for videos sitting directly in the scan root
    pub root_course_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Probe durations at all; when false every duration is 0
    pub enabled: bool,

    /// ffprobe executable name or path
    pub program: PathBuf,

    /// Upper bound for a single probe (seconds)
    pub timeout_seconds: u64,

    /// Maximum number of concurrent probes
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the JSON index is written
    pub path: PathBuf,

    /// Spaces per indentation level
    pub indent: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url_prefix: "https://videos.yourdomain.com/file/mytutorial/".to_string(),
            term_title: "第2学期".to_string(),
            term_folder: None,
            video_extension: "mp4".to_string(),
            root_course_label: "未分类".to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: PathBuf::from("ffprobe"),
            timeout_seconds: 30,
            max_workers: num_cpus::get().min(8), // Use available cores, max 8
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("videos_index.json"),
            indent: 4,
        }
    }
}

impl IndexConfig {
    /// Resolve the term folder name for a scan root.
    ///
    /// An explicit `term_folder` wins; otherwise the last component of the
    /// root is used, so `Z:\term2\` and `/mnt/term2` both give `term2`.
    pub fn term_folder_for(&self, root: &Path) -> String {
        if let Some(ref folder) = self.term_folder {
            return folder.clone();
        }

        root.components()
            .filter_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }
}

impl Config {
    /// Load configuration from the first config file found
    pub fn load() -> Result<Self> {
        let config_paths = ["lecture-index.toml", "config/lecture-index.toml"];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::from_file(Path::new(path)) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {}", path, e),
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from an explicit TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Apply `LECTURE_INDEX_*` environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Overlay environment variables onto an existing configuration
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("LECTURE_INDEX_BASE_URL") {
            self.index.base_url_prefix = url;
        }

        if let Ok(title) = std::env::var("LECTURE_INDEX_TERM_TITLE") {
            self.index.term_title = title;
        }

        if let Ok(folder) = std::env::var("LECTURE_INDEX_TERM_FOLDER") {
            self.index.term_folder = Some(folder);
        }

        if let Ok(workers) = std::env::var("LECTURE_INDEX_WORKERS") {
            self.probe.max_workers = workers.parse().unwrap_or(self.probe.max_workers);
        }

        if let Ok(timeout) = std::env::var("LECTURE_INDEX_PROBE_TIMEOUT") {
            self.probe.timeout_seconds = timeout.parse().unwrap_or(self.probe.timeout_seconds);
        }

        if let Ok(output) = std::env::var("LECTURE_INDEX_OUTPUT") {
            self.output.path = PathBuf::from(output);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.index.base_url_prefix)
            .map_err(|e| anyhow!("base_url_prefix is not a valid URL: {}", e))?;

        let extension = self.index.video_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(anyhow!("video_extension must not be empty"));
        }

        if self.index.term_title.trim().is_empty() {
            return Err(anyhow!("term_title must not be empty"));
        }

        if self.probe.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if self.probe.timeout_seconds == 0 {
            return Err(anyhow!("timeout_seconds must be greater than 0"));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Lecture Indexer Configuration:\n\
            - Term: {}\n\
            - Base URL: {}\n\
            - Video Extension: .{}\n\
            - Probing: {} ({}, {}s timeout, {} workers)\n\
            - Output: {}",
            self.index.term_title,
            self.index.base_url_prefix,
            self.index.video_extension.trim_start_matches('.'),
            if self.probe.enabled { "enabled" } else { "disabled" },
            self.probe.program.display(),
            self.probe.timeout_seconds,
            self.probe.max_workers,
            self.output.path.display(),
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.index.base_url_prefix = url.into();
        self
    }

    pub fn with_term_title(mut self, title: impl Into<String>) -> Self {
        self.config.index.term_title = title.into();
        self
    }

    pub fn with_term_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.index.term_folder = Some(folder.into());
        self
    }

    pub fn with_video_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.index.video_extension = extension.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.probe.max_workers = workers;
        self
    }

    pub fn with_probe_timeout(mut self, seconds: u64) -> Self {
        self.config.probe.timeout_seconds = seconds;
        self
    }

    pub fn with_probe_program(mut self, program: PathBuf) -> Self {
        self.config.probe.program = program;
        self
    }

    pub fn enable_probing(mut self, enable: bool) -> Self {
        self.config.probe.enabled = enable;
        self
    }

    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.config.output.path = path;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.index.video_extension, "mp4");
        assert_eq!(config.output.path, PathBuf::from("videos_index.json"));
        assert_eq!(config.output.indent, 4);
        assert!(config.probe.enabled);
        assert!(config.probe.max_workers >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_workers(2)
            .with_term_title("第1学期")
            .with_probe_timeout(5)
            .enable_probing(false)
            .build();

        assert_eq!(config.probe.max_workers, 2);
        assert_eq!(config.index.term_title, "第1学期");
        assert_eq!(config.probe.timeout_seconds, 5);
        assert!(!config.probe.enabled);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let bad_url = ConfigBuilder::new().with_base_url("not a url").build();
        assert!(bad_url.validate().is_err());

        let no_workers = ConfigBuilder::new().with_workers(0).build();
        assert!(no_workers.validate().is_err());

        let no_extension = ConfigBuilder::new().with_video_extension(".").build();
        assert!(no_extension.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [index]
            term_title = "Spring"

            [probe]
            max_workers = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.index.term_title, "Spring");
        assert_eq!(config.index.video_extension, "mp4");
        assert_eq!(config.probe.max_workers, 3);
        assert_eq!(config.probe.timeout_seconds, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lecture-index.toml");

        let config = ConfigBuilder::new().with_term_folder("term9").build();
        config.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.index.term_folder.as_deref(), Some("term9"));
    }

    #[test]
    fn test_term_folder_from_root() {
        let index = IndexConfig::default();
        assert_eq!(index.term_folder_for(Path::new("/mnt/videos/term2")), "term2");
        assert_eq!(index.term_folder_for(Path::new("/mnt/videos/term2/")), "term2");

        let explicit = IndexConfig {
            term_folder: Some("fall".to_string()),
            ..IndexConfig::default()
        };
        assert_eq!(explicit.term_folder_for(Path::new("/mnt/videos/term2")), "fall");
    }
}
