use crate::{IndexError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

/// Reports the playback length of a media file
///
/// Implementations return whole seconds. Per-file problems come back as
/// `ProbeFailure`/`ProbeTimeout`; a probe that cannot run at all returns
/// `MissingProbeUtility`, which callers treat as fatal.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe_duration(&self, path: &Path) -> Result<u64>;
}

/// Container-level duration via the `ffprobe` command line tool
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(30))
    }
}

#[async_trait]
impl DurationProbe for FfprobeProber {
    async fn probe_duration(&self, path: &Path) -> Result<u64> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args([
            "-v", "error",
            "-print_format", "json",
            "-show_entries", "format=duration",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
                ) =>
            {
                return Err(IndexError::MissingProbeUtility(self.program.display().to_string()));
            }
            Ok(Err(e)) => {
                return Err(IndexError::ProbeFailure {
                    path: path.to_path_buf(),
                    reason: format!("failed to run {}: {}", self.program.display(), e),
                });
            }
            Err(_) => {
                return Err(IndexError::ProbeTimeout {
                    path: path.to_path_buf(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IndexError::ProbeFailure {
                path: path.to_path_buf(),
                reason: format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let seconds = parse_duration_seconds(&output.stdout).ok_or_else(|| IndexError::ProbeFailure {
            path: path.to_path_buf(),
            reason: "no container duration reported".to_string(),
        })?;

        debug!("⏱️  {} is {}s", path.display(), seconds);
        Ok(seconds)
    }
}

/// Read `format.duration` out of ffprobe JSON and round to whole seconds
pub fn parse_duration_seconds(stdout: &[u8]) -> Option<u64> {
    let ffprobe_data: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    let duration = &ffprobe_data["format"]["duration"];

    let seconds: f64 = match duration {
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    Some(seconds.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rounds_to_nearest_second() {
        let json = br#"{"format": {"duration": "119.500000"}}"#;
        assert_eq!(parse_duration_seconds(json), Some(120));

        let json = br#"{"format": {"duration": "89.49"}}"#;
        assert_eq!(parse_duration_seconds(json), Some(89));

        let json = br#"{"format": {"duration": 300}}"#;
        assert_eq!(parse_duration_seconds(json), Some(300));
    }

    #[test]
    fn test_parse_rejects_missing_or_bad_duration() {
        assert_eq!(parse_duration_seconds(br#"{"format": {}}"#), None);
        assert_eq!(parse_duration_seconds(br#"{"format": {"duration": "N/A"}}"#), None);
        assert_eq!(parse_duration_seconds(br#"{"format": {"duration": "-3.0"}}"#), None);
        assert_eq!(parse_duration_seconds(b"not json"), None);
        assert_eq!(parse_duration_seconds(b""), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_fatal() {
        let prober = FfprobeProber::new("/nonexistent/dir/ffprobe-missing", Duration::from_secs(5));
        let err = prober.probe_duration(Path::new("video.mp4")).await.unwrap_err();

        assert!(matches!(err, IndexError::MissingProbeUtility(_)));
        assert!(err.is_fatal());
    }

    #[cfg(unix)]
    fn write_program(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        {
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(body.as_bytes()).unwrap();
            file.sync_all().unwrap();
        }
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_executable_program_is_fatal() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let program = write_program(temp_dir.path(), "ffprobe", "#!/bin/sh\nexit 0\n", 0o644);

        let prober = FfprobeProber::new(program, Duration::from_secs(5));
        let err = prober.probe_duration(Path::new("video.mp4")).await.unwrap_err();

        assert!(matches!(err, IndexError::MissingProbeUtility(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_times_out() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let program = write_program(temp_dir.path(), "slow-ffprobe", "#!/bin/sh\nsleep 10\n", 0o755);

        let prober = FfprobeProber::new(program, Duration::from_secs(1));
        let start = std::time::Instant::now();
        let err = prober.probe_duration(Path::new("video.mp4")).await.unwrap_err();

        assert!(matches!(err, IndexError::ProbeTimeout { seconds: 1, .. }));
        assert!(!err.is_fatal());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reported_duration_is_rounded() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let program = write_program(
            temp_dir.path(),
            "fake-ffprobe",
            "#!/bin/sh\necho '{\"format\": {\"duration\": \"89.6\"}}'\n",
            0o755,
        );

        let prober = FfprobeProber::new(program, Duration::from_secs(5));
        assert_eq!(prober.probe_duration(Path::new("video.mp4")).await.unwrap(), 90);
    }
}
