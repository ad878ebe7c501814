use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use lecture_indexer::{Config, IndexBuilder, IndexError};
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("lecture-index")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build a JSON index of lecture videos for a web player")
        .arg(
            Arg::new("dir")
                .value_name("DIR")
                .help("Term directory to scan (one sub-folder per course)")
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Where to write the JSON index [default: videos_index.json]")
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
        )
        .arg(
            Arg::new("term-title")
                .long("term-title")
                .value_name("TEXT")
                .help("Title of the term in the index")
        )
        .arg(
            Arg::new("term-folder")
                .long("term-folder")
                .value_name("NAME")
                .help("Term folder used in URLs [default: name of DIR]")
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Prefix for every playback URL")
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Number of concurrent duration probes")
        )
        .arg(
            Arg::new("probe-timeout")
                .long("probe-timeout")
                .value_name("SECONDS")
                .help("Give up on a single probe after this many seconds")
        )
        .arg(
            Arg::new("ffprobe")
                .long("ffprobe")
                .value_name("PATH")
                .help("ffprobe executable to use")
        )
        .arg(
            Arg::new("no-probe")
                .long("no-probe")
                .help("Skip duration probing; every duration is 0")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
        )
        .get_matches();

    // Diagnostics go to stderr; stdout only carries the final summary
    let verbose = matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose))),
        )
        .init();

    let Some(dir) = matches.get_one::<String>("dir") else {
        error!("{}", IndexError::MissingArgument);
        return Err(IndexError::MissingArgument.into());
    };
    let root = PathBuf::from(dir);

    if !root.is_dir() {
        let err = IndexError::InvalidDirectory(root);
        error!("{}", err);
        return Err(err.into());
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            debug!("{}, using defaults", e);
            Config::default()
        }),
    };
    config.apply_env();

    if let Some(output) = matches.get_one::<String>("output") {
        config.output.path = PathBuf::from(output);
    }
    if let Some(title) = matches.get_one::<String>("term-title") {
        config.index.term_title = title.clone();
    }
    if let Some(folder) = matches.get_one::<String>("term-folder") {
        config.index.term_folder = Some(folder.clone());
    }
    if let Some(url) = matches.get_one::<String>("base-url") {
        config.index.base_url_prefix = url.clone();
    }
    if let Some(workers) = matches.get_one::<String>("workers") {
        config.probe.max_workers = workers.parse()?;
    }
    if let Some(timeout) = matches.get_one::<String>("probe-timeout") {
        config.probe.timeout_seconds = timeout.parse()?;
    }
    if let Some(program) = matches.get_one::<String>("ffprobe") {
        config.probe.program = PathBuf::from(program);
    }
    if matches.get_flag("no-probe") {
        config.probe.enabled = false;
    }

    config.validate()?;
    debug!("{}", config.summary());

    info!("🚀 Lecture indexer starting...");
    info!("📁 Input directory: {}", root.display());

    let output_path = config.output.path.clone();
    let builder = IndexBuilder::new(config);
    let report = builder.build_index(&root).await?;
    builder.write_document(&report.document, &output_path).await?;

    let stats = &report.stats;
    info!("🎉 Indexing completed in {:.2}s", stats.elapsed.as_secs_f64());
    info!("📄 Files seen: {}", stats.files_seen);
    info!("⏭️  Non-video files skipped: {}", stats.non_video_skipped);
    info!("❓ Unrecognized names: {}", stats.unrecognized);
    info!("⚠️  Probe failures: {}", stats.probe_failures);

    println!("JSON index written: {}", output_path.display());
    println!("Total sections indexed: {}", stats.sections_indexed);

    Ok(())
}

/// Filter used when `RUST_LOG` is unset: our targets follow `--verbose`,
/// dependencies stay one level quieter
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "lecture_indexer=debug,lecture_index=debug,info"
    } else {
        "lecture_indexer=info,lecture_index=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_dependencies() {
        assert_eq!(default_log_filter(false), "lecture_indexer=info,lecture_index=info,warn");
        assert_eq!(
            default_log_filter(true),
            "lecture_indexer=debug,lecture_index=debug,info"
        );

        for verbose in [false, true] {
            assert!(default_log_filter(verbose).parse::<EnvFilter>().is_ok());
        }
    }
}
