//! Runs in its own binary because it changes the process working directory.

use lecture_indexer::{ConfigBuilder, IndexBuilder};
use std::path::Path;
use tempfile::TempDir;

#[tokio::test]
async fn test_dot_root_uses_real_directory_name() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("term2");
    let course = root.join("cs101");
    std::fs::create_dir_all(&course).unwrap();
    std::fs::write(course.join("cs101-w2c1.mp4"), b"mock video").unwrap();

    std::env::set_current_dir(&root).unwrap();

    let config = ConfigBuilder::new()
        .with_base_url("https://videos.example.com/file/lectures/")
        .build();
    let report = IndexBuilder::with_prober(config, None)
        .build_index(Path::new("."))
        .await
        .unwrap();

    let section = &report.document[0].courses[0].weeks[0].sections[0];
    assert_eq!(
        section.url,
        "https://videos.example.com/file/lectures/term2/cs101/cs101-w2c1.mp4"
    );
}
