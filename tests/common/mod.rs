//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::Path;

use languoid_core::{config::set_content, repo::Repository};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Create an empty repository with the default layout below `temp_dir`.
#[allow(dead_code)]
pub fn create_test_repo(temp_dir: &TempDir) -> Repository {
    Repository::open(temp_dir.path()).unwrap()
}

/// Replace the classification text of `repo`, returning the content for later edits.
#[allow(dead_code)]
pub fn set_lff(repo: &Repository, content: &str) -> String {
    set_content(repo.classification_path(), content.to_string()).unwrap();
    content.to_string()
}

/// Replace the dialects text of `repo`.
#[allow(dead_code)]
pub fn set_dff(repo: &Repository, content: &str) -> String {
    set_content(repo.dialects_path(), content.to_string()).unwrap();
    content.to_string()
}

/// Names of all directories below `root`, in walk order.
#[allow(dead_code)]
pub fn directory_names(root: &Path) -> Vec<String> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}
