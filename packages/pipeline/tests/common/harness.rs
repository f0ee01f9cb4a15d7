//! Test harness: a pipeline rooted in a temporary directory with mock services.

use std::path::PathBuf;
use std::time::Duration;

use pipeline_core::kernel::test_dependencies::TestDependencies;
use pipeline_core::{Catalogs, Pipeline, Settings};
use tempfile::TempDir;

pub struct TestHarness {
    // Keep the directory alive for the whole test
    _dir: TempDir,
    pub settings: Settings,
    pub deps: TestDependencies,
}

impl TestHarness {
    pub fn new(deps: TestDependencies) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let settings = Settings {
            data_dir: dir.path().join("data"),
            site_dir: dir.path().join("site"),
            request_delay: Duration::ZERO,
            ..Settings::default()
        };

        Self {
            _dir: dir,
            settings,
            deps,
        }
    }

    pub fn pipeline(&self, catalogs: Catalogs) -> Pipeline {
        Pipeline::new(self.settings.clone(), catalogs, self.deps.deps())
    }

    pub fn site_file(&self, relative: &str) -> PathBuf {
        self.settings.site_dir.join(relative)
    }
}
