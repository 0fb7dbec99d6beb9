pub mod loader;
mod test_info;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use loader::{get_default_config, load_configuration, write_config_to};
pub use test_info::{TEST_NAME_KEY, TestInfo, TestInfoError};

use crate::cli::PoolArgs;

pub const DEFAULT_CONFIG_PATH: &str = "config/harness.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub log_dir_base: PathBuf,
    pub launcher: LauncherConfig,
    pub test: TestInfo,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_dir_base: PathBuf::from("testLogs"),
            launcher: LauncherConfig::default(),
            test: TestInfo::default(),
        }
    }
}

impl HarnessConfig {
    /// Applies command line overrides for a pool run.
    pub fn apply_pool(&mut self, args: &PoolArgs) {
        if let Some(log_dir) = &args.log_dir {
            self.log_dir_base = log_dir.clone();
        }
        if let Some(test_name) = &args.test_name {
            self.test.set_test_info(TEST_NAME_KEY, test_name);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Launcher executable, resolved against `ORT_PATH` when that is set.
    pub program: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: "orterun".to_string(),
        }
    }
}
