//! Process launch seam for test runs.
//!
//! A [`NodeControl`] hands out one [`CommandList`] per test. The runner
//! accumulates parameters, environment bindings and the executable on it, then
//! starts, confirms and waits on the process. [`LocalNodeControl`] is the
//! implementation used by the binary: it runs the executable under an MPI
//! launcher on the local node.

mod local;

use std::{io, path::Path, path::PathBuf, time::Duration};

use thiserror::Error;

pub use local::{InvocationState, LocalCommandList, LocalNodeControl, STDERR_LOG, STDOUT_LOG, TIMED_OUT_RC};

use crate::env::EnvironmentMap;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("No command was added to the command list")]
    MissingCommand,

    #[error("Process has not been started")]
    NotStarted,

    #[error("Process was already started")]
    AlreadyStarted,

    #[error("Could not prepare log directory {}: {source}", path.display())]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting for process: {0}")]
    Wait(#[source] io::Error),
}

/// Factory for per-test command lists.
pub trait NodeControl {
    type Commands: CommandList;

    /// Opens a command list for `test_name`. Process output goes under
    /// `test_log`; `prefix` is the directory of the launcher, empty to use
    /// `PATH`.
    fn start_cmd_list(&self, test_log: &Path, log_dir_base: &Path, test_name: &str, prefix: &str) -> Self::Commands;
}

/// A single command being assembled, then run.
#[allow(async_fn_in_trait)]
pub trait CommandList {
    fn add_param(&mut self, param: &str);

    fn add_env_vars(&mut self, env: &EnvironmentMap);

    fn add_cmd(&mut self, cmd: &str);

    fn start_process(&mut self) -> Result<(), LaunchError>;

    /// Whether the process was confirmed to be running after
    /// [`start_process`](CommandList::start_process).
    fn check_process(&mut self) -> bool;

    /// Waits up to `timeout` for the process and returns its result code.
    async fn wait_process(&mut self, timeout: Duration) -> Result<i32, LaunchError>;
}
