//! Pool test driver for the `daos_test` suite.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    config::{TestInfo, TestInfoError},
    env::{DAOS_TEST_ENV, EnvResolver, EnvironmentMap, ORT_PATH},
    launcher::{CommandList, LaunchError, NodeControl},
    log::SessionLog,
};

/// Launcher parameters for a single-process run rendezvousing through `/tmp/urifile`.
pub const POOL_TEST_PARAMETERS: &str = "--np 1 --ompi-server file:/tmp/urifile ";

pub const DAOS_TEST_CMD: &str = "daos_test";

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(1000);

/// Result code when the process could not be confirmed running.
pub const NOT_CONFIRMED_RC: i32 = 1;

/// What a run needs to know about its test: the name, where logs go and where
/// environment defaults come from.
#[derive(Clone)]
pub struct TestContext {
    test_name: String,
    log_dir_base: PathBuf,
    resolver: Arc<dyn EnvResolver>,
}

impl TestContext {
    pub fn new(test_name: impl Into<String>, log_dir_base: impl Into<PathBuf>, resolver: Arc<dyn EnvResolver>) -> Self {
        Self {
            test_name: test_name.into(),
            log_dir_base: log_dir_base.into(),
            resolver,
        }
    }

    pub fn from_test_info(info: TestInfo, log_dir_base: impl Into<PathBuf>) -> Result<Self, TestInfoError> {
        let test_name = info.test_name()?.to_string();
        Ok(Self::new(test_name, log_dir_base, Arc::new(info)))
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn log_dir_base(&self) -> &Path {
        &self.log_dir_base
    }

    /// `<log_dir_base>/<test_name>`
    pub fn test_log(&self) -> PathBuf {
        self.log_dir_base.join(&self.test_name)
    }

    pub fn resolver(&self) -> &dyn EnvResolver {
        self.resolver.as_ref()
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("test_name", &self.test_name)
            .field("log_dir_base", &self.log_dir_base)
            .finish_non_exhaustive()
    }
}

/// Runs `daos_test` pool tests through a [`NodeControl`].
pub struct TestPoolRunner<N> {
    context: TestContext,
    nodes: N,
    log: SessionLog,
}

impl<N: NodeControl> TestPoolRunner<N> {
    pub fn new(context: TestContext, nodes: N, log: SessionLog) -> Self {
        Self { context, nodes, log }
    }

    pub fn context(&self) -> &TestContext {
        &self.context
    }

    /// Points subsequent runs at a different log base directory.
    pub fn use_log_dir(&mut self, log_path: impl Into<PathBuf>) {
        self.context.log_dir_base = log_path.into();
    }

    pub fn setup_env(&self) -> EnvironmentMap {
        EnvironmentMap::resolve_all(self.context.resolver(), &DAOS_TEST_ENV)
    }

    /// Runs the pool tests once.
    ///
    /// Returns [`NOT_CONFIRMED_RC`] if the process could not be confirmed
    /// running, otherwise whatever the wait produced. Launcher errors are
    /// returned as is.
    pub async fn run(&self) -> Result<i32, LaunchError> {
        self.log.info(format_args!("<DAOS TEST> Starting test."));

        let test_name = self.context.test_name();
        let test_log = self.context.test_log();
        let prefix = self.context.resolver().resolve(ORT_PATH, Some(""));
        let env = self.setup_env();

        let mut daos_test_cmd = self
            .nodes
            .start_cmd_list(&test_log, self.context.log_dir_base(), test_name, &prefix);
        daos_test_cmd.add_param(POOL_TEST_PARAMETERS);
        daos_test_cmd.add_env_vars(&env);
        daos_test_cmd.add_cmd(DAOS_TEST_CMD);

        daos_test_cmd.start_process()?;
        if !daos_test_cmd.check_process() {
            self.log.warn(format_args!(
                "<DAOS TEST> {test_name} could not be confirmed running, logs in {}",
                test_log.display()
            ));
            return Ok(NOT_CONFIRMED_RC);
        }

        let rc = daos_test_cmd.wait_process(WAIT_TIMEOUT).await?;
        self.log.info(format_args!("<DAOS TEST> {test_name} finished with rc {rc}."));
        Ok(rc)
    }
}
