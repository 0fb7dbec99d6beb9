use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use log::{debug, error, info, warn};
use tokio::process::{Child, Command};

use super::{CommandList, LaunchError, NodeControl};
use crate::{config::LauncherConfig, env::EnvironmentMap};

pub const STDOUT_LOG: &str = "stdout.log";
pub const STDERR_LOG: &str = "stderr.log";

/// Result code reported when the process outlives the wait timeout.
pub const TIMED_OUT_RC: i32 = 124;

/// Runs commands through an MPI launcher (`orterun` by default) on this node.
#[derive(Debug, Clone)]
pub struct LocalNodeControl {
    program: String,
}

impl LocalNodeControl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::new(config.program.clone())
    }
}

impl NodeControl for LocalNodeControl {
    type Commands = LocalCommandList;

    fn start_cmd_list(&self, test_log: &Path, log_dir_base: &Path, test_name: &str, prefix: &str) -> LocalCommandList {
        let program = if prefix.is_empty() {
            PathBuf::from(&self.program)
        } else {
            Path::new(prefix).join(&self.program)
        };
        debug!(
            test = test_name,
            log_dir_base:% = log_dir_base.display(),
            program:% = program.display();
            "Opening command list"
        );
        LocalCommandList::new(program, test_log.to_path_buf())
    }
}

#[derive(Debug)]
pub enum InvocationState {
    Building,
    Started(Child),
    SpawnFailed,
    Completed(i32),
}

#[derive(Debug)]
pub struct LocalCommandList {
    program: PathBuf,
    test_log: PathBuf,
    params: Vec<String>,
    env: EnvironmentMap,
    cmd: Option<String>,
    state: InvocationState,
}

impl LocalCommandList {
    pub fn new(program: PathBuf, test_log: PathBuf) -> Self {
        Self {
            program,
            test_log,
            params: Vec::new(),
            env: EnvironmentMap::new(),
            cmd: None,
            state: InvocationState::Building,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn test_log(&self) -> &Path {
        &self.test_log
    }

    pub fn state(&self) -> &InvocationState {
        &self.state
    }

    /// Launcher arguments: parameters, one `-x NAME` per exported variable,
    /// then the command.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.params.clone();
        for (name, _) in self.exported_env() {
            args.push("-x".to_string());
            args.push(name.clone());
        }
        args.extend(self.cmd.clone());
        args
    }

    // Empty values are left to the inherited environment.
    fn exported_env(&self) -> impl Iterator<Item = (&String, &String)> {
        self.env.iter().filter(|(_, value)| !value.is_empty())
    }

    fn open_log(&self, name: &str) -> Result<File, LaunchError> {
        let path = self.test_log.join(name);
        File::create(&path).map_err(|source| LaunchError::LogDir { path, source })
    }
}

impl CommandList for LocalCommandList {
    fn add_param(&mut self, param: &str) {
        self.params.extend(param.split_whitespace().map(String::from));
    }

    fn add_env_vars(&mut self, env: &EnvironmentMap) {
        for (name, value) in env {
            if value.is_empty() {
                debug!(name = name.as_str(); "No value configured, inheriting from harness environment");
            }
            self.env.insert(name.clone(), value.clone());
        }
    }

    fn add_cmd(&mut self, cmd: &str) {
        if let Some(previous) = self.cmd.replace(cmd.to_string()) {
            warn!(previous = previous.as_str(), cmd = cmd; "Replacing command on command list");
        }
    }

    fn start_process(&mut self) -> Result<(), LaunchError> {
        if !matches!(self.state, InvocationState::Building) {
            return Err(LaunchError::AlreadyStarted);
        }
        if self.cmd.is_none() {
            return Err(LaunchError::MissingCommand);
        }

        fs::create_dir_all(&self.test_log).map_err(|source| LaunchError::LogDir {
            path: self.test_log.clone(),
            source,
        })?;
        let stdout = self.open_log(STDOUT_LOG)?;
        let stderr = self.open_log(STDERR_LOG)?;

        let args = self.args();
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .envs(self.exported_env())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        match command.spawn() {
            Ok(child) => {
                info!(
                    program:% = self.program.display(),
                    pid:? = child.id(),
                    args:? = args;
                    "Process started"
                );
                self.state = InvocationState::Started(child);
            },
            Err(e) => {
                error!(program:% = self.program.display(), error:% = e; "Failed to spawn process");
                self.state = InvocationState::SpawnFailed;
            },
        }
        Ok(())
    }

    fn check_process(&mut self) -> bool {
        match &mut self.state {
            InvocationState::Started(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    debug!(status:% = status; "Process already exited");
                    true
                },
                Err(e) => {
                    warn!(error:% = e; "Could not poll process");
                    false
                },
            },
            InvocationState::Completed(_) => true,
            InvocationState::Building | InvocationState::SpawnFailed => false,
        }
    }

    async fn wait_process(&mut self, timeout: Duration) -> Result<i32, LaunchError> {
        let child = match &mut self.state {
            InvocationState::Started(child) => child,
            InvocationState::Completed(rc) => return Ok(*rc),
            InvocationState::Building | InvocationState::SpawnFailed => return Err(LaunchError::NotStarted),
        };

        let rc = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => exit_code(status),
            Ok(Err(e)) => return Err(LaunchError::Wait(e)),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(); "Process did not finish in time, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error:% = e; "Failed to kill timed out process");
                }
                TIMED_OUT_RC
            },
        };

        info!(rc = rc; "Process finished");
        self.state = InvocationState::Completed(rc);
        Ok(rc)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
