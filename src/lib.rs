pub mod cli;
pub mod config;
pub mod env;
pub mod launcher;
pub mod log;
pub mod runner;

pub use crate::config::{HarnessConfig, TestInfo, load_configuration};
pub use crate::env::{EnvResolver, EnvironmentMap};
pub use crate::launcher::{CommandList, LaunchError, LocalNodeControl, NodeControl};
pub use crate::runner::{TestContext, TestPoolRunner};
