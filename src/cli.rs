use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "daos-test-runner")]
#[command(about = "Runs the daos_test continuous integration suite", long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        help = "Path to the harness configuration file",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daos_test pool tests and exit with their result code
    Pool {
        #[command(flatten)]
        args: PoolArgs,
    },
    /// Print the environment handed to daos_test
    Env {
        #[arg(long, help = "Print as a JSON object instead of NAME=value lines")]
        json: bool,
        #[command(flatten)]
        args: PoolArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PoolArgs {
    #[arg(short, long, help = "Base directory for test logs (overrides log_dir_base)")]
    pub log_dir: Option<PathBuf>,
    #[arg(short, long, help = "Test name (overrides the testName entry)")]
    pub test_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pool_overrides() {
        let cli = Cli::parse_from([
            "daos-test-runner",
            "pool",
            "--log-dir",
            "/var/log/daostest",
            "--test-name",
            "pool_basic",
        ]);

        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        let Commands::Pool { args } = cli.command else {
            panic!("expected pool command");
        };
        assert_eq!(args.log_dir, Some(PathBuf::from("/var/log/daostest")));
        assert_eq!(args.test_name.as_deref(), Some("pool_basic"));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["daos-test-runner", "env", "--json", "--config", "/etc/daos/harness.toml"]);

        assert_eq!(cli.config, PathBuf::from("/etc/daos/harness.toml"));
        assert!(matches!(cli.command, Commands::Env { json: true, .. }));
    }
}
