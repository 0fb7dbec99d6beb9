use anyhow::Context;
use clap::Parser;
use daos_test_runner::{
    cli::{Cli, Commands, PoolArgs},
    config::{HarnessConfig, load_configuration},
    launcher::LocalNodeControl,
    log::{SessionLog, init_logging},
    runner::{TestContext, TestPoolRunner},
};
use log::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_logging()?;

    let config = load_configuration(&cli.config)
        .with_context(|| format!("Could not load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Pool { args } => {
            let rc = run_pool(config, &args).await?;
            std::process::exit(rc);
        },
        Commands::Env { json, args } => print_env(config, &args, json),
    }
}

async fn run_pool(mut config: HarnessConfig, args: &PoolArgs) -> Result<i32, anyhow::Error> {
    config.apply_pool(args);
    let nodes = LocalNodeControl::from_config(&config.launcher);
    let context = TestContext::from_test_info(config.test, config.log_dir_base)?;

    let session = SessionLog::for_session(&context.test_log())?;
    let test_name = context.test_name().to_string();
    let runner = TestPoolRunner::new(context, nodes, session.clone());

    let rc = runner.run().await.context("daos_test pool run failed")?;
    info!(test = test_name.as_str(), rc = rc; "Pool test finished");
    session.flush();
    Ok(rc)
}

fn print_env(mut config: HarnessConfig, args: &PoolArgs, json: bool) -> Result<(), anyhow::Error> {
    config.apply_pool(args);
    let nodes = LocalNodeControl::from_config(&config.launcher);
    let context = TestContext::from_test_info(config.test, config.log_dir_base)?;
    let runner = TestPoolRunner::new(context, nodes, SessionLog::global());

    let env = runner.setup_env();
    if json {
        println!("{}", serde_json::to_string_pretty(&env)?);
    } else {
        for (name, value) in &env {
            println!("{name}={value}");
        }
    }
    Ok(())
}
