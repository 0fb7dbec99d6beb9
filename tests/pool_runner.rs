#![cfg(unix)]

use std::{fs, sync::Arc};

use daos_test_runner::{
    TestContext, TestInfo, TestPoolRunner,
    config::{TEST_NAME_KEY, load_configuration, write_config_to},
    launcher::{LocalNodeControl, STDOUT_LOG},
    log::{SESSION_LOG_FILE, SessionLog},
    runner::NOT_CONFIRMED_RC,
};
use serial_test::serial;
use tempfile::tempdir;

fn pool_basic(default_env: &[(&str, &str)]) -> TestInfo {
    let mut info = TestInfo::default();
    info.set_test_info(TEST_NAME_KEY, "pool_basic");
    for (name, value) in default_env {
        info.set_default_env(name, value);
    }
    info
}

#[tokio::test]
async fn pool_run_launches_daos_test_through_launcher() {
    let dir = tempdir().unwrap();
    let context = TestContext::from_test_info(pool_basic(&[("OFI_PORT", "23350")]), dir.path()).unwrap();
    let test_log = context.test_log();
    let session = SessionLog::for_session(&test_log).unwrap();
    let runner = TestPoolRunner::new(context, LocalNodeControl::new("echo"), session.clone());

    let rc = runner.run().await.unwrap();
    session.flush();

    assert_eq!(rc, 0);
    assert_eq!(test_log, dir.path().join("pool_basic"));
    let stdout = fs::read_to_string(test_log.join(STDOUT_LOG)).unwrap();
    assert_eq!(
        stdout,
        "--np 1 --ompi-server file:/tmp/urifile -x CRT_PHY_ADDR_STR -x OFI_INTERFACE -x OFI_PORT daos_test\n"
    );
    let runner_log = fs::read_to_string(test_log.join(SESSION_LOG_FILE)).unwrap();
    assert!(runner_log.contains("<DAOS TEST> Starting test."), "{runner_log}");
}

#[tokio::test]
async fn pool_run_reports_launcher_exit_code() {
    let dir = tempdir().unwrap();
    let context = TestContext::from_test_info(pool_basic(&[]), dir.path()).unwrap();
    let runner = TestPoolRunner::new(context, LocalNodeControl::new("false"), SessionLog::global());

    assert_eq!(runner.run().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_launcher_is_not_confirmed() {
    let dir = tempdir().unwrap();
    let info = pool_basic(&[("ORT_PATH", "/nonexistent/openmpi/bin")]);
    let context = TestContext::from_test_info(info, dir.path()).unwrap();
    let runner = TestPoolRunner::new(context, LocalNodeControl::new("orterun"), SessionLog::global());

    assert_eq!(runner.run().await.unwrap(), NOT_CONFIRMED_RC);
    assert!(dir.path().join("pool_basic").join(STDOUT_LOG).exists());
}

#[tokio::test]
#[serial]
async fn configured_harness_runs_pool_test() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("harness.toml");
    let log_dir = dir.path().join("logs");
    write_config_to(
        &config_path,
        &format!(
            r#"
log_dir_base = "{}"

[launcher]
program = "echo"

[test.info]
testName = "pool_basic"
"#,
            log_dir.display()
        ),
    )
    .unwrap();

    let config = load_configuration(&config_path).unwrap();
    let context = TestContext::from_test_info(config.test, config.log_dir_base).unwrap();
    let runner = TestPoolRunner::new(
        context,
        LocalNodeControl::from_config(&config.launcher),
        SessionLog::new(Arc::new(NullLog)),
    );

    assert_eq!(runner.run().await.unwrap(), 0);
    let stdout = fs::read_to_string(log_dir.join("pool_basic").join(STDOUT_LOG)).unwrap();
    assert!(stdout.ends_with("daos_test\n"), "{stdout}");
}

struct NullLog;

impl log::Log for NullLog {
    fn enabled(&self, _: &log::Metadata) -> bool {
        false
    }

    fn log(&self, _: &log::Record) {}

    fn flush(&self) {}
}
