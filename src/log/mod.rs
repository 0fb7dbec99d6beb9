pub mod structured_console_encoder;

use std::{fmt, fs, path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow};
use log::{Level, LevelFilter, Log, Metadata, Record, debug, info};
use log4rs::{
    Config,
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Deserializers, RawConfig, Root},
};

use crate::log::structured_console_encoder::{StructuredConsoleEncoder, StructuredConsoleEncoderDeserializer};

/// Target used for records emitted through a [`SessionLog`].
pub const SESSION_TARGET: &str = "test_runner";

/// File written by a session logger inside the test's log directory.
pub const SESSION_LOG_FILE: &str = "runner.log";

/// Initializes the process-wide logger.
///
/// Uses `log4rs.yml` from the working directory when present, otherwise the
/// embedded default configuration.
pub fn init_logging() -> Result<()> {
    let mut deserializers = Deserializers::default();
    deserializers.insert("structured_console", StructuredConsoleEncoderDeserializer);

    let config_path = "log4rs.yml";
    let path = Path::new(config_path);

    if path.exists() {
        log4rs::init_file(path, deserializers).context("Failed to load external log4rs.yml")?;
        info!(path = config_path; "Logging initialized from external configuration");
        return Ok(());
    }

    let yaml_content = include_str!("../../resources/default_log4rs.yml");
    let raw_config: RawConfig =
        serde_yaml::from_str(yaml_content).context("Embedded logging configuration is invalid YAML")?;

    let (appenders, errors) = raw_config.appenders_lossy(&deserializers);
    if !errors.is_empty() {
        return Err(anyhow!("Errors parsing embedded appenders: {:?}", errors));
    }

    let config = Config::builder()
        .appenders(appenders)
        .loggers(raw_config.loggers())
        .build(raw_config.root())
        .context("Failed to build logging config")?;

    log4rs::init_config(config).context("Failed to initialize logging from embedded config")?;

    debug!("Logging initialized from embedded defaults (no external log4rs.yml found)");
    Ok(())
}

/// Logging sink handed to a test runner for the duration of one session.
#[derive(Clone)]
pub struct SessionLog {
    sink: Arc<dyn Log>,
}

impl SessionLog {
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink }
    }

    /// Forwards to whatever logger is installed process-wide.
    pub fn global() -> Self {
        Self::new(Arc::new(GlobalLog))
    }

    /// Builds a dedicated logger writing to stderr and to
    /// `<test_log>/runner.log`. It is dropped together with the session.
    pub fn for_session(test_log: &Path) -> Result<Self> {
        fs::create_dir_all(test_log)
            .with_context(|| format!("Could not create log directory {}", test_log.display()))?;
        let console = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(StructuredConsoleEncoder::default()))
            .build();
        let file = FileAppender::builder()
            .encoder(Box::new(StructuredConsoleEncoder::new("{d} {l} {t} - {m}")))
            .build(test_log.join(SESSION_LOG_FILE))
            .with_context(|| format!("Could not open session log in {}", test_log.display()))?;

        let config = Config::builder()
            .appender(Appender::builder().build("console", Box::new(console)))
            .appender(Appender::builder().build("file", Box::new(file)))
            .build(
                Root::builder()
                    .appender("console")
                    .appender("file")
                    .build(LevelFilter::Info),
            )
            .context("Failed to build session logging config")?;

        Ok(Self::new(Arc::new(log4rs::Logger::new(config))))
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let record = Record::builder()
            .level(level)
            .target(SESSION_TARGET)
            .module_path_static(Some(module_path!()))
            .args(args)
            .build();
        if self.sink.enabled(record.metadata()) {
            self.sink.log(&record);
        }
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn flush(&self) {
        self.sink.flush();
    }
}

impl fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLog").finish_non_exhaustive()
    }
}

struct GlobalLog;

impl Log for GlobalLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
