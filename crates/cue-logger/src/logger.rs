use log::{Log, Metadata, Record};
use std::sync::OnceLock;

use crate::{LogRecord, LogSink};

static CUE_LOGGER: OnceLock<CueLogger> = OnceLock::new();

/// `log` backend that prints through `env_logger` and forwards structured
/// records from the `cue` crates to a list of sinks.
pub struct CueLogger {
    env_logger: env_logger::Logger,
    sinks: Vec<Box<dyn LogSink>>,
}

impl CueLogger {
    /// A logger with the default environment for the console output and no
    /// sinks.
    pub fn new() -> Self {
        Self::with_env_logger(env_logger::Logger::from_default_env())
    }

    pub fn with_env_logger(env: env_logger::Logger) -> Self {
        Self {
            env_logger: env,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Install as the global logger. Can be done only once per process; later
    /// calls return the logger that is already installed.
    pub fn install(self, max_level: log::LevelFilter) -> &'static CueLogger {
        let mut installed = false;
        let logger = CUE_LOGGER.get_or_init(|| {
            installed = true;
            self
        });
        if installed {
            if log::set_logger(logger).is_ok() {
                log::set_max_level(max_level);
            } else {
                eprintln!("Another logger is already installed");
            }
        }
        logger
    }
}

impl Default for CueLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for CueLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("cue")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.env_logger.log(record);

        let record = LogRecord::from_record(record);
        for sink in &self.sinks {
            sink.write(&record);
        }
    }

    fn flush(&self) {
        self.env_logger.flush();
        for sink in &self.sinks {
            sink.flush();
        }
    }
}
