use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

struct SilentLogger;

impl Log for SilentLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        false
    }

    fn log(&self, _: &Record) {}

    fn flush(&self) {}
}

/// Proxy over the globally installed logger that allows the embedder to
/// switch implementations after the agent is created.
#[derive(Clone)]
pub struct ProxyLogger {
    logger: Arc<RwLock<Box<dyn Log>>>,
}

/// The agent starts silent. Hosts that want agent diagnostics switch in a
/// real logger (and a level derived from the `logLevel` config key) through
/// this proxy.
pub static LOGGER_SWITCHER: Lazy<ProxyLogger> = Lazy::new(|| {
    let logger = ProxyLogger {
        logger: Arc::new(RwLock::new(Box::new(SilentLogger))),
    };

    log::set_boxed_logger(Box::new(logger.clone())).expect("infallible");
    log::set_max_level(LevelFilter::Debug);

    logger
});

impl ProxyLogger {
    /// Switch the logger implementation and reset the global maximum level.
    pub fn switch<L: Log + 'static>(&self, logger: L, level_filter: LevelFilter) {
        *self.logger.write().unwrap() = Box::new(logger);
        log::set_max_level(level_filter);
    }
}

/// Install `logger` at the level named by the `logLevel` config key.
pub fn init<L: Log + 'static>(logger: L, config: &crate::Config) {
    LOGGER_SWITCHER.switch(logger, config.log_level_filter());
}

impl Log for ProxyLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.logger.read().unwrap().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.logger.read().unwrap().log(record)
    }

    fn flush(&self) {
        self.logger.read().unwrap().flush()
    }
}
