// engine_core/src/logging/logging.rs
use std::io::*;
use std::sync::Mutex;
use flexi_logger::*;
use log::Record;
use once_cell::sync::Lazy;
use crate::constants::LOG_BASENAME;
use crate::storage::engine_config::EngineConfig;

// Global mutable buffer that stores the most recent message.
pub static LAST_LOG: Lazy<Mutex<String>> = Lazy::new(|| Mutex::new(String::new()));

/// Helper macro that allow logs to be displayed by 
/// the program and printed to the console.
#[macro_export]
macro_rules! onscreen_log {
    ($lvl:expr, $($arg:tt)*) => {{
        println!($($arg)*);
        log::log!($lvl, $($arg)*);
        if let Ok(mut buf) = $crate::logging::logging::LAST_LOG.lock() {
            *buf = format!($($arg)*);
        }
    }};
}

/// Helper macro that allow logs to be displayed by the program.
#[macro_export]
macro_rules! onscreen_info  { ($($arg:tt)*) => { $crate::onscreen_log!(log::Level::Info,  $($arg)*) }; }

/// Helper macro that allow logs to be displayed by the program.
#[macro_export]
macro_rules! onscreen_warn  { ($($arg:tt)*) => { $crate::onscreen_log!(log::Level::Warn,  $($arg)*) }; }

/// Helper macro that allow logs to be displayed by the program.
#[macro_export]
macro_rules! onscreen_error { ($($arg:tt)*) => { $crate::onscreen_log!(log::Level::Error, $($arg)*) }; }

/// Helper macro that allow logs to be displayed by the program.
#[macro_export]
macro_rules! onscreen_debug { ($($arg:tt)*) => { $crate::onscreen_log!(log::Level::Debug, $($arg)*) }; }

/// Returns the most recent on-screen message.
pub fn last_log() -> String {
    LAST_LOG.lock().map(|buf| buf.clone()).unwrap_or_default()
}

/// Initializes the system logger from the engine config.
///
/// The returned handle must be kept alive for buffered output to be flushed.
pub fn init_logger(config: &EngineConfig) -> std::result::Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_str(&config.log_level)?.format(my_formatter);

    let handle = if config.log_to_file {
        let log_dir = config.log_dir();
        let file_spec = FileSpec::default()
            .directory(&log_dir)
            .basename(LOG_BASENAME)
            .suffix("log");

        let handle = logger
            .log_to_file(file_spec)
            .duplicate_to_stderr(Duplicate::Warn)
            .rotate(
                Criterion::Size(5_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(5),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .start()?;

        onscreen_info!("Log dir: {}.", &log_dir.display());
        handle
    } else {
        logger.log_to_stderr().start()?
    };

    Ok(handle)
}

fn my_formatter(
    write: &mut dyn Write, 
    now: &mut DeferredNow, 
    record: &Record
) -> Result<()> {
    write!(
        write,
        "{} {:5} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.module_path().unwrap_or("<unknown>"),
        &record.args()
    )
}
