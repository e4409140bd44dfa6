use anyhow::Context;
use log::LevelFilter;
use simplelog::*;
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Log target of HTTP requests
pub const TARGET_API_CALLS: &str = "api_calls";
/// Log target of like/repost/bookmark/view handling
pub const TARGET_INTERACTIONS: &str = "interactions";
/// Log target of comment loading and submission
pub const TARGET_COMMENTS: &str = "comments";
/// Log target of login, logout and token storage
pub const TARGET_SESSION: &str = "session";
/// Log target of everything else
pub const TARGET_GENERAL: &str = "general";

/// Logging configuration for the TMU client
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// When false nothing is written
    pub enabled: bool,
    /// Path to the log file
    pub log_file: PathBuf,
    /// Truncate the file before the first line
    pub clear_on_startup: bool,
    /// Feature flags for specific logging categories
    pub features: LogFeatures,
    /// Overall log level
    pub level: LevelFilter,
}

/// Feature flags for specific logging categories
#[derive(Debug, Clone)]
pub struct LogFeatures {
    pub api_calls: bool,
    pub interactions: bool,
    pub comments: bool,
    pub session: bool,
    pub general: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("tmu_debug.log"),
            clear_on_startup: true,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self {
            api_calls: true,
            interactions: true,
            comments: true,
            session: true,
            general: true,
        }
    }
}

impl LogFeatures {
    fn none() -> Self {
        Self {
            api_calls: false,
            interactions: false,
            comments: false,
            session: false,
            general: false,
        }
    }

    /// Targets whose category is switched off
    pub fn ignored_targets(&self) -> Vec<&'static str> {
        [
            (self.api_calls, TARGET_API_CALLS),
            (self.interactions, TARGET_INTERACTIONS),
            (self.comments, TARGET_COMMENTS),
            (self.session, TARGET_SESSION),
            (self.general, TARGET_GENERAL),
        ]
        .into_iter()
        .filter(|(on, _)| !on)
        .map(|(_, target)| target)
        .collect()
    }
}

impl LogConfig {
    /// Logging switched off entirely
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Warnings and errors only, no category output
    pub fn minimal() -> Self {
        Self {
            enabled: true,
            level: LevelFilter::Warn,
            features: LogFeatures::none(),
            ..Default::default()
        }
    }

    /// Every category at trace level; used by `--verbose`
    pub fn verbose() -> Self {
        Self {
            enabled: true,
            level: LevelFilter::Trace,
            features: LogFeatures::default(),
            ..Default::default()
        }
    }
}

/// Install the global file logger described by `config`.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        let _ = WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink());
        return Ok(());
    }

    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!config.clear_on_startup)
        .truncate(config.clear_on_startup)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let mut builder = ConfigBuilder::new();
    builder.set_time_format_rfc3339();
    let _ = builder.set_time_offset_to_local();
    for target in config.features.ignored_targets() {
        builder.add_filter_ignore_str(target);
    }
    let log_config = builder.build();

    WriteLogger::init(config.level, log_config, log_file)?;

    log::info!("logging to {} at {:?}", config.log_file.display(), config.level);
    log::debug!("categories: {:?}", config.features);

    Ok(())
}

/// Debug line under the `api_calls` target
#[macro_export]
macro_rules! log_api_call {
    ($($arg:tt)*) => {
        log::debug!(target: $crate::logging::TARGET_API_CALLS, $($arg)*)
    };
}

/// Macro for logging post interactions
#[macro_export]
macro_rules! log_interaction {
    ($($arg:tt)*) => {
        log::debug!(target: $crate::logging::TARGET_INTERACTIONS, $($arg)*)
    };
}

/// Macro for logging comment thread activity
#[macro_export]
macro_rules! log_comments {
    ($($arg:tt)*) => {
        log::debug!(target: $crate::logging::TARGET_COMMENTS, $($arg)*)
    };
}

/// Macro for logging session lifecycle
#[macro_export]
macro_rules! log_session {
    ($($arg:tt)*) => {
        log::info!(target: $crate::logging::TARGET_SESSION, $($arg)*)
    };
}
