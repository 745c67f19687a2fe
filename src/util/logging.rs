//! Structured logging setup
//!
//! Initializes a `tracing` subscriber with either pretty console output or JSON
//! lines. `RUST_LOG` is honored when set; otherwise the crate logs at the
//! configured level and noisy HTTP internals are capped at `warn`.
//!
//! # Example
//!
//! ```no_run
//! use checkrun_cascade::util::logging;
//!
//! logging::init_from_env();
//!
//! tracing::info!(commit = "abc123", "Handling event");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format (for log shipping in production)
    pub use_json: bool,

    /// Include the module target (e.g., checkrun_cascade::cascade) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    /// INFO level, pretty console output, targets on, no locations or thread IDs
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }
}

/// Parses a log level from a string
///
/// Case-insensitive; unknown values fall back to `Level::INFO` with a warning
/// on stderr.
///
/// ```
/// use checkrun_cascade::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("chatty"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut filter = EnvFilter::new(level.to_string().to_lowercase());
    for directive in [
        format!("checkrun_cascade={}", level),
        "h2=warn".to_string(),
        "hyper=warn".to_string(),
        "reqwest=warn".to_string(),
    ] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initializes the logging system; only the first call has any effect
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_thread_names(config.include_thread_ids);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Initializes logging from `CASCADE_LOG_LEVEL` and `CASCADE_LOG_JSON`
pub fn init_from_env() {
    init_logging(config_from_env());
}

fn config_from_env() -> LoggingConfig {
    let level_str = env::var("CASCADE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let use_json = env::var("CASCADE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    LoggingConfig {
        level: parse_level(&level_str),
        use_json,
        ..Default::default()
    }
}
