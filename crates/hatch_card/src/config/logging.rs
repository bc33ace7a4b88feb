use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"hatch_card::gesture" = "debug"`
    #[serde(default)]
    pub overrides: BTreeMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Filter directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn directives(&self) -> String {
        let mut directives = vec![LevelFilter::from(self.level).to_string().to_lowercase()];
        for (target, level) in &self.overrides {
            directives.push(format!(
                "{}={}",
                target,
                LevelFilter::from(*level).to_string().to_lowercase()
            ));
        }
        directives.join(",")
    }
}
