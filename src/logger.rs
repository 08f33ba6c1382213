//! Structured leveled logger.
//!
//! A [`Logger`] is an owned instance: it writes one line per event to its own
//! sink, either as a text line
//! (`time=... level=INFO msg="..." service=api relay.chain=0021`) or as a
//! JSON object with the same fields and one nested object per [`LogObject`].
//! Writes are serialized by a mutex held by the instance.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::env::{Env, EnvProvider};
use crate::log_value::{format_time, LogObject};
use crate::LoggerError;

const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
const LOG_HANDLER_VAR: &str = "LOG_HANDLER";
const LOG_SAMPLE_RATE_VAR: &str = "LOG_SAMPLE_RATE";

/// Log verbosity, ordered from most to least verbose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    /// Lowercase name, as accepted in `LOG_LEVEL`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("invalid log level '{other}'")),
        }
    }
}

/// Output line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("invalid log handler '{other}'")),
        }
    }
}

/// Logger configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct LogConfig {
    /// Service name written on every line. Must not be empty.
    pub service: String,
    pub level: Level,
    pub format: LogFormat,
    /// Fraction of debug/info events kept, in `(0, 1]`. Warn and error
    /// events are never sampled out.
    pub sample_rate: f64,
}

impl LogConfig {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            level: Level::default(),
            format: LogFormat::default(),
            sample_rate: 1.0,
        }
    }

    /// Reads `LOG_LEVEL` (`debug|info|warn|error`, default `info`),
    /// `LOG_HANDLER` (`json|text`, default `json`) and `LOG_SAMPLE_RATE`
    /// (default `1`). Invalid values fall back to the default.
    pub fn from_env<P: EnvProvider>(env: &Env<P>, service: impl Into<String>) -> Self {
        let mut config = Self::new(service);

        let level = env.string_or(LOG_LEVEL_VAR, Level::default().as_str());
        match level.parse() {
            Ok(level) => config.level = level,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(value = %level, "invalid {LOG_LEVEL_VAR}, using info level default");
            }
        }

        let handler = env.string_or(LOG_HANDLER_VAR, "json");
        match handler.parse() {
            Ok(format) => config.format = format,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(value = %handler, "invalid {LOG_HANDLER_VAR}, using json default");
            }
        }

        let sample_rate = env.f64_or(LOG_SAMPLE_RATE_VAR, 1.0);
        if sample_rate > 0.0 && sample_rate <= 1.0 {
            config.sample_rate = sample_rate;
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(value = sample_rate, "invalid {LOG_SAMPLE_RATE_VAR}, keeping every event");
        }

        config
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

/// Leveled structured logger owning its output sink.
pub struct Logger {
    config: LogConfig,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Creates a logger writing to stderr.
    pub fn new(config: LogConfig) -> Result<Self, LoggerError> {
        Self::with_writer(config, io::stderr())
    }

    /// Creates a logger writing to `writer`.
    pub fn with_writer<W>(config: LogConfig, writer: W) -> Result<Self, LoggerError>
    where
        W: Write + Send + 'static,
    {
        if config.service.trim().is_empty() {
            return Err(LoggerError::EmptyService);
        }
        Ok(Self {
            config,
            sink: Mutex::new(Box::new(writer)),
        })
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Current level name, e.g. `"info"`.
    pub fn level(&self) -> &'static str {
        self.config.level.as_str()
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.config.level
    }

    pub fn debug(&self, msg: &str, objects: &[&dyn LogObject]) {
        self.log(Level::Debug, msg, objects);
    }

    pub fn info(&self, msg: &str, objects: &[&dyn LogObject]) {
        self.log(Level::Info, msg, objects);
    }

    pub fn warn(&self, msg: &str, objects: &[&dyn LogObject]) {
        self.log(Level::Warn, msg, objects);
    }

    pub fn error(&self, msg: &str, objects: &[&dyn LogObject]) {
        self.log(Level::Error, msg, objects);
    }

    /// Logs at error level and exits the process with status 1.
    pub fn fatal(&self, msg: &str, objects: &[&dyn LogObject]) -> ! {
        self.log(Level::Error, msg, objects);
        std::process::exit(1)
    }

    /// Writes one event if `level` is enabled and the event survives
    /// sampling. Write failures are dropped.
    pub fn log(&self, level: Level, msg: &str, objects: &[&dyn LogObject]) {
        if !self.enabled(level) || self.sampled_out(level) {
            return;
        }

        let line = match self.config.format {
            LogFormat::Json => self.render_json(level, msg, objects),
            LogFormat::Text => self.render_text(level, msg, objects),
        };

        let mut sink = self.lock_sink();
        let _ = writeln!(sink, "{line}");
        let _ = sink.flush();
    }

    fn sampled_out(&self, level: Level) -> bool {
        level <= Level::Info
            && self.config.sample_rate < 1.0
            && rand::random::<f64>() >= self.config.sample_rate
    }

    fn lock_sink(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn render_text(&self, level: Level, msg: &str, objects: &[&dyn LogObject]) -> String {
        let mut line = format!(
            "time={} level={} msg={:?} service={}",
            format_time(&Utc::now()),
            level,
            msg,
            quote_if_needed(&self.config.service)
        );
        for object in objects {
            for (key, value) in object.log_properties() {
                if value.is_zero() {
                    continue;
                }
                line.push_str(&format!(
                    " {}.{}={}",
                    object.log_name(),
                    key,
                    quote_if_needed(&value.to_string())
                ));
            }
        }
        line
    }

    fn render_json(&self, level: Level, msg: &str, objects: &[&dyn LogObject]) -> String {
        let mut line = Map::new();
        line.insert("time".to_owned(), format_time(&Utc::now()).into());
        line.insert("level".to_owned(), level.label().into());
        line.insert("msg".to_owned(), msg.into());
        line.insert("service".to_owned(), self.config.service.as_str().into());
        for object in objects {
            let properties: Map<String, Value> = object
                .log_properties()
                .into_iter()
                .filter(|(_, value)| !value.is_zero())
                .map(|(key, value)| (key, value.to_json()))
                .collect();
            line.insert(object_key(object.log_name()), Value::Object(properties));
        }
        Value::Object(line).to_string()
    }
}

/// Top-level keys of a JSON line. Objects with one of these names are
/// written under `obj_<name>`.
const RESERVED_KEYS: [&str; 4] = ["time", "level", "msg", "service"];

fn object_key(name: &str) -> String {
    if RESERVED_KEYS.contains(&name) {
        format!("obj_{name}")
    } else {
        name.to_owned()
    }
}

fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '=' || c.is_control());
    if needs_quotes {
        format!("{value:?}")
    } else {
        value.to_owned()
    }
}

/// In-memory sink shared between a test logger and its [`LogCapture`].
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads back what a logger built by [`test_logger`] wrote.
#[derive(Clone)]
pub struct LogCapture {
    buffer: SharedBuffer,
}

impl LogCapture {
    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        let bytes = self
            .buffer
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// The `msg` value of every line written so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|line| message_of(line))
            .collect()
    }
}

fn message_of(line: &str) -> Option<String> {
    if line.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        return value.get("msg")?.as_str().map(str::to_owned);
    }
    let start = line.find("msg=\"")? + "msg=\"".len();
    let rest = &line[start..];
    let mut escaped = false;
    for (index, c) in rest.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(rest[..index].replace("\\\"", "\"")),
            _ => escaped = false,
        }
    }
    None
}

/// Builds a logger writing to memory, plus a handle to read its output.
pub fn test_logger(config: LogConfig) -> Result<(Logger, LogCapture), LoggerError> {
    let buffer = SharedBuffer::default();
    let logger = Logger::with_writer(config, buffer.clone())?;
    Ok((logger, LogCapture { buffer }))
}

/// Installs a global `tracing` subscriber matching `config`: an `EnvFilter`
/// from `RUST_LOG` (falling back to the configured level) and a text or JSON
/// formatter on stderr.
#[cfg(feature = "tracing")]
pub fn init_tracing(config: &LogConfig) -> Result<(), LoggerError> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(io::stderr))
            .try_init(),
    };
    result.map_err(|err| LoggerError::Subscriber(err.to_string()))
}
