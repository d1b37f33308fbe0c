//! Per-instance configuration passed at instantiation.

use crate::error::Status;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which half of the interface an instance is created for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceType {
    #[default]
    ModelExchange,
    CoSimulation,
}

/// A log message emitted by a model instance.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub instance_name: String,
    pub status: Status,
    pub category: String,
    pub message: String,
}

pub type LogCallback = Arc<dyn Fn(&LogRecord) + Send + Sync>;

/// Destination of log messages emitted by one instance.
#[derive(Clone, Default)]
pub enum LogSink {
    /// Forward to `tracing`, mapping the status to a level.
    #[default]
    Tracing,
    /// Hand every record to a caller-supplied callback.
    Callback(LogCallback),
    /// Drop all messages.
    Discard,
}

impl LogSink {
    pub fn callback(f: impl Fn(&LogRecord) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    pub fn log(&self, instance_name: &str, status: Status, category: &str, message: &str) {
        match self {
            Self::Tracing => match status {
                Status::Ok => {
                    tracing::debug!(instance = instance_name, category, "{message}")
                }
                Status::Warning | Status::Discard => {
                    tracing::warn!(instance = instance_name, category, "{message}")
                }
                Status::Error | Status::Fatal => {
                    tracing::error!(instance = instance_name, category, "{message}")
                }
            },
            Self::Callback(cb) => cb(&LogRecord {
                instance_name: instance_name.to_string(),
                status,
                category: category.to_string(),
                message: message.to_string(),
            }),
            Self::Discard => {}
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tracing => write!(f, "LogSink::Tracing"),
            Self::Callback(_) => write!(f, "LogSink::Callback(..)"),
            Self::Discard => write!(f, "LogSink::Discard"),
        }
    }
}

/// Settings fixed for the lifetime of one instance.
#[derive(Clone, Debug)]
pub struct InstanceConfig {
    pub instance_name: String,
    pub interface: InterfaceType,
    pub visible: bool,
    pub logging_on: bool,
    /// Co-simulation: the instance may return early from `do_step`.
    pub early_return_allowed: bool,
    /// Co-simulation: the master will use event mode.
    pub event_mode_used: bool,
    pub log_sink: LogSink,
}

impl InstanceConfig {
    pub fn new(instance_name: impl Into<String>, interface: InterfaceType) -> Self {
        Self {
            instance_name: instance_name.into(),
            interface,
            visible: false,
            logging_on: false,
            early_return_allowed: false,
            event_mode_used: false,
            log_sink: LogSink::default(),
        }
    }

    pub fn with_logging(mut self, logging_on: bool) -> Self {
        self.logging_on = logging_on;
        self
    }

    pub fn with_early_return(mut self, allowed: bool) -> Self {
        self.early_return_allowed = allowed;
        self
    }

    pub fn with_event_mode(mut self, used: bool) -> Self {
        self.event_mode_used = used;
        self
    }

    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = sink;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn callback_sink_receives_records() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            LogSink::callback(move |record| {
                if let Ok(mut seen) = seen.lock() {
                    seen.push(record.clone());
                }
            })
        };

        sink.log("ball", Status::Warning, "events", "bounce");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].instance_name, "ball");
        assert_eq!(seen[0].status, Status::Warning);
        assert_eq!(seen[0].message, "bounce");
    }

    #[test]
    fn config_builder() {
        let config = InstanceConfig::new("inst", InterfaceType::CoSimulation)
            .with_early_return(true)
            .with_event_mode(true)
            .with_log_sink(LogSink::Discard);
        assert!(config.early_return_allowed);
        assert!(config.event_mode_used);
        assert!(!config.logging_on);
        assert_eq!(format!("{:?}", config.log_sink), "LogSink::Discard");
    }
}
