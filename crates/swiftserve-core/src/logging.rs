//! Structured logging for the page.
//!
//! Handlers log through `tracing`. [`ConsoleLayer`] turns each event into a
//! [`LogEntry`] and hands the formatted line to a [`LogWriter`]; the browser
//! binding writes to the developer console.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        if *level == Level::ERROR {
            Self::Error
        } else if *level == Level::WARN {
            Self::Warn
        } else if *level == Level::INFO {
            Self::Info
        } else if *level == Level::DEBUG {
            Self::Debug
        } else {
            Self::Trace
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for log collection).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// A structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Log level.
    pub level: LogLevel,
    /// Log message.
    pub message: String,
    /// Module path that emitted the event.
    pub target: String,
    /// Additional structured fields.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Format as human-readable string.
    pub fn to_human(&self) -> String {
        let mut s = format!("[{}] {}", self.level, self.message);

        if !self.fields.is_empty() {
            s.push_str(" | ");
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(text) => format!("{}={}", k, text),
                    other => format!("{}={}", k, other),
                })
                .collect();
            s.push_str(&fields.join(" "));
        }

        s
    }

    /// Format according to `format`.
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Json => self.to_json(),
            LogFormat::Human => self.to_human(),
        }
    }
}

/// Destination for formatted log lines.
pub trait LogWriter: Send + Sync + 'static {
    /// Write one formatted line at the given level.
    fn write(&self, level: LogLevel, line: &str);
}

/// `tracing` layer that formats events as [`LogEntry`] lines.
pub struct ConsoleLayer<W> {
    writer: W,
    min_level: LogLevel,
    format: LogFormat,
}

impl<W: LogWriter> ConsoleLayer<W> {
    /// Create a layer writing to `writer` at info level and above.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            min_level: LogLevel::Info,
            format: LogFormat::default(),
        }
    }

    /// Set minimum log level.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Set output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

impl<S, W> Layer<S> for ConsoleLayer<W>
where
    S: Subscriber,
    W: LogWriter,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = LogLevel::from(metadata.level());
        if level < self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            level,
            message: visitor.message.unwrap_or_default(),
            target: metadata.target().to_string(),
            fields: visitor.fields,
        };

        self.writer.write(level, &entry.render(self.format));
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::json!(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, serde_json::json!(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<(LogLevel, String)>>>);

    impl LogWriter for CaptureWriter {
        fn write(&self, level: LogLevel, line: &str) {
            self.0.lock().unwrap().push((level, line.to_string()));
        }
    }

    impl CaptureWriter {
        fn lines(&self) -> Vec<(LogLevel, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    fn with_layer(layer: ConsoleLayer<CaptureWriter>, f: impl FnOnce()) {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, f);
    }

    // === Entry Formatting ===

    #[test]
    fn test_entry_to_human() {
        let mut fields = BTreeMap::new();
        fields.insert("order_id".to_string(), serde_json::json!(42));
        fields.insert("status".to_string(), serde_json::json!("Ready"));

        let entry = LogEntry {
            level: LogLevel::Info,
            message: "order update received".to_string(),
            target: "swiftserve_core::notify".to_string(),
            fields,
        };

        assert_eq!(
            entry.to_human(),
            "[INFO] order update received | order_id=42 status=Ready"
        );
    }

    #[test]
    fn test_entry_to_json_flattens_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("count".to_string(), serde_json::json!(3));

        let entry = LogEntry {
            level: LogLevel::Warn,
            message: "cart add failed".to_string(),
            target: "swiftserve_core::cart".to_string(),
            fields,
        };

        let value: serde_json::Value = serde_json::from_str(&entry.to_json()).unwrap();
        assert_eq!(value["level"], "warn");
        assert_eq!(value["message"], "cart add failed");
        assert_eq!(value["count"], 3);
    }

    // === Layer ===

    #[test]
    fn test_layer_captures_message_and_fields() {
        let writer = CaptureWriter::default();
        let layer = ConsoleLayer::new(writer.clone()).with_format(LogFormat::Human);

        with_layer(layer, || {
            tracing::info!(order_id = 42_i64, status = "Ready", "order update received");
        });

        let lines = writer.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, LogLevel::Info);
        assert_eq!(
            lines[0].1,
            "[INFO] order update received | order_id=42 status=Ready"
        );
    }

    #[test]
    fn test_layer_filters_below_min_level() {
        let writer = CaptureWriter::default();
        let layer = ConsoleLayer::new(writer.clone()).with_min_level(LogLevel::Warn);

        with_layer(layer, || {
            tracing::debug!("noise");
            tracing::info!("still noise");
            tracing::warn!("kept");
        });

        let lines = writer.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, LogLevel::Warn);
    }

    #[test]
    fn test_layer_json_output() {
        let writer = CaptureWriter::default();
        let layer = ConsoleLayer::new(writer.clone()).with_format(LogFormat::Json);

        with_layer(layer, || {
            tracing::error!(attempt = 3_u64, "push channel gave up");
        });

        let lines = writer.lines();
        let value: serde_json::Value = serde_json::from_str(&lines[0].1).unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["attempt"], 3);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::from(&Level::WARN), LogLevel::Warn);
    }
}
