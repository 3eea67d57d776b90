use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

/// Structured log entry for testing and analysis
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

/// Test subscriber that captures log entries for verification
#[derive(Debug, Clone)]
pub struct TestLogSubscriber {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Default for TestLogSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLogSubscriber {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Entries carrying `field`, for asserting on structured room logs.
    pub fn with_field(&self, field: &str) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|entry| entry.fields.iter().any(|(name, _)| name == field))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn into_layer<S>(self) -> TestLayer<S>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        TestLayer {
            subscriber: self,
            _phantom: PhantomData,
        }
    }
}

pub struct TestLayer<S> {
    subscriber: TestLogSubscriber,
    _phantom: PhantomData<S>,
}

impl<S> Layer<S> for TestLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };

        self.subscriber.lock().push(entry);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let value_str = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value_str);
        } else {
            self.fields.push((field.name().to_string(), value_str));
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter;
/// `json` switches to one JSON object per line.
pub fn init_logging(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kabo_web=debug"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true);

    if json {
        builder.json().try_init()
    } else {
        builder.with_file(true).with_line_number(true).try_init()
    }
}

/// Initialize test logging with a custom subscriber
pub fn init_test_logging() -> TestLogSubscriber {
    static SUBSCRIBER: OnceLock<TestLogSubscriber> = OnceLock::new();
    static REGISTERED: OnceLock<()> = OnceLock::new();

    let subscriber = SUBSCRIBER.get_or_init(TestLogSubscriber::new);

    REGISTERED.get_or_init(|| {
        let layer = subscriber.clone().into_layer::<Registry>();
        let registry = Registry::default().with(layer);
        // Another test harness may already own the global subscriber.
        let _ = tracing::subscriber::set_global_default(registry);
    });

    subscriber.clear();
    subscriber.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, error, info, warn};

    #[test]
    fn test_log_subscriber_captures_entries() {
        let subscriber = TestLogSubscriber::new();
        let layer = subscriber.clone().into_layer::<Registry>();
        let registry = Registry::default().with(layer);

        tracing::subscriber::with_default(registry, || {
            info!("test info message");
            warn!("test warning message");
            error!("test error message");
        });

        let entries = subscriber.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, Level::INFO);
        assert!(entries[0].message.contains("test info message"));
        assert_eq!(entries[1].level, Level::WARN);
        assert!(entries[1].message.contains("test warning message"));
        assert_eq!(entries[2].level, Level::ERROR);
        assert!(entries[2].message.contains("test error message"));
    }

    #[test]
    fn test_log_subscriber_captures_fields() {
        let subscriber = TestLogSubscriber::new();
        let layer = subscriber.clone().into_layer::<Registry>();
        let registry = Registry::default().with(layer);

        tracing::subscriber::with_default(registry, || {
            info!(room = "QX7K2", host = "ALICE", "room created");
        });

        let entries = subscriber.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("room created"));
        assert!(entries[0]
            .fields
            .iter()
            .any(|(k, v)| k == "room" && v.contains("QX7K2")));
        assert_eq!(subscriber.with_field("host").len(), 1);
        assert!(subscriber.with_field("player").is_empty());
    }

    #[test]
    fn room_lifecycle_is_logged_with_room_code() {
        use crate::events::EventBus;
        use crate::room::{RoomConfig, RoomManager};
        use crate::settings::SettingsStore;

        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());

        let code = tracing::subscriber::with_default(registry, || {
            let rooms = RoomManager::new(EventBus::new(), Arc::new(SettingsStore::new()));
            let code = rooms
                .create_room("alice", RoomConfig::from_settings(&Default::default()))
                .expect("create")
                .room
                .code;
            rooms.join_room(&code, "bob").expect("join");
            debug!("done");
            code
        });

        let room_entries = subscriber.with_field("room");
        // created, joined, and the bus publishing the join
        assert_eq!(room_entries.len(), 3);
        assert!(room_entries
            .iter()
            .all(|e| e.fields.iter().any(|(k, v)| k == "room" && v == &code)));
        assert!(room_entries[0].message.contains("room created"));
        assert!(room_entries
            .iter()
            .any(|e| e.message.contains("player joined") && e.level == Level::INFO));

        subscriber.clear();
        assert!(subscriber.entries().is_empty());
    }
}
