// src/listeners/mod.rs
//! Local listeners for package change events

use crate::core::app_types::{AppChangeEvent, AppChangeKind, AppChangeListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Human,
}

/// Simple logging listener that prints every package change
pub struct EventLogger {
    pub format: LogFormat,
    event_count: usize,
}

impl EventLogger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            event_count: 0,
        }
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn render(&self, event: &AppChangeEvent) -> String {
        match self.format {
            LogFormat::Json => serde_json::json!({
                "timestamp": event.received_at.to_rfc3339(),
                "event_type": event.kind,
                "package_name": event.package_name,
            })
            .to_string(),
            LogFormat::Human => {
                let package = event.package_name.as_deref().unwrap_or("<unknown package>");
                match event.kind {
                    AppChangeKind::Added => format!(
                        "📥 INSTALLED: {} at {}",
                        package,
                        event.received_at.format("%H:%M:%S")
                    ),
                    AppChangeKind::Removed => format!(
                        "🗑️  REMOVED: {} at {}",
                        package,
                        event.received_at.format("%H:%M:%S")
                    ),
                }
            }
        }
    }
}

impl AppChangeListener for EventLogger {
    fn on_app_changed(&mut self, event: &AppChangeEvent) {
        self.event_count += 1;
        println!("{}", self.render(event));
    }

    fn on_registered(&mut self) {
        if self.format == LogFormat::Human {
            println!("👂 Listening for package changes...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rendering_keeps_null_package() {
        let logger = EventLogger::new(LogFormat::Json);
        let line = logger.render(&AppChangeEvent::new(AppChangeKind::Removed, None));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event_type"], "removed");
        assert!(value["package_name"].is_null());
    }

    #[test]
    fn human_rendering_and_count() {
        let mut logger = EventLogger::new(LogFormat::Human);
        let event = AppChangeEvent::new(AppChangeKind::Added, Some("org.example.a".into()));
        assert!(logger.render(&event).starts_with("📥 INSTALLED: org.example.a"));
        logger.on_app_changed(&event);
        assert_eq!(logger.event_count(), 1);
    }
}
