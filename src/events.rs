//! Events published to whatever front end is attached: state changes for
//! rendering and toasts for user-visible notifications.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{db::SessionRecord, timer::TimerSnapshot};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ToastLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppEvent {
    TimerStateChanged { snapshot: TimerSnapshot },
    SnapshotCaptured { retained: usize },
    SessionSaved {
        session: SessionRecord,
        evidence_urls: Vec<String>,
        failed_uploads: usize,
    },
    /// The session was not stored; nothing more will follow for it.
    SessionSaveFailed { reason: String },
    Toast(Toast),
}

#[derive(Clone)]
pub struct EventEmitter {
    tx: UnboundedSender<AppEvent>,
}

impl EventEmitter {
    pub fn channel() -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: AppEvent) {
        // A closed receiver only means nobody is listening any more.
        let _ = self.tx.send(event);
    }

    pub fn toast(&self, level: ToastLevel, title: impl Into<String>, message: impl Into<String>) {
        self.emit(AppEvent::Toast(Toast {
            level,
            title: title.into(),
            message: message.into(),
        }));
    }

    pub fn success(&self, title: impl Into<String>, message: impl Into<String>) {
        self.toast(ToastLevel::Success, title, message);
    }

    pub fn warning(&self, title: impl Into<String>, message: impl Into<String>) {
        self.toast(ToastLevel::Warning, title, message);
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.toast(ToastLevel::Error, title, message);
    }
}

/// Drains everything currently queued without waiting.
pub fn drain(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn toasts_of(events: &[AppEvent], level: ToastLevel) -> Vec<&Toast> {
    events
        .iter()
        .filter_map(|event| match event {
            AppEvent::Toast(toast) if toast.level == level => Some(toast),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitting_without_a_listener_is_harmless() {
        let (events, rx) = EventEmitter::channel();
        drop(rx);
        events.error("Oops", "nobody hears this");
    }

    #[test]
    fn toasts_are_filtered_by_level() {
        let (events, mut rx) = EventEmitter::channel();
        events.error("Upload failed", "photo 1");
        events.success("Saved", "1:00");
        events.error("Upload failed", "photo 2");

        let drained = drain(&mut rx);
        assert_eq!(drained.len(), 3);
        assert_eq!(toasts_of(&drained, ToastLevel::Error).len(), 2);
        assert_eq!(toasts_of(&drained, ToastLevel::Success)[0].title, "Saved");
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = AppEvent::SnapshotCaptured { retained: 2 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "snapshotCaptured");
        assert_eq!(json["retained"], 2);
    }
}
