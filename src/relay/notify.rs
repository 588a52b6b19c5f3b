use crate::dom::TabDocument;
use std::sync::{Arc, Mutex};

/// Surfaces a message to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Raises a `window.alert` in the destination tab
pub struct PageAlertNotifier {
    document: TabDocument,
}

impl PageAlertNotifier {
    pub fn new(document: TabDocument) -> Self {
        Self { document }
    }
}

impl Notifier for PageAlertNotifier {
    fn notify(&self, message: &str) {
        if let Err(e) = self.document.alert(message) {
            log::warn!("Could not show page alert ({}); message was: {}", e, message);
        }
    }
}

/// Keeps every notification so tests can inspect them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<String> {
        self.messages.lock().map(|mut m| std::mem::take(&mut *m)).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

/// Fans a notification out to several notifiers
#[derive(Default, Clone)]
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }
}

impl Notifier for MultiNotifier {
    fn notify(&self, message: &str) {
        for notifier in &self.notifiers {
            notifier.notify(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_notifier_fans_out() {
        let first = Arc::new(RecordingNotifier::new());
        let second = Arc::new(RecordingNotifier::new());
        let multi = MultiNotifier::new().with(first.clone()).with(second.clone()).with(Arc::new(LogNotifier));

        multi.notify("hello");
        assert_eq!(first.messages(), vec!["hello".to_string()]);
        assert_eq!(second.take(), vec!["hello".to_string()]);
        assert!(second.messages().is_empty());
    }
}
