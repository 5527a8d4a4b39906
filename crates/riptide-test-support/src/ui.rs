//! Progress UI double that records every call.

use std::sync::{Arc, Mutex, PoisonError};

use riptide_torrent_core::{ProgressDialog, ProgressUi};

/// One interaction with the progress UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A dialog was opened with this heading.
    Opened(String),
    /// The open dialog was updated.
    Updated {
        /// Percentage shown.
        percent: u8,
        /// Heading line.
        heading: String,
        /// Message line.
        message: String,
    },
    /// The dialog was closed.
    Closed,
}

/// [`ProgressUi`] that appends every interaction to a shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgressUi {
    events: Arc<Mutex<Vec<UiEvent>>>,
}

impl RecordingProgressUi {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every interaction so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the updates, as `(percent, heading, message)`.
    #[must_use]
    pub fn updates(&self) -> Vec<(u8, String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Updated {
                    percent,
                    heading,
                    message,
                } => Some((percent, heading, message)),
                _ => None,
            })
            .collect()
    }

    /// Whether a dialog is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        let events = self.events();
        let opened = events
            .iter()
            .filter(|event| matches!(event, UiEvent::Opened(_)))
            .count();
        let closed = events
            .iter()
            .filter(|event| matches!(event, UiEvent::Closed))
            .count();
        opened > closed
    }

    fn record(&self, event: UiEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ProgressUi for RecordingProgressUi {
    fn open(&self, heading: &str) -> Box<dyn ProgressDialog> {
        self.record(UiEvent::Opened(heading.to_string()));
        Box::new(RecordingDialog { ui: self.clone() })
    }
}

struct RecordingDialog {
    ui: RecordingProgressUi,
}

impl ProgressDialog for RecordingDialog {
    fn update(&mut self, percent: u8, heading: &str, message: &str) {
        self.ui.record(UiEvent::Updated {
            percent,
            heading: heading.to_string(),
            message: message.to_string(),
        });
    }

    fn close(self: Box<Self>) {
        self.ui.record(UiEvent::Closed);
    }
}
