use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::clipboard::Clipboard;
use crate::controller::CaptureController;
use crate::languages::Messages;
use crate::passport::FormattedResult;

pub const DEFAULT_COPY_ACK: Duration = Duration::from_millis(2000);

/// One copyable output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub label: String,
    pub value: String,
    copied_at: Option<Instant>,
}

impl ResultRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            copied_at: None,
        }
    }

    /// Copies the value. Failures are logged only; the row just does not show
    /// the acknowledgement.
    pub fn copy(&mut self, clipboard: &dyn Clipboard, now: Instant) -> bool {
        match clipboard.write_text(&self.value) {
            Ok(()) => {
                self.copied_at = Some(now);
                true
            }
            Err(err) => {
                warn!("failed to copy text: {}", err);
                false
            }
        }
    }

    pub fn is_acknowledged(&self, now: Instant, ack: Duration) -> bool {
        self.copied_at
            .map(|at| now.saturating_duration_since(at) < ack)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryControls {
    pub upload_label: String,
    pub camera_label: String,
    pub disabled: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraControls {
    pub capture_label: String,
    pub cancel_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub label: String,
    pub value: String,
    pub copied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsPanel {
    pub preview: Option<String>,
    pub rows: Vec<RowView>,
    pub start_over_label: String,
}

/// Everything the screen shows at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub title: String,
    pub subtitle: String,
    pub entry: Option<EntryControls>,
    pub camera: Option<CameraControls>,
    pub error: Option<ErrorBanner>,
    pub results: Option<ResultsPanel>,
}

/// Derives [`Screen`]s from the controller and owns the copy rows.
#[derive(Debug, Clone)]
pub struct Presenter {
    messages: Messages,
    copy_ack: Duration,
    rows: Vec<ResultRow>,
}

impl Presenter {
    pub fn new(messages: Messages, copy_ack: Duration) -> Self {
        Self {
            messages,
            copy_ack,
            rows: Vec::new(),
        }
    }

    pub fn screen(&mut self, controller: &CaptureController, now: Instant) -> Screen {
        self.sync_rows(controller.result());
        let messages = &self.messages;
        let loading = controller.is_loading();

        let entry = (!controller.is_camera_open()).then(|| EntryControls {
            upload_label: if loading {
                messages.processing.clone()
            } else {
                messages.upload.clone()
            },
            camera_label: if loading {
                messages.processing.clone()
            } else {
                messages.camera.clone()
            },
            disabled: loading,
            loading,
        });
        let camera = controller.is_camera_open().then(|| CameraControls {
            capture_label: messages.capture.clone(),
            cancel_label: messages.cancel.clone(),
        });
        let error = controller
            .error()
            .and_then(|kind| messages.banner(kind))
            .map(|message| ErrorBanner {
                title: messages.error_title.clone(),
                message: message.to_string(),
            });
        let show_results = !self.rows.is_empty() && !loading && !controller.is_camera_open();
        let results = show_results.then(|| ResultsPanel {
            preview: controller.preview().map(str::to_string),
            rows: self
                .rows
                .iter()
                .map(|row| RowView {
                    label: row.label.clone(),
                    value: row.value.clone(),
                    copied: row.is_acknowledged(now, self.copy_ack),
                })
                .collect(),
            start_over_label: messages.start_over.clone(),
        });

        Screen {
            title: messages.title.clone(),
            subtitle: messages.subtitle.clone(),
            entry,
            camera,
            error,
            results,
        }
    }

    /// Copies line `index` (0 or 1) of the current result.
    pub fn copy_line(
        &mut self,
        controller: &CaptureController,
        index: usize,
        clipboard: &dyn Clipboard,
        now: Instant,
    ) -> bool {
        self.sync_rows(controller.result());
        match self.rows.get_mut(index) {
            Some(row) => row.copy(clipboard, now),
            None => false,
        }
    }

    fn sync_rows(&mut self, result: Option<&FormattedResult>) {
        let Some(result) = result else {
            self.rows.clear();
            return;
        };
        let current = [result.line1.as_str(), result.line2.as_str()];
        let unchanged = self.rows.len() == current.len()
            && self
                .rows
                .iter()
                .zip(current)
                .all(|(row, value)| row.value == value);
        if !unchanged {
            self.rows = vec![
                ResultRow::new(self.messages.line1_label.clone(), result.line1.clone()),
                ResultRow::new(self.messages.line2_label.clone(), result.line2.clone()),
            ];
        }
    }
}

/// Plain-text rendering for the terminal.
pub fn render_text(screen: &Screen) -> String {
    let mut lines = Vec::new();
    lines.push(format!("== {} ==", screen.title));
    lines.push(screen.subtitle.clone());
    lines.push(String::new());

    if let Some(entry) = &screen.entry {
        let state = if entry.disabled { " (disabled)" } else { "" };
        lines.push(format!("[/upload <path>] {}{}", entry.upload_label, state));
        lines.push(format!("[/camera] {}{}", entry.camera_label, state));
    }
    if let Some(camera) = &screen.camera {
        lines.push("(camera is live)".to_string());
        lines.push(format!("[/capture] {}", camera.capture_label));
        lines.push(format!("[/cancel] {}", camera.cancel_label));
    }
    if let Some(error) = &screen.error {
        lines.push(String::new());
        lines.push(format!("! {}: {}", error.title, error.message));
    }
    if let Some(results) = &screen.results {
        lines.push(String::new());
        if let Some(preview) = &results.preview {
            lines.push(format!("[preview: {}]", describe_preview(preview)));
        }
        for (index, row) in results.rows.iter().enumerate() {
            let mark = if row.copied { " \u{2713}" } else { "" };
            lines.push(row.label.clone());
            lines.push(format!("  {}  [/copy {}]{}", row.value, index + 1, mark));
        }
        lines.push(format!("[/reset] {}", results.start_over_label));
    }
    lines.join("\n")
}

fn describe_preview(preview: &str) -> String {
    match preview
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime, data)) => format!("{}, {} KiB", mime, data.len() * 3 / 4 / 1024),
        None => preview.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ImagePayload, sample_png};
    use crate::error::ExtractionError;
    use crate::languages::{DEFAULT_LOCALE, load_messages};
    use crate::lines::LineFormatter;
    use crate::passport::PassportFields;
    use crate::test_util::{FakeCamera, FakeClipboard, SMITH_JSON};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn presenter() -> Presenter {
        Presenter::new(
            load_messages(DEFAULT_LOCALE, &HashMap::new()).unwrap(),
            DEFAULT_COPY_ACK,
        )
    }

    fn controller() -> CaptureController {
        CaptureController::new(Arc::new(FakeCamera::default()), LineFormatter::default())
    }

    fn image() -> ImagePayload {
        ImagePayload::from_bytes(sample_png(), Some("passport.png")).unwrap()
    }

    fn with_result() -> CaptureController {
        let mut controller = controller();
        controller.begin_processing(image()).unwrap();
        let fields: PassportFields = serde_json::from_str(SMITH_JSON).unwrap();
        controller.finish(Ok(fields)).unwrap();
        controller
    }

    #[test]
    fn idle_screen_offers_entry_controls() {
        let screen = presenter().screen(&controller(), Instant::now());
        let entry = screen.entry.unwrap();
        assert!(!entry.disabled);
        assert_eq!(entry.upload_label, "Upload an image from this device");
        assert!(screen.camera.is_none());
        assert!(screen.error.is_none());
        assert!(screen.results.is_none());
    }

    #[test]
    fn processing_disables_entry_controls() {
        let mut controller = controller();
        controller.begin_processing(image()).unwrap();
        let screen = presenter().screen(&controller, Instant::now());
        let entry = screen.entry.unwrap();
        assert!(entry.disabled);
        assert!(entry.loading);
        assert_eq!(entry.camera_label, "Processing...");
        assert!(screen.results.is_none());
    }

    #[test]
    fn open_camera_replaces_entry_controls() {
        let mut controller = controller();
        controller.start_camera().unwrap();
        let screen = presenter().screen(&controller, Instant::now());
        assert!(screen.entry.is_none());
        assert_eq!(screen.camera.unwrap().capture_label, "Capture");
    }

    #[test]
    fn extraction_error_shows_generic_banner() {
        let mut controller = controller();
        controller.begin_processing(image()).unwrap();
        controller
            .finish(Err(ExtractionError::Parse("secret cause".to_string())))
            .unwrap();
        let screen = presenter().screen(&controller, Instant::now());
        let banner = screen.error.unwrap();
        assert_eq!(banner.title, "Error");
        assert!(!banner.message.contains("secret cause"));
        assert!(banner.message.contains("try again"));
    }

    #[test]
    fn results_panel_lists_both_lines() {
        let screen = presenter().screen(&with_result(), Instant::now());
        let results = screen.results.unwrap();
        assert!(results.preview.is_some());
        assert_eq!(results.rows.len(), 2);
        assert_eq!(results.rows[0].value, "SMITH / JOHN");
        assert_eq!(results.rows[1].label, "Line 2 (data):");
        assert!(results.rows.iter().all(|row| !row.copied));
    }

    #[test]
    fn copy_acknowledgement_reverts_after_delay() {
        let controller = with_result();
        let mut presenter = presenter();
        let clipboard = FakeClipboard::default();
        let start = Instant::now();

        assert!(presenter.copy_line(&controller, 1, &clipboard, start));
        assert_eq!(
            *clipboard.written.lock().unwrap(),
            vec!["srdocsyyHK1-P-EGY-BW13172-EGY-12JUL70-F-09JUL30-SMITH / JOHN".to_string()]
        );

        let rows = presenter.screen(&controller, start).results.unwrap().rows;
        assert!(!rows[0].copied);
        assert!(rows[1].copied);

        let later = start + DEFAULT_COPY_ACK + Duration::from_millis(1);
        let rows = presenter.screen(&controller, later).results.unwrap().rows;
        assert!(!rows[1].copied);
    }

    #[test]
    fn clipboard_failure_is_silent() {
        let controller = with_result();
        let mut presenter = presenter();
        let clipboard = FakeClipboard {
            fail: true,
            ..FakeClipboard::default()
        };
        let now = Instant::now();
        assert!(!presenter.copy_line(&controller, 0, &clipboard, now));
        let screen = presenter.screen(&controller, now);
        assert!(screen.error.is_none());
        assert!(!screen.results.unwrap().rows[0].copied);
    }

    #[test]
    fn copy_without_result_does_nothing() {
        let clipboard = FakeClipboard::default();
        assert!(!presenter().copy_line(&controller(), 0, &clipboard, Instant::now()));
        assert!(clipboard.written.lock().unwrap().is_empty());
    }

    #[test]
    fn renders_results_for_terminal() {
        let mut presenter = presenter();
        let controller = with_result();
        let now = Instant::now();
        presenter.copy_line(&controller, 0, &FakeClipboard::default(), now);
        let text = render_text(&presenter.screen(&controller, now));
        assert!(text.contains("== Passport Reader (AI) =="));
        assert!(text.contains("  SMITH / JOHN  [/copy 1] \u{2713}"));
        assert!(text.contains("[/copy 2]"));
        assert!(text.contains("[preview: image/png, "));
        assert!(text.contains("[/reset] Clear and start over"));
    }
}
