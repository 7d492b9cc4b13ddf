use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use image::DynamicImage;

use crate::camera::{CameraDevice, Facing, MediaStream};
use crate::clipboard::Clipboard;
use crate::data::ImagePayload;
use crate::error::{CameraError, ClipboardError};
use crate::providers::{Provider, ProviderFuture, ProviderResponse, ResponseSchema};

pub(crate) const SMITH_JSON: &str = r#"{"surname":"SMITH","givenNames":"JOHN","passportNumber":"bw13172","nationality":"egy","dateOfBirth":"1970-07-12","sex":"f","dateOfExpiry":"2030-07-09","issuingCountry":"egy"}"#;

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedRequest {
    pub(crate) texts: Vec<String>,
    pub(crate) images: Vec<ImagePayload>,
    pub(crate) schema_name: Option<String>,
}

#[derive(Debug, Clone)]
enum Reply {
    Text(Option<String>),
    Fail(String),
}

/// Provider that records the request and answers with a canned reply.
#[derive(Debug, Clone)]
pub(crate) struct FakeProvider {
    reply: Reply,
    current: RecordedRequest,
    sent: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeProvider {
    pub(crate) fn replying(text: Option<&str>) -> Self {
        Self {
            reply: Reply::Text(text.map(str::to_string)),
            current: RecordedRequest::default(),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Reply::Fail(message.to_string()),
            current: RecordedRequest::default(),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn last_request(&self) -> Option<RecordedRequest> {
        self.sent.lock().expect("sent lock").last().cloned()
    }
}

impl Provider for FakeProvider {
    fn append_user_input(mut self, input: String) -> Self {
        self.current.texts.push(input);
        self
    }

    fn append_user_image(mut self, image: ImagePayload) -> Self {
        self.current.images.push(image);
        self
    }

    fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
        self.current.schema_name = Some(schema.name);
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            self.sent
                .lock()
                .expect("sent lock")
                .push(self.current.clone());
            match self.reply {
                Reply::Text(text) => Ok(ProviderResponse {
                    text,
                    model: Some("fake-model".to_string()),
                    usage: None,
                }),
                Reply::Fail(message) => Err(anyhow!(message)),
            }
        })
    }
}

/// Camera whose open streams are counted in a shared gauge.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeCamera {
    pub(crate) active_tracks: Arc<AtomicUsize>,
    pub(crate) deny: bool,
    pub(crate) fail_capture: bool,
    pub(crate) opened_with: Arc<Mutex<Vec<Facing>>>,
}

impl FakeCamera {
    pub(crate) fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub(crate) fn active(&self) -> usize {
        self.active_tracks.load(Ordering::SeqCst)
    }
}

impl CameraDevice for FakeCamera {
    fn open(&self, facing: Facing) -> Result<Box<dyn MediaStream>, CameraError> {
        self.opened_with.lock().expect("facing lock").push(facing);
        if self.deny {
            return Err(CameraError::PermissionDenied("denied by test".to_string()));
        }
        self.active_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            gauge: self.active_tracks.clone(),
            live: true,
            fail_capture: self.fail_capture,
        }))
    }
}

struct FakeStream {
    gauge: Arc<AtomicUsize>,
    live: bool,
    fail_capture: bool,
}

impl MediaStream for FakeStream {
    fn grab_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if self.fail_capture {
            return Err(CameraError::Capture("no frame".to_string()));
        }
        Ok(DynamicImage::new_rgb8(16, 12))
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live)
    }

    fn stop_all(&mut self) {
        if self.live {
            self.live = false;
            self.gauge.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeClipboard {
    pub(crate) fail: bool,
    pub(crate) written: Arc<Mutex<Vec<String>>>,
}

impl Clipboard for FakeClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError::Failed("denied by test".to_string()));
        }
        self.written
            .lock()
            .expect("clipboard lock")
            .push(text.to_string());
        Ok(())
    }
}
