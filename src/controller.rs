//! Capture/upload state machine behind the passport screen.
//!
//! `Idle -> CameraOpen -> Processing -> Idle` for the camera and
//! `Idle -> Processing -> Idle` for uploads. Entering `Processing` hands out
//! the image; the caller runs the extraction and reports back with
//! [`CaptureController::finish`].

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::camera::{CameraDevice, Facing, StreamGuard};
use crate::data::ImagePayload;
use crate::error::{AppErrorKind, ControllerError, ExtractionError};
use crate::extractor::{ExtractionOutput, Extractor};
use crate::lines::LineFormatter;
use crate::passport::{FormattedResult, PassportFields};
use crate::providers::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    CameraOpen,
    Processing,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::CameraOpen => "camera open",
            CaptureState::Processing => "processing",
        }
    }
}

pub struct CaptureController {
    camera: Arc<dyn CameraDevice>,
    formatter: LineFormatter,
    state: CaptureState,
    stream: Option<StreamGuard>,
    preview: Option<String>,
    result: Option<FormattedResult>,
    error: Option<AppErrorKind>,
}

impl CaptureController {
    pub fn new(camera: Arc<dyn CameraDevice>, formatter: LineFormatter) -> Self {
        Self {
            camera,
            formatter,
            state: CaptureState::Idle,
            stream: None,
            preview: None,
            result: None,
            error: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == CaptureState::Processing
    }

    pub fn is_camera_open(&self) -> bool {
        self.state == CaptureState::CameraOpen
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn result(&self) -> Option<&FormattedResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<AppErrorKind> {
        self.error
    }

    /// Tracks held by the open stream; zero whenever the camera is closed.
    pub fn active_tracks(&self) -> usize {
        self.stream
            .as_ref()
            .map(StreamGuard::active_tracks)
            .unwrap_or(0)
    }

    pub fn start_camera(&mut self) -> Result<(), ControllerError> {
        self.expect_state(CaptureState::Idle, "start camera")?;
        self.clear();
        match self.camera.open(Facing::Environment) {
            Ok(stream) => {
                self.stream = Some(StreamGuard::new(stream));
                self.state = CaptureState::CameraOpen;
                debug!("camera opened");
            }
            Err(err) => {
                warn!("camera unavailable: {}", err);
                self.error = Some(AppErrorKind::from(&err));
            }
        }
        Ok(())
    }

    pub fn stop_camera(&mut self) -> Result<(), ControllerError> {
        self.expect_state(CaptureState::CameraOpen, "stop camera")?;
        self.release_stream();
        self.state = CaptureState::Idle;
        Ok(())
    }

    /// Grabs the current frame and releases the camera.
    ///
    /// Returns the JPEG to extract from, or `None` when no frame could be read.
    pub fn capture(&mut self) -> Result<Option<ImagePayload>, ControllerError> {
        self.expect_state(CaptureState::CameraOpen, "capture")?;
        let frame = match self.stream.as_mut() {
            Some(stream) => stream.grab_frame(),
            None => Err(crate::error::CameraError::Capture(
                "camera stream is missing".to_string(),
            )),
        };
        self.release_stream();
        self.state = CaptureState::Idle;

        let image = frame
            .map_err(|err| {
                warn!("camera capture failed: {}", err);
                AppErrorKind::from(&err)
            })
            .and_then(|frame| {
                ImagePayload::from_frame(&frame).map_err(|err| {
                    warn!("failed to encode captured frame: {:#}", err);
                    AppErrorKind::CameraAccess
                })
            });
        match image {
            Ok(image) => self.begin_processing(image).map(Some),
            Err(kind) => {
                self.error = Some(kind);
                Ok(None)
            }
        }
    }

    /// Reads an image file and enters `Processing`.
    pub fn upload(&mut self, path: &Path) -> Result<Option<ImagePayload>, ControllerError> {
        self.expect_state(CaptureState::Idle, "upload")?;
        match ImagePayload::from_path(path) {
            Ok(image) => self.begin_processing(image).map(Some),
            Err(err) => {
                self.clear();
                error!("failed to load {}: {:#}", path.display(), err);
                self.error = Some(AppErrorKind::Extraction);
                Ok(None)
            }
        }
    }

    /// Enters `Processing` with an image that is already in memory.
    ///
    /// Prior result and error are cleared; the preview is set right away.
    pub fn begin_processing(&mut self, image: ImagePayload) -> Result<ImagePayload, ControllerError> {
        self.expect_state(CaptureState::Idle, "submit image")?;
        self.result = None;
        self.error = None;
        self.preview = Some(image.preview_uri());
        self.state = CaptureState::Processing;
        debug!("processing {} bytes", image.bytes.len());
        Ok(image)
    }

    /// Ends the attempt. Always returns to `Idle`.
    pub fn finish(
        &mut self,
        outcome: Result<PassportFields, ExtractionError>,
    ) -> Result<(), ControllerError> {
        self.expect_state(CaptureState::Processing, "finish")?;
        match outcome {
            Ok(fields) => {
                self.result = Some(self.formatter.format(&fields));
                self.error = None;
            }
            Err(err) => {
                error!("passport extraction failed: {}", err);
                self.result = None;
                self.error = Some(AppErrorKind::from(&err));
            }
        }
        self.state = CaptureState::Idle;
        Ok(())
    }

    /// Runs the extraction for an image handed out by `capture`/`upload` and
    /// finishes the attempt.
    pub async fn process<P: Provider + Clone>(
        &mut self,
        extractor: &Extractor<P>,
        image: ImagePayload,
    ) -> Result<Option<ExtractionOutput>, ControllerError> {
        self.expect_state(CaptureState::Processing, "process")?;
        match extractor.extract(image).await {
            Ok(output) => {
                self.finish(Ok(output.fields.clone()))?;
                Ok(Some(output))
            }
            Err(err) => {
                self.finish(Err(err))?;
                Ok(None)
            }
        }
    }

    /// "Start over": drops result, preview and error.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        self.expect_state(CaptureState::Idle, "start over")?;
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.result = None;
        self.preview = None;
        self.error = None;
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }

    fn expect_state(&self, expected: CaptureState, action: &'static str) -> Result<(), ControllerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                action,
                state: self.state.as_str(),
            })
        }
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("state", &self.state)
            .field("stream", &self.stream)
            .field("has_preview", &self.preview.is_some())
            .field("result", &self.result)
            .field("error", &self.error)
            .finish()
    }
}
