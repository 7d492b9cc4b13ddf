//! Error types for passport extraction and the capture screen.

use thiserror::Error;

/// Failure of a single extraction attempt.
///
/// The cause is for logs only; the screen shows a generic message.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The model returned no text.
    #[error("empty response from model")]
    EmptyResponse,

    /// The model's text was not JSON matching the passport schema.
    #[error("failed to parse passport data: {0}")]
    Parse(String),

    /// HTTP, provider or transport failure.
    #[error("extraction request failed: {0}")]
    Transport(String),

    /// The image payload could not be read or decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

impl From<anyhow::Error> for ExtractionError {
    fn from(err: anyhow::Error) -> Self {
        ExtractionError::Transport(format!("{:#}", err))
    }
}

/// Camera could not be opened or read.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("no camera device available: {0}")]
    NoDevice(String),

    #[error("failed to capture frame: {0}")]
    Capture(String),
}

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("no clipboard command available")]
    Unavailable,

    #[error("clipboard write failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ControllerError {
    /// The action is not allowed in the current state (e.g. upload while
    /// processing).
    #[error("'{action}' is not allowed while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// User-facing error kinds. Every one of them is recoverable by retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorKind {
    CameraAccess,
    Extraction,
    Clipboard,
}

impl From<&ExtractionError> for AppErrorKind {
    fn from(_: &ExtractionError) -> Self {
        AppErrorKind::Extraction
    }
}

impl From<&CameraError> for AppErrorKind {
    fn from(_: &CameraError) -> Self {
        AppErrorKind::CameraAccess
    }
}

impl From<&ClipboardError> for AppErrorKind {
    fn from(_: &ClipboardError) -> Self {
        AppErrorKind::Clipboard
    }
}
