use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::error::CameraError;
use crate::settings::CameraSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear camera.
    Environment,
    /// Front camera.
    User,
}

pub trait CameraDevice: Send + Sync {
    fn open(&self, facing: Facing) -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live video stream. `stop_all` must be idempotent.
pub trait MediaStream: Send {
    fn grab_frame(&mut self) -> Result<DynamicImage, CameraError>;
    fn active_tracks(&self) -> usize;
    fn stop_all(&mut self);
}

/// Owns an open stream and stops every track when dropped.
pub struct StreamGuard {
    stream: Box<dyn MediaStream>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self { stream }
    }

    pub fn grab_frame(&mut self) -> Result<DynamicImage, CameraError> {
        self.stream.grab_frame()
    }

    pub fn active_tracks(&self) -> usize {
        self.stream.active_tracks()
    }

    /// Stops and releases the stream.
    pub fn release(self) {}
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stream.stop_all();
        debug!("camera stream released");
    }
}

impl std::fmt::Debug for StreamGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGuard")
            .field("active_tracks", &self.active_tracks())
            .finish()
    }
}

/// Grabs still frames from a V4L2 device through ffmpeg.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    rear_device: Option<PathBuf>,
    front_device: Option<PathBuf>,
}

impl CommandCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            program: settings.program.clone(),
            rear_device: settings.rear_device.as_ref().map(PathBuf::from),
            front_device: settings.front_device.as_ref().map(PathBuf::from),
        }
    }

    /// Preferred device first, the other one as fallback.
    fn candidates(&self, facing: Facing) -> Vec<&Path> {
        let (first, second) = match facing {
            Facing::Environment => (&self.rear_device, &self.front_device),
            Facing::User => (&self.front_device, &self.rear_device),
        };
        [first, second]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }
}

impl CameraDevice for CommandCamera {
    fn open(&self, facing: Facing) -> Result<Box<dyn MediaStream>, CameraError> {
        let device = self
            .candidates(facing)
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| CameraError::NoDevice("no configured video device exists".to_string()))?
            .to_path_buf();

        if let Err(err) = std::fs::File::open(&device) {
            if err.kind() == std::io::ErrorKind::PermissionDenied {
                return Err(CameraError::PermissionDenied(device.display().to_string()));
            }
            return Err(CameraError::NoDevice(format!("{}: {}", device.display(), err)));
        }
        if !command_exists(&self.program) {
            return Err(CameraError::NoDevice(format!(
                "'{}' is required to read {}",
                self.program,
                device.display()
            )));
        }

        debug!("camera opened: {}", device.display());
        Ok(Box::new(CommandStream {
            program: self.program.clone(),
            device,
            live: true,
        }))
    }
}

struct CommandStream {
    program: String,
    device: PathBuf,
    live: bool,
}

impl MediaStream for CommandStream {
    fn grab_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if !self.live {
            return Err(CameraError::Capture("stream already stopped".to_string()));
        }
        let device = self.device.to_string_lossy().to_string();
        let output = Command::new(&self.program)
            .args([
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-i",
                device.as_str(),
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-",
            ])
            .output()
            .map_err(|err| CameraError::Capture(format!("failed to run {}: {}", self.program, err)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CameraError::Capture(format!(
                "{} failed: {}",
                self.program,
                stderr.trim()
            )));
        }
        image::load_from_memory(&output.stdout)
            .map_err(|err| CameraError::Capture(format!("unreadable frame: {}", err)))
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live)
    }

    fn stop_all(&mut self) {
        if self.live {
            self.live = false;
            debug!("stopped video track on {}", self.device.display());
        }
    }
}

fn command_exists(cmd: &str) -> bool {
    match Command::new(cmd).arg("-version").output() {
        Ok(_) => true,
        Err(err) => {
            warn!("{} unavailable: {}", cmd, err);
            false
        }
    }
}
