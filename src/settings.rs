use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dates::UNKNOWN_DATE;
use crate::languages::DEFAULT_LOCALE;
use crate::lines::{DEFAULT_LINE_PREFIX, LineFormatter};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8787";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub line_prefix: String,
    pub unknown_date: String,
    pub lang: String,
    pub copy_ack_ms: u64,
    pub messages: HashMap<String, String>,
    pub camera: CameraSettings,
    pub clipboard_command: Option<String>,
    pub model: Option<String>,
    pub server_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub program: String,
    pub rear_device: Option<String>,
    pub front_device: Option<String>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            rear_device: None,
            front_device: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            line_prefix: DEFAULT_LINE_PREFIX.to_string(),
            unknown_date: UNKNOWN_DATE.to_string(),
            lang: DEFAULT_LOCALE.to_string(),
            copy_ack_ms: 2000,
            messages: HashMap::new(),
            camera: CameraSettings::default(),
            clipboard_command: None,
            model: None,
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    format: Option<FormatSection>,
    ui: Option<UiSection>,
    messages: Option<HashMap<String, String>>,
    camera: Option<CameraSection>,
    clipboard: Option<ClipboardSection>,
    extraction: Option<ExtractionSection>,
    server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FormatSection {
    line_prefix: Option<String>,
    unknown_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UiSection {
    lang: Option<String>,
    copy_ack_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CameraSection {
    program: Option<String>,
    rear_device: Option<String>,
    front_device: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClipboardSection {
    command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionSection {
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
}

/// Loads the built-in defaults, then every settings file that exists, in
/// increasing priority. `extra_path` must exist when given.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }
    load_settings_from(&ordered_paths)
}

pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).context("failed to parse built-in settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn formatter(&self) -> LineFormatter {
        LineFormatter::new(self.line_prefix.clone(), self.unknown_date.clone())
    }

    pub fn copy_ack(&self) -> Duration {
        Duration::from_millis(self.copy_ack_ms)
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(format) = incoming.format {
            if let Some(prefix) = format.line_prefix {
                self.line_prefix = prefix;
            }
            if let Some(unknown) = non_blank(format.unknown_date) {
                self.unknown_date = unknown;
            }
        }
        if let Some(ui) = incoming.ui {
            if let Some(lang) = non_blank(ui.lang) {
                self.lang = lang;
            }
            if let Some(ms) = ui.copy_ack_ms {
                self.copy_ack_ms = ms;
            }
        }
        if let Some(map) = incoming.messages {
            for (key, value) in map {
                self.messages.insert(key, value);
            }
        }
        if let Some(camera) = incoming.camera {
            if let Some(program) = non_blank(camera.program) {
                self.camera.program = program;
            }
            if let Some(device) = non_blank(camera.rear_device) {
                self.camera.rear_device = Some(device);
            }
            if let Some(device) = non_blank(camera.front_device) {
                self.camera.front_device = Some(device);
            }
        }
        if let Some(command) = incoming.clipboard.and_then(|section| non_blank(section.command)) {
            self.clipboard_command = Some(command);
        }
        if let Some(model) = incoming.extraction.and_then(|section| non_blank(section.model)) {
            self.model = Some(model);
        }
        if let Some(addr) = incoming.server.and_then(|section| non_blank(section.addr)) {
            self.server_addr = addr;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".passport-reader"))
        }
    })
}
