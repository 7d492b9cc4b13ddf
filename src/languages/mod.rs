use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppErrorKind;

include!(concat!(env!("OUT_DIR"), "/embedded_locales.rs"));

pub const DEFAULT_LOCALE: &str = "en";

/// Every label and user-facing message of the screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    pub title: String,
    pub subtitle: String,
    pub upload: String,
    pub camera: String,
    pub processing: String,
    pub capture: String,
    pub cancel: String,
    pub error_title: String,
    pub camera_error: String,
    pub extraction_error: String,
    pub line1_label: String,
    pub line2_label: String,
    pub copy: String,
    pub copied: String,
    pub start_over: String,
    pub preview_alt: String,
}

impl Messages {
    /// Banner text for an error kind. Clipboard failures never show one.
    pub fn banner(&self, kind: AppErrorKind) -> Option<&str> {
        match kind {
            AppErrorKind::CameraAccess => Some(&self.camera_error),
            AppErrorKind::Extraction => Some(&self.extraction_error),
            AppErrorKind::Clipboard => None,
        }
    }

    fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Result<()> {
        if overrides.is_empty() {
            return Ok(());
        }
        let mut value = serde_json::to_value(&*self)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| anyhow!("messages must serialize to an object"))?;
        for (key, text) in overrides {
            if !object.contains_key(key) {
                return Err(anyhow!("unknown message key '{}'", key));
            }
            if !text.trim().is_empty() {
                object.insert(key.clone(), serde_json::Value::String(text.clone()));
            }
        }
        *self = serde_json::from_value(value)?;
        Ok(())
    }
}

pub fn available_locales() -> &'static [&'static str] {
    EMBEDDED_LOCALES
}

pub fn load_messages(lang: &str, overrides: &HashMap<String, String>) -> Result<Messages> {
    let mut messages = load_locale(lang)?;
    messages.apply_overrides(overrides)?;
    Ok(messages)
}

fn load_locale(lang: &str) -> Result<Messages> {
    let code = normalize_code(lang);
    let raw = embedded_locale(&code).ok_or_else(|| {
        anyhow!(
            "unsupported ui language '{}' (available: {})",
            lang,
            available_locales().join(", ")
        )
    })?;
    let parsed: LocaleFile =
        toml::from_str(raw).with_context(|| format!("failed to parse locale: {}", code))?;
    Ok(parsed.messages)
}

fn normalize_code(code: &str) -> String {
    let code = code.trim().to_lowercase();
    match code.as_str() {
        "eng" | "english" => "en".to_string(),
        "ara" | "arabic" => "ar".to_string(),
        _ => code,
    }
}

#[derive(Debug, Deserialize)]
struct LocaleFile {
    messages: Messages,
}
