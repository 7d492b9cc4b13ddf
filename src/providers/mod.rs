use anyhow::{Result, anyhow};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::data::ImagePayload;

mod gemini;
mod openai;

pub use gemini::Gemini;
pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => gemini::DEFAULT_MODEL,
            ProviderKind::OpenAI => openai::DEFAULT_MODEL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSelection {
    pub provider: ProviderKind,
    pub requested_model: Option<String>,
}

/// JSON Schema the model's reply must follow.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    /// Concatenated text parts of the reply; `None` when the model sent none.
    pub text: Option<String>,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

/// One part of the single user turn sent to the model.
#[derive(Debug, Clone)]
pub enum MessagePart {
    Text(String),
    Image(ImagePayload),
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

pub trait Provider: Clone + Send + Sync {
    fn append_user_input(self, input: String) -> Self;
    fn append_user_image(self, image: ImagePayload) -> Self;
    fn with_response_schema(self, schema: ResponseSchema) -> Self;
    fn generate(self) -> ProviderFuture;
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    Gemini(Gemini),
    OpenAI(OpenAI),
}

impl Provider for ProviderImpl {
    fn append_user_input(self, input: String) -> Self {
        match self {
            ProviderImpl::Gemini(provider) => {
                ProviderImpl::Gemini(provider.append_user_input(input))
            }
            ProviderImpl::OpenAI(provider) => {
                ProviderImpl::OpenAI(provider.append_user_input(input))
            }
        }
    }

    fn append_user_image(self, image: ImagePayload) -> Self {
        match self {
            ProviderImpl::Gemini(provider) => {
                ProviderImpl::Gemini(provider.append_user_image(image))
            }
            ProviderImpl::OpenAI(provider) => {
                ProviderImpl::OpenAI(provider.append_user_image(image))
            }
        }
    }

    fn with_response_schema(self, schema: ResponseSchema) -> Self {
        match self {
            ProviderImpl::Gemini(provider) => {
                ProviderImpl::Gemini(provider.with_response_schema(schema))
            }
            ProviderImpl::OpenAI(provider) => {
                ProviderImpl::OpenAI(provider.with_response_schema(schema))
            }
        }
    }

    fn generate(self) -> ProviderFuture {
        match self {
            ProviderImpl::Gemini(provider) => provider.generate(),
            ProviderImpl::OpenAI(provider) => provider.generate(),
        }
    }
}

pub fn build_provider(provider: ProviderKind, key: String, model: String) -> ProviderImpl {
    match provider {
        ProviderKind::Gemini => ProviderImpl::Gemini(Gemini::new(key).with_model(model)),
        ProviderKind::OpenAI => ProviderImpl::OpenAI(OpenAI::new(key).with_model(model)),
    }
}

pub fn resolve_provider_selection(
    model_arg: Option<&str>,
    override_key: Option<&str>,
) -> Result<ProviderSelection> {
    match model_arg {
        Some(model) => parse_model_arg(model),
        None => default_provider_selection(override_key),
    }
}

pub fn resolve_key(provider: ProviderKind, override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key {
        return Ok(key.to_string());
    }

    match provider {
        ProviderKind::Gemini => get_env("GEMINI_API_KEY").or_else(|| get_env("GOOGLE_API_KEY")),
        ProviderKind::OpenAI => get_env("OPENAI_API_KEY"),
    }
    .ok_or_else(|| anyhow!("API key not found for provider {}", provider.as_str()))
}

fn default_provider_selection(override_key: Option<&str>) -> Result<ProviderSelection> {
    if get_env("GEMINI_API_KEY").is_some() || get_env("GOOGLE_API_KEY").is_some() {
        return Ok(ProviderSelection {
            provider: ProviderKind::Gemini,
            requested_model: None,
        });
    }

    if get_env("OPENAI_API_KEY").is_some() {
        return Ok(ProviderSelection {
            provider: ProviderKind::OpenAI,
            requested_model: None,
        });
    }

    if override_key.is_some() {
        return Ok(ProviderSelection {
            provider: ProviderKind::Gemini,
            requested_model: None,
        });
    }

    Err(anyhow!(
        "no API keys found (checked GEMINI_API_KEY/GOOGLE_API_KEY, OPENAI_API_KEY)"
    ))
}

fn parse_model_arg(model_arg: &str) -> Result<ProviderSelection> {
    let raw = model_arg.trim();
    if raw.is_empty() {
        return Err(anyhow!("model argument is empty"));
    }

    let lower = raw.to_lowercase();
    if let Some(provider) = provider_from_name(&lower) {
        return Ok(ProviderSelection {
            provider,
            requested_model: None,
        });
    }

    if let Some((provider, model)) = parse_provider_model_pair(raw) {
        return Ok(ProviderSelection {
            provider,
            requested_model: model,
        });
    }

    if lower.starts_with("gemini") {
        return Ok(ProviderSelection {
            provider: ProviderKind::Gemini,
            requested_model: Some(raw.to_string()),
        });
    }
    if lower.starts_with("gpt-") || lower.starts_with("o3") || lower.starts_with("o4") {
        return Ok(ProviderSelection {
            provider: ProviderKind::OpenAI,
            requested_model: Some(raw.to_string()),
        });
    }

    Err(anyhow!(
        "unable to infer provider from model '{}'. Use provider:model (gemini:, openai:)",
        raw
    ))
}

fn parse_provider_model_pair(input: &str) -> Option<(ProviderKind, Option<String>)> {
    let (provider_part, model_part) = input.split_once(':')?;
    let provider = provider_from_name(&provider_part.to_lowercase())?;
    let model = if model_part.trim().is_empty() {
        None
    } else {
        Some(model_part.trim().to_string())
    };
    Some((provider, model))
}

fn provider_from_name(name: &str) -> Option<ProviderKind> {
    match name {
        "gemini" | "google" => Some(ProviderKind::Gemini),
        "openai" => Some(ProviderKind::OpenAI),
        _ => None,
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub(crate) fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(kind) = kind
        && !kind.trim().is_empty()
    {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code
        && !code.trim().is_empty()
    {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}
