use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tracing::{debug, error};

pub mod camera;
pub mod clipboard;
pub mod controller;
pub mod data;
pub mod dates;
pub mod error;
pub mod extraction;
pub mod extractor;
pub mod languages;
pub mod lines;
pub mod logging;
pub mod passport;
mod providers;
pub mod server;
pub mod settings;
pub mod view;

#[cfg(test)]
mod test_util;

pub use data::ImagePayload;
pub use extractor::{ExtractionOutput, Extractor};
pub use lines::{LineFormatter, format_lines};
pub use passport::{FormattedResult, PassportFields};
pub use providers::{Gemini, OpenAI, Provider, ProviderImpl, ProviderKind, ProviderUsage};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub lang: Option<String>,
    pub with_using_tokens: bool,
    pub with_using_model: bool,
    pub json: bool,
}

impl Config {
    /// Layered settings with `--lang` applied on top.
    pub fn load_settings(&self) -> Result<settings::Settings> {
        let mut settings = settings::load_settings(self.settings_path.as_deref().map(Path::new))?;
        if let Some(lang) = self.lang.as_deref().filter(|lang| !lang.trim().is_empty()) {
            settings.lang = lang.to_string();
        }
        Ok(settings)
    }
}

/// Picks the provider and model from `--model`/`--key`, then `[extraction]
/// model`, then whichever API key is set.
pub fn connect(config: &Config, settings: &settings::Settings) -> Result<ProviderImpl> {
    let model_arg = config.model.as_deref().or(settings.model.as_deref());
    let selection = providers::resolve_provider_selection(model_arg, config.key.as_deref())?;
    let key = providers::resolve_key(selection.provider, config.key.as_deref())
        .with_context(|| "no API key found for selected provider")?;
    let model = selection
        .requested_model
        .unwrap_or_else(|| selection.provider.default_model().to_string());
    debug!("using {}:{}", selection.provider.as_str(), model);
    Ok(providers::build_provider(selection.provider, key, model))
}

/// One-shot extraction of a single image.
pub async fn run(config: Config, image: ImagePayload) -> Result<String> {
    let settings = config.load_settings()?;
    let messages = languages::load_messages(&settings.lang, &settings.messages)?;
    let provider = connect(&config, &settings)?;
    let output = extract_once(&Extractor::new(provider), &messages, image).await?;
    let lines = settings.formatter().format(&output.fields);
    format_run_output(&config, &output, &lines)
}

/// Runs one extraction. The cause of a failure is logged and the caller only
/// gets the localized generic message.
pub async fn extract_once<P: Provider + Clone>(
    extractor: &Extractor<P>,
    messages: &languages::Messages,
    image: ImagePayload,
) -> Result<ExtractionOutput> {
    extractor.extract(image).await.map_err(|err| {
        error!("passport extraction failed: {}", err);
        anyhow!("{}", messages.extraction_error)
    })
}

pub fn format_run_output(
    config: &Config,
    output: &ExtractionOutput,
    lines: &FormattedResult,
) -> Result<String> {
    if config.json {
        let value = serde_json::json!({
            "line1": lines.line1,
            "line2": lines.line2,
            "fields": output.fields,
            "model": output.model,
            "usage": output.usage,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut output_lines = vec![lines.line1.clone(), lines.line2.clone()];
    if config.with_using_model {
        let model = output.model.as_deref().unwrap_or("unavailable");
        output_lines.push(format!("model: {}", model));
    }
    if config.with_using_tokens {
        output_lines.push(format_usage(output.usage.as_ref()));
    }
    Ok(output_lines.join("\n"))
}

pub fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "tokens: unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_png;
    use crate::test_util::{FakeProvider, SMITH_JSON};
    use std::collections::HashMap;

    fn output() -> ExtractionOutput {
        ExtractionOutput {
            fields: serde_json::from_str(SMITH_JSON).unwrap(),
            model: Some("gemini-2.5-flash".to_string()),
            usage: Some(ProviderUsage {
                prompt_tokens: Some(1290),
                completion_tokens: Some(64),
                total_tokens: None,
            }),
        }
    }

    #[test]
    fn plain_output_is_two_lines() {
        let output = output();
        let lines = format_lines(&output.fields);
        let text = format_run_output(&Config::default(), &output, &lines).unwrap();
        assert_eq!(
            text,
            "SMITH / JOHN\nsrdocsyyHK1-P-EGY-BW13172-EGY-12JUL70-F-09JUL30-SMITH / JOHN"
        );
    }

    #[test]
    fn appends_model_and_tokens() {
        let output = output();
        let lines = format_lines(&output.fields);
        let config = Config {
            with_using_model: true,
            with_using_tokens: true,
            ..Config::default()
        };
        let text = format_run_output(&config, &output, &lines).unwrap();
        let tail = text.lines().skip(2).collect::<Vec<_>>();
        assert_eq!(
            tail,
            vec![
                "model: gemini-2.5-flash",
                "tokens: prompt=1290, completion=64, total=1354"
            ]
        );
    }

    #[test]
    fn json_output_contains_fields() {
        let output = output();
        let lines = format_lines(&output.fields);
        let config = Config {
            json: true,
            ..Config::default()
        };
        let text = format_run_output(&config, &output, &lines).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["line1"], "SMITH / JOHN");
        assert_eq!(value["fields"]["passportNumber"], "bw13172");
        assert_eq!(value["usage"]["prompt_tokens"], 1290);
    }

    #[test]
    fn usage_without_numbers_is_unavailable() {
        assert_eq!(format_usage(None), "tokens: unavailable");
        let empty = ProviderUsage {
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
        };
        assert_eq!(format_usage(Some(&empty)), "tokens: unavailable");
    }

    #[test]
    fn connect_uses_settings_model_and_key_override() {
        let settings = settings::Settings {
            model: Some("openai:gpt-4.1-mini".to_string()),
            ..settings::Settings::default()
        };
        let config = Config {
            key: Some("test-key".to_string()),
            ..Config::default()
        };
        let provider = connect(&config, &settings).unwrap();
        assert!(matches!(provider, ProviderImpl::OpenAI(_)));
    }

    #[tokio::test]
    async fn extraction_failure_reports_generic_message() {
        let messages = languages::load_messages("en", &HashMap::new()).unwrap();
        let extractor = Extractor::new(FakeProvider::replying(Some("{bad")));
        let image = ImagePayload::from_bytes(sample_png(), None).unwrap();
        let err = extract_once(&extractor, &messages, image).await.unwrap_err();
        assert_eq!(format!("{:#}", err), messages.extraction_error);
    }

    #[tokio::test]
    async fn extract_once_returns_fields() {
        let messages = languages::load_messages("en", &HashMap::new()).unwrap();
        let extractor = Extractor::new(FakeProvider::replying(Some(SMITH_JSON)));
        let image = ImagePayload::from_bytes(sample_png(), None).unwrap();
        let output = extract_once(&extractor, &messages, image).await.unwrap();
        assert_eq!(output.fields.surname, "SMITH");
    }
}
