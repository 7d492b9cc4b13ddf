use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{
    MessagePart, Provider, ProviderFuture, ProviderResponse, ProviderUsage, ResponseSchema,
    format_error_parts,
};
use crate::data::ImagePayload;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct Gemini {
    key: String,
    model: String,
    parts: Vec<MessagePart>,
    schema: Option<ResponseSchema>,
}

impl Gemini {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            parts: Vec::new(),
            schema: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    fn request_body(&self) -> Value {
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                MessagePart::Text(text) => json!({"text": text}),
                MessagePart::Image(image) => json!({
                    "inline_data": {
                        "mime_type": image.mime,
                        "data": image.base64()
                    }
                }),
            })
            .collect::<Vec<_>>();

        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": parts
            }]
        });
        if let Some(schema) = &self.schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": gemini_schema(&schema.schema)
            });
        }
        body
    }
}

impl Provider for Gemini {
    fn append_user_input(mut self, input: String) -> Self {
        self.parts.push(MessagePart::Text(input));
        self
    }

    fn append_user_image(mut self, image: ImagePayload) -> Self {
        self.parts.push(MessagePart::Image(image));
        self
    }

    fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            let client = reqwest::Client::new();
            let url = format!("{}/{}:generateContent", base_url(), self.model);
            let body = self.request_body();

            let response = client
                .post(&url)
                .header("x-goog-api-key", self.key.clone())
                .json(&body)
                .send()
                .await
                .with_context(|| "failed to reach Gemini")?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return extract_text_response(&text, &self.model);
            }
            Err(anyhow!(
                "Gemini API error ({}): {}",
                status,
                extract_gemini_error(&text).unwrap_or(text)
            ))
        })
    }
}

fn base_url() -> String {
    std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Converts a JSON Schema into Gemini's OpenAPI subset: upper-case type names
/// and no `additionalProperties`.
fn gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut converted = Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "additionalProperties" => continue,
                    "type" => {
                        let upper = value
                            .as_str()
                            .map(|kind| Value::String(kind.to_uppercase()))
                            .unwrap_or_else(|| value.clone());
                        converted.insert(key.clone(), upper);
                    }
                    "properties" => {
                        let properties = value
                            .as_object()
                            .map(|props| {
                                props
                                    .iter()
                                    .map(|(name, prop)| (name.clone(), gemini_schema(prop)))
                                    .collect::<Map<_, _>>()
                            })
                            .map(Value::Object)
                            .unwrap_or_else(|| value.clone());
                        converted.insert(key.clone(), properties);
                    }
                    _ => {
                        converted.insert(key.clone(), gemini_schema(value));
                    }
                }
            }
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(items.iter().map(gemini_schema).collect()),
        other => other.clone(),
    }
}

fn extract_text_response(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, anyhow::Error> {
    let payload: GeminiResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Gemini response JSON: {}", err))?;

    let reply = payload
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .filter(|reply| !reply.trim().is_empty());

    let model = payload
        .model_version
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage_metadata.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });
    Ok(ProviderResponse {
        text: reply,
        model,
        usage,
    })
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(
        error.message,
        error.status,
        error.code.map(|value| value.to_string()),
    ))
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
