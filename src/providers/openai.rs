use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    MessagePart, Provider, ProviderFuture, ProviderResponse, ProviderUsage, ResponseSchema,
    format_error_parts,
};
use crate::data::ImagePayload;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAI {
    key: String,
    model: String,
    parts: Vec<MessagePart>,
    schema: Option<ResponseSchema>,
}

impl OpenAI {
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
        let content = self
            .parts
            .iter()
            .map(|part| match part {
                MessagePart::Text(text) => json!({"type": "input_text", "text": text}),
                MessagePart::Image(image) => {
                    json!({"type": "input_image", "image_url": image.preview_uri()})
                }
            })
            .collect::<Vec<_>>();

        let mut body = json!({
            "model": self.model,
            "input": [{"role": "user", "content": content}],
        });
        if let Some(schema) = &self.schema {
            body["text"] = json!({
                "format": {
                    "type": "json_schema",
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true
                }
            });
        }
        body
    }
}

impl Provider for OpenAI {
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
            let url = format!("{}/responses", base_url());
            let body = self.request_body();

            let response = client
                .post(&url)
                .bearer_auth(self.key.clone())
                .json(&body)
                .send()
                .await
                .with_context(|| "failed to reach OpenAI")?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return extract_text_response(&text, &self.model);
            }
            Err(anyhow!(
                "OpenAI API error ({}): {}",
                status,
                extract_openai_error(&text).unwrap_or(text)
            ))
        })
    }
}

fn base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn extract_text_response(text: &str, fallback_model: &str) -> Result<ProviderResponse> {
    let payload: ResponseApiResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI response JSON")?;

    let reply = payload
        .output
        .iter()
        .filter_map(|item| match item {
            ResponseOutputItem::Message { content } => Some(content),
            ResponseOutputItem::Other => None,
        })
        .flatten()
        .filter_map(|part| match part {
            ResponseContent::OutputText { text } => Some(text.as_str()),
            ResponseContent::Other => None,
        })
        .collect::<String>();
    let reply = Some(reply).filter(|reply| !reply.trim().is_empty());

    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(ProviderResponse {
        text: reply,
        model,
        usage,
    })
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, error.code))
}

#[derive(Debug, Deserialize)]
struct ResponseApiResponse {
    model: Option<String>,
    #[serde(default)]
    output: Vec<ResponseOutputItem>,
    usage: Option<ResponseApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseOutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<ResponseContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContent {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResponseApiUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_json_snapshot;

    #[test]
    fn openai_extract_text_snapshot() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/openai_passport_response.json"
        ));
        let response = extract_text_response(payload, "gpt-4o-mini").unwrap();
        assert_json_snapshot!(response, @r###"
        {
          "text": "{\"surname\":\"SMITH\",\"givenNames\":\"JOHN\",\"passportNumber\":\"BW13172\",\"nationality\":\"EGY\",\"dateOfBirth\":\"1970-07-12\",\"sex\":\"F\",\"dateOfExpiry\":\"2030-07-09\",\"issuingCountry\":\"EGY\"}",
          "model": "gpt-4o-mini-2024-07-18",
          "usage": {
            "prompt_tokens": 1120,
            "completion_tokens": 58,
            "total_tokens": 1178
          }
        }
        "###);
    }

    #[test]
    fn refusal_only_output_has_no_text() {
        let body = r#"{
            "model": "gpt-4o-mini",
            "output": [{"type": "message", "content": [{"type": "refusal", "refusal": "no"}]}]
        }"#;
        let response = extract_text_response(body, "gpt-4o-mini").unwrap();
        assert!(response.text.is_none());
    }

    #[test]
    fn request_uses_strict_json_schema() {
        let image = ImagePayload {
            bytes: vec![1, 2, 3],
            mime: "image/png".to_string(),
            name: None,
        };
        let body = OpenAI::new("key")
            .append_user_image(image)
            .append_user_input("read it".to_string())
            .with_response_schema(ResponseSchema {
                name: "passport_fields".to_string(),
                schema: json!({"type": "object"}),
            })
            .request_body();
        assert!(body.get("instructions").is_none());
        assert_eq!(
            body["input"],
            json!([{
                "role": "user",
                "content": [
                    {"type": "input_image", "image_url": "data:image/png;base64,AQID"},
                    {"type": "input_text", "text": "read it"}
                ]
            }])
        );
        assert_eq!(body["text"]["format"]["type"], json!("json_schema"));
        assert_eq!(body["text"]["format"]["name"], json!("passport_fields"));
        assert_eq!(body["text"]["format"]["strict"], json!(true));
    }
}
