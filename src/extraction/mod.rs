use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tera::{Context as TeraContext, Tera};

use crate::error::ExtractionError;
use crate::passport::PassportFields;
use crate::providers::ResponseSchema;

pub const SCHEMA_NAME: &str = "passport_fields";

const INSTRUCTION_TEMPLATE: &str = include_str!("templates/instruction.tera");
const MRZ_FILLER: char = '<';

#[derive(Debug, Clone, Serialize)]
struct FieldPrompt {
    label: &'static str,
    hint: Option<&'static str>,
}

const FIELD_PROMPTS: [FieldPrompt; 8] = [
    FieldPrompt {
        label: "Surname",
        hint: Some("Family Name"),
    },
    FieldPrompt {
        label: "Given Names",
        hint: None,
    },
    FieldPrompt {
        label: "Passport Number",
        hint: Some("Remove any < characters"),
    },
    FieldPrompt {
        label: "Nationality",
        hint: Some("3 letter ISO code"),
    },
    FieldPrompt {
        label: "Date of Birth",
        hint: Some("YYYY-MM-DD"),
    },
    FieldPrompt {
        label: "Sex",
        hint: Some("M or F"),
    },
    FieldPrompt {
        label: "Date of Expiry",
        hint: Some("YYYY-MM-DD"),
    },
    FieldPrompt {
        label: "Issuing Country Code",
        hint: Some("3 letter ISO code"),
    },
];

/// Strict schema: an object with the eight passport fields, all required strings.
pub fn response_schema() -> ResponseSchema {
    let properties = PassportFields::FIELD_NAMES
        .iter()
        .map(|name| (name.to_string(), json!({"type": "string"})))
        .collect::<Map<_, _>>();
    ResponseSchema {
        name: SCHEMA_NAME.to_string(),
        schema: json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": PassportFields::FIELD_NAMES,
            "additionalProperties": false
        }),
    }
}

pub fn render_instruction() -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("fields", &FIELD_PROMPTS);
    context.insert("keys", &PassportFields::FIELD_NAMES);
    context.insert("filler", &MRZ_FILLER.to_string());
    let rendered = Tera::one_off(INSTRUCTION_TEMPLATE, &context, false)
        .with_context(|| "failed to render extraction instruction")?;
    Ok(rendered.trim().to_string())
}

/// Parses the model's reply. Anything short of all eight string fields fails.
pub fn parse_fields(text: Option<&str>) -> Result<PassportFields, ExtractionError> {
    let text = text
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(ExtractionError::EmptyResponse)?;
    serde_json::from_str::<PassportFields>(text)
        .map_err(|err| ExtractionError::Parse(err.to_string()))
}
