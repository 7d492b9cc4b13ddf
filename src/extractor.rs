use tracing::{debug, info};

use crate::data::ImagePayload;
use crate::error::ExtractionError;
use crate::extraction::{self, parse_fields, response_schema};
use crate::passport::PassportFields;
use crate::providers::{Provider, ProviderUsage};

/// Sends one passport image to the model and validates the reply.
#[derive(Debug, Clone)]
pub struct Extractor<P: Provider + Clone> {
    provider: P,
}

#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub fields: PassportFields,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

impl<P: Provider + Clone> Extractor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Single attempt; no retry.
    pub async fn extract(&self, image: ImagePayload) -> Result<ExtractionOutput, ExtractionError> {
        let instruction = extraction::render_instruction()?;
        info!(
            "extracting passport fields from {} bytes ({})",
            image.bytes.len(),
            image.mime
        );
        let response = self
            .provider
            .clone()
            .with_response_schema(response_schema())
            .append_user_image(image)
            .append_user_input(instruction)
            .generate()
            .await?;
        debug!(
            "model {} replied with {} chars",
            response.model.as_deref().unwrap_or("unknown"),
            response.text.as_deref().map(str::len).unwrap_or(0)
        );

        let fields = parse_fields(response.text.as_deref())?;
        Ok(ExtractionOutput {
            fields,
            model: response.model,
            usage: response.usage,
        })
    }

    /// Accepts a data URI (header stripped) or bare base64.
    pub async fn extract_data_uri(&self, input: &str) -> Result<ExtractionOutput, ExtractionError> {
        let image = ImagePayload::from_data_uri(input)
            .map_err(|err| ExtractionError::InvalidImage(format!("{:#}", err)))?;
        self.extract(image).await
    }
}
