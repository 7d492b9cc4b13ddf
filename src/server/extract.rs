use axum::http::StatusCode;
use tracing::{error, info};

use super::models::{ExtractRequest, ExtractResponse};
use crate::extractor::Extractor;
use crate::languages::Messages;
use crate::lines::LineFormatter;
use crate::providers::Provider;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

/// Runs one extraction for an HTTP request. The cause of a failure is logged
/// and the client only sees the localized generic message.
pub(crate) async fn extract_request<P: Provider + Clone>(
    extractor: &Extractor<P>,
    formatter: &LineFormatter,
    messages: &Messages,
    request: ExtractRequest,
) -> Result<ExtractResponse, ServerError> {
    let image = request
        .image
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ServerError::bad_request("image is required"))?;
    info!("extract request with {} chars of image data", image.len());

    let output = extractor.extract_data_uri(&image).await.map_err(|err| {
        error!("extraction failed: {}", err);
        ServerError::unprocessable(messages.extraction_error.clone())
    })?;
    let lines = formatter.format(&output.fields);
    Ok(ExtractResponse {
        line1: lines.line1,
        line2: lines.line2,
        fields: output.fields,
        model: output.model,
    })
}
