use serde::{Deserialize, Serialize};

use crate::languages::Messages;
use crate::passport::PassportFields;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ExtractRequest {
    /// Data URI or bare base64.
    pub(crate) image: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExtractResponse {
    pub(crate) line1: String,
    pub(crate) line2: String,
    pub(crate) fields: PassportFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SettingsInfo {
    pub(crate) lang: String,
    pub(crate) line_prefix: String,
    pub(crate) copy_ack_ms: u64,
    pub(crate) labels: Messages,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
