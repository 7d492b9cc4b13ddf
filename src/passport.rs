use serde::{Deserialize, Serialize};

/// Fields read from a passport data page.
///
/// Field names on the wire are camelCase, matching the response schema sent to
/// the model. Values are passed through as the model returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportFields {
    pub surname: String,
    pub given_names: String,
    pub passport_number: String,
    /// 3-letter ISO code.
    pub nationality: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub sex: String,
    /// `YYYY-MM-DD`.
    pub date_of_expiry: String,
    /// 3-letter ISO code.
    pub issuing_country: String,
}

impl PassportFields {
    pub const FIELD_NAMES: [&'static str; 8] = [
        "surname",
        "givenNames",
        "passportNumber",
        "nationality",
        "dateOfBirth",
        "sex",
        "dateOfExpiry",
        "issuingCountry",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedResult {
    pub line1: String,
    pub line2: String,
}
