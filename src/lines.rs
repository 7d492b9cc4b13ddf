use crate::dates::{UNKNOWN_DATE, format_passport_date_or};
use crate::passport::{FormattedResult, PassportFields};

pub const DEFAULT_LINE_PREFIX: &str = "srdocsyyHK1-P";

/// Turns extracted fields into the two output lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormatter {
    prefix: String,
    unknown_date: String,
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_LINE_PREFIX.to_string(),
            unknown_date: UNKNOWN_DATE.to_string(),
        }
    }
}

impl LineFormatter {
    pub fn new(prefix: impl Into<String>, unknown_date: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            unknown_date: unknown_date.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn format(&self, fields: &PassportFields) -> FormattedResult {
        let line1 = format!(
            "{} / {}",
            fields.surname.to_uppercase(),
            fields.given_names.to_uppercase()
        );
        let birth = format_passport_date_or(&fields.date_of_birth, &self.unknown_date);
        let expiry = format_passport_date_or(&fields.date_of_expiry, &self.unknown_date);
        let line2 = [
            self.prefix.clone(),
            fields.issuing_country.to_uppercase(),
            fields.passport_number.to_uppercase(),
            fields.nationality.to_uppercase(),
            birth.to_uppercase(),
            fields.sex.to_uppercase(),
            expiry.to_uppercase(),
            line1.clone(),
        ]
        .join("-");
        FormattedResult { line1, line2 }
    }
}

pub fn format_lines(fields: &PassportFields) -> FormattedResult {
    LineFormatter::default().format(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PassportFields {
        PassportFields {
            surname: "SMITH".to_string(),
            given_names: "JOHN".to_string(),
            passport_number: "bw13172".to_string(),
            nationality: "egy".to_string(),
            date_of_birth: "1970-07-12".to_string(),
            sex: "f".to_string(),
            date_of_expiry: "2030-07-09".to_string(),
            issuing_country: "egy".to_string(),
        }
    }

    #[test]
    fn formats_both_lines() {
        let result = format_lines(&sample());
        assert_eq!(result.line1, "SMITH / JOHN");
        assert_eq!(
            result.line2,
            "srdocsyyHK1-P-EGY-BW13172-EGY-12JUL70-F-09JUL30-SMITH / JOHN"
        );
    }

    #[test]
    fn names_are_uppercased() {
        let mut fields = sample();
        fields.surname = "el sayed".to_string();
        fields.given_names = "mona ali".to_string();
        let result = format_lines(&fields);
        assert_eq!(result.line1, "EL SAYED / MONA ALI");
        assert!(result.line2.ends_with("-EL SAYED / MONA ALI"));
    }

    #[test]
    fn unparseable_dates_pass_through_uppercased() {
        let mut fields = sample();
        fields.date_of_birth = "12 jul 1970".to_string();
        fields.date_of_expiry = String::new();
        let result = format_lines(&fields);
        assert_eq!(
            result.line2,
            "srdocsyyHK1-P-EGY-BW13172-EGY-12 JUL 1970-F-UNKNOWN-SMITH / JOHN"
        );
    }

    #[test]
    fn custom_prefix_is_used_verbatim() {
        let formatter = LineFormatter::new("abcDEF-x", "??");
        let mut fields = sample();
        fields.date_of_expiry = String::new();
        let result = formatter.format(&fields);
        assert!(result.line2.starts_with("abcDEF-x-EGY-"));
        assert!(result.line2.contains("-F-??-"));
    }
}
