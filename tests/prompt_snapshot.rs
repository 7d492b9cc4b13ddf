use passport_reader::extraction::{SCHEMA_NAME, render_instruction, response_schema};

#[test]
fn instruction_prompt_snapshot() {
    let prompt = render_instruction().unwrap();
    insta::assert_snapshot!(prompt, @r"
Analyze this passport image. Focus on the MRZ (Machine Readable Zone) and the Visual Inspection Zone.
Extract the following fields accurately:
- Surname (Family Name)
- Given Names
- Passport Number (Remove any < characters)
- Nationality (3 letter ISO code)
- Date of Birth (YYYY-MM-DD)
- Sex (M or F)
- Date of Expiry (YYYY-MM-DD)
- Issuing Country Code (3 letter ISO code)
If the MRZ contains '<' filler characters in the name, strip them out. Ensure names are UPPERCASE.
Reply with a single JSON object that uses exactly these keys: surname, givenNames, passportNumber, nationality, dateOfBirth, sex, dateOfExpiry, issuingCountry.
");
}

#[test]
fn response_schema_snapshot() {
    let schema = response_schema();
    assert_eq!(schema.name, SCHEMA_NAME);
    insta::assert_json_snapshot!(schema.schema, @r#"
    {
      "additionalProperties": false,
      "properties": {
        "dateOfBirth": {
          "type": "string"
        },
        "dateOfExpiry": {
          "type": "string"
        },
        "givenNames": {
          "type": "string"
        },
        "issuingCountry": {
          "type": "string"
        },
        "nationality": {
          "type": "string"
        },
        "passportNumber": {
          "type": "string"
        },
        "sex": {
          "type": "string"
        },
        "surname": {
          "type": "string"
        }
      },
      "required": [
        "surname",
        "givenNames",
        "passportNumber",
        "nationality",
        "dateOfBirth",
        "sex",
        "dateOfExpiry",
        "issuingCountry"
      ],
      "type": "object"
    }
    "#);
}
