use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::domain::{CustomField, FieldKind};
use crate::error::ValidationError;
use crate::validation::{limit_text, require_url};

/// Check an applicant's answers against the opportunity's form and return them trimmed.
/// Blank optional answers are dropped.
pub fn validate_answers(
    fields: &[CustomField],
    answers: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ValidationError> {
    if let Some(unknown) = answers
        .keys()
        .find(|key| !fields.iter().any(|field| &field.id == *key))
    {
        return Err(ValidationError::new(
            format!("answers.{unknown}"),
            "no such field on this opportunity",
        ));
    }

    let mut accepted = BTreeMap::new();
    for field in fields {
        let path = format!("answers.{}", field.id);
        let value = answers
            .get(&field.id)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty());

        let Some(value) = value else {
            if field.required {
                return Err(ValidationError::new(path, "is required"));
            }
            continue;
        };

        match field.kind {
            FieldKind::Text => limit_text(&path, value, 500)?,
            FieldKind::Textarea => limit_text(&path, value, 10_000)?,
            FieldKind::Number => {
                if value.parse::<f64>().map_or(true, |number| !number.is_finite()) {
                    return Err(ValidationError::new(path, "must be a number"));
                }
            }
            FieldKind::Date => {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| ValidationError::new(path.clone(), "must be a YYYY-MM-DD date"))?;
            }
            FieldKind::Url => require_url(&path, value)?,
            FieldKind::Select => {
                if !field.options.iter().any(|option| option == value) {
                    return Err(ValidationError::new(path, "is not one of the offered options"));
                }
            }
        }

        accepted.insert(field.id.clone(), value.to_string());
    }

    Ok(accepted)
}
