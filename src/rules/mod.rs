//! Field rules and row validation.
//!
//! [`validate_row`] is a pure function: one [`RawRow`] in, either a
//! [`ValidatedRecord`] or a list of [`ValidationError`]s out, never both.
//! Fields are checked in a fixed order (id, name, inventory, category_id,
//! description) so error ordering is deterministic across runs.
//!
//! The rule set for inventory records is fixed. Unrecognized columns are
//! ignored entirely; required columns are enforced at the header level by
//! the orchestrator before any row reaches this module.

use crate::models::{ErrorCode, RawRow, ValidatedRecord, ValidationError};

/// Maximum length of `name`.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of `description`.
pub const MAX_DESC_LEN: usize = 2000;

/// Columns that must be present in the header row. `description` is
/// recognized but optional.
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "name", "inventory", "category_id"];

/// Parse an optional non-negative integer field.
///
/// Blank is `Ok(None)`. Anything that is not a plain base-10 integer,
/// including values with a fractional component like `"1.7"`, is an error.
fn parse_optional_u64(raw: &str) -> Result<Option<u64>, ()> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>().map(Some).map_err(|_| ())
}

/// Validate one raw row against the fixed rule set.
///
/// A row with zero field errors yields exactly one record; a row with
/// violations yields one error per offending field.
pub fn validate_row(raw: &RawRow) -> Result<ValidatedRecord, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let row = raw.row;

    // id: optional; blank means "new record"
    let id_raw = raw.get("id");
    let id = match parse_optional_u64(id_raw) {
        Ok(value) => value,
        Err(()) => {
            errors.push(
                ValidationError::new(row, "id", ErrorCode::InvalidId, "must be a non-negative integer")
                    .with_value(id_raw),
            );
            None
        }
    };

    // name: required, bounded
    let name = raw.get("name").to_string();
    if name.is_empty() {
        errors.push(ValidationError::new(row, "name", ErrorCode::MissingName, "required"));
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(
            ValidationError::new(
                row,
                "name",
                ErrorCode::NameTooLong,
                format!("exceeds {} characters", MAX_NAME_LEN),
            )
            .with_value(&name),
        );
    }

    // inventory: required, integer only, non-negative
    let inventory_raw = raw.get("inventory");
    let inventory = if inventory_raw.is_empty() {
        errors.push(ValidationError::new(row, "inventory", ErrorCode::MissingInventory, "required"));
        0
    } else {
        match inventory_raw.parse::<i64>() {
            Ok(value) if value >= 0 => value,
            _ => {
                errors.push(
                    ValidationError::new(
                        row,
                        "inventory",
                        ErrorCode::InvalidInventory,
                        format!("must be a non-negative integer, got '{}'", inventory_raw),
                    )
                    .with_value(inventory_raw),
                );
                0
            }
        }
    };

    // category_id: optional integer; blank means no category
    let category_raw = raw.get("category_id");
    let category_id = match parse_optional_u64(category_raw) {
        Ok(value) => value,
        Err(()) => {
            errors.push(
                ValidationError::new(row, "category_id", ErrorCode::InvalidCategory, "must be an integer")
                    .with_value(category_raw),
            );
            None
        }
    };

    // description: optional, bounded
    let description_raw = raw.get("description");
    if description_raw.chars().count() > MAX_DESC_LEN {
        errors.push(
            ValidationError::new(
                row,
                "description",
                ErrorCode::DescriptionTooLong,
                format!("exceeds {} characters", MAX_DESC_LEN),
            )
            .with_value(description_raw),
        );
    }
    let description = if description_raw.is_empty() {
        None
    } else {
        Some(description_raw.to_string())
    };

    if errors.is_empty() {
        Ok(ValidatedRecord {
            row,
            id,
            name,
            inventory,
            category_id,
            description,
        })
    } else {
        Err(errors)
    }
}

/// Header-level check: which required columns are missing.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(values: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            1,
            values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn full_row(id: &str, name: &str, inventory: &str, category: &str, desc: &str) -> RawRow {
        row(&[
            ("id", id),
            ("name", name),
            ("inventory", inventory),
            ("category_id", category),
            ("description", desc),
        ])
    }

    #[test]
    fn test_valid_row_without_id() {
        let record = validate_row(&full_row("", "New Apple", "50", "0", "first stock")).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.name, "New Apple");
        assert_eq!(record.inventory, 50);
        assert_eq!(record.category_id, Some(0));
        assert_eq!(record.description.as_deref(), Some("first stock"));
    }

    #[test]
    fn test_valid_row_with_id_and_blank_optionals() {
        let record = validate_row(&full_row("7", "Keyboard", "0", "", "")).unwrap();
        assert_eq!(record.id, Some(7));
        assert_eq!(record.inventory, 0);
        assert_eq!(record.category_id, None);
        assert_eq!(record.description, None);
    }

    #[test]
    fn test_invalid_id() {
        let errors = validate_row(&full_row("abc", "Apple", "3", "", "")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::InvalidId);
        assert_eq!(errors[0].value.as_deref(), Some("abc"));
    }

    #[test]
    fn test_negative_id_rejected() {
        let errors = validate_row(&full_row("-1", "Apple", "3", "", "")).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::InvalidId);
    }

    #[test]
    fn test_missing_name() {
        let errors = validate_row(&full_row("", "", "3", "", "")).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::MissingName);
    }

    #[test]
    fn test_name_too_long() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let errors = validate_row(&full_row("", &long, "3", "", "")).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::NameTooLong);
    }

    #[test]
    fn test_missing_inventory() {
        let errors = validate_row(&full_row("", "Apple", "", "", "")).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::MissingInventory);
    }

    #[test]
    fn test_fractional_inventory_rejected() {
        let errors = validate_row(&full_row("3", "Mouse", "1.7", "1", "bad stock")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::InvalidInventory);
        assert!(errors[0].message.contains("'1.7'"));
    }

    #[test]
    fn test_negative_inventory_rejected() {
        // Documented as non-negative-only.
        let errors = validate_row(&full_row("", "Apple", "-5", "", "")).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::InvalidInventory);
    }

    #[test]
    fn test_invalid_category() {
        let errors = validate_row(&full_row("", "Apple", "3", "office", "")).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::InvalidCategory);
    }

    #[test]
    fn test_description_too_long() {
        let long = "y".repeat(MAX_DESC_LEN + 1);
        let errors = validate_row(&full_row("", "Apple", "3", "", &long)).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::DescriptionTooLong);
    }

    #[test]
    fn test_multiple_errors_in_fixed_order() {
        let errors = validate_row(&full_row("x", "", "1.5", "y", "")).unwrap_err();
        let codes: Vec<ErrorCode> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::InvalidId,
                ErrorCode::MissingName,
                ErrorCode::InvalidInventory,
                ErrorCode::InvalidCategory,
            ]
        );
    }

    #[test]
    fn test_unrecognized_columns_ignored() {
        let raw = row(&[
            ("id", ""),
            ("name", "Apple"),
            ("inventory", "3"),
            ("category_id", ""),
            ("price", "not-a-number"),
            ("created_at", "garbage"),
        ]);
        assert!(validate_row(&raw).is_ok());
    }

    #[test]
    fn test_missing_columns() {
        let headers = vec!["id".to_string(), "name".to_string(), "description".to_string()];
        assert_eq!(missing_columns(&headers), vec!["inventory", "category_id"]);

        let complete: Vec<String> = REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect();
        assert!(missing_columns(&complete).is_empty());
    }
}
