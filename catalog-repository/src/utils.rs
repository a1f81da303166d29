//! Utility functions for the index gateway.

use crate::errors::IndexError;

/// Validate a document id before it is sent to a backend.
///
/// Ids are free-form (GND numbers, opaque hex ids, ORCIDs) but must be non-blank and
/// must not carry path separators, which would change the addressed resource.
///
/// # Example
///
/// ```
/// use catalog_repository::validate_document_id;
///
/// assert!(validate_document_id("118540238").is_ok());
/// assert!(validate_document_id(" ").is_err());
/// ```
pub fn validate_document_id(id: &str) -> Result<(), IndexError> {
    if id.trim().is_empty() {
        return Err(IndexError::validation("Document id is required"));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(IndexError::validation(format!(
            "Document id '{}' contains a path separator",
            id
        )));
    }
    Ok(())
}

/// Field names must contain only alphanumeric characters and underscores.
pub fn validate_field_name(field: &str) -> Result<(), IndexError> {
    if field.is_empty() {
        return Err(IndexError::validation("Field names cannot be empty"));
    }
    if !field.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(IndexError::validation(format!(
            "Field '{}' contains invalid characters. Only alphanumeric characters and underscores are allowed",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_document_id() {
        assert!(validate_document_id("W1").is_ok());
        assert!(validate_document_id("0000-0002-1825-0097").is_ok());
        assert!(matches!(
            validate_document_id(""),
            Err(IndexError::ValidationError(_))
        ));
        assert!(matches!(
            validate_document_id("a/b"),
            Err(IndexError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_field_name_invalid_characters() {
        for field in ["name-with-dash", "name.with.dot", "name with space", "name:colon", ""] {
            assert!(
                matches!(
                    validate_field_name(field),
                    Err(IndexError::ValidationError(_))
                ),
                "Expected ValidationError for field '{}'",
                field
            );
        }
        assert!(validate_field_name("editorial_status").is_ok());
    }
}
