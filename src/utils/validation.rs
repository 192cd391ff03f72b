use crate::utils::error::{Result, SapperError};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(SapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_unique<'a, I>(field_name: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(SapperError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Value must be unique".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| SapperError::MissingConfigError {
        field: field_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("remotes.path", "/tmp/bricks").is_ok());
        assert!(validate_path("remotes.path", "").is_err());
        assert!(validate_path("remotes.path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_unique() {
        assert!(validate_unique("remotes.name", ["a", "b"]).is_ok());
        assert!(validate_unique("remotes.name", ["a", "b", "a"]).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some(3);
        let absent: Option<i32> = None;
        assert_eq!(*validate_required_field("x", &present).unwrap(), 3);
        assert!(validate_required_field("x", &absent).is_err());
    }
}
