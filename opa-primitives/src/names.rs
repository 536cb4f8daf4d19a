//! Validation for resource names and document paths.

use crate::error::{Error, Result};

/// Checks a policy or base document name before it is placed in a URL.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when the name is empty, starts or ends
/// with `/`, or contains whitespace, `?` or `#`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("name cannot be empty"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::invalid_argument(format!(
            "name `{name}` must not start or end with `/`"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '?' | '#'))
    {
        return Err(Error::invalid_argument(format!(
            "name `{name}` contains unsupported character {c:?}"
        )));
    }
    Ok(())
}

/// Checks a JSON-Patch path addressed below a base document.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when the path does not start with `/` or
/// contains whitespace, `?` or `#`.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::invalid_argument(format!(
            "path `{path}` must start with `/`"
        )));
    }
    if path
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '?' | '#'))
    {
        return Err(Error::invalid_argument(format!(
            "path `{path}` contains unsupported characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_names() {
        validate_name("authz").unwrap();
        validate_name("authz/http_api").unwrap();
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "/authz", "authz/", "my policy", "a?b", "a#b"] {
            let err = validate_name(name).expect_err("name should be rejected");
            assert!(matches!(err, Error::InvalidArgument { .. }), "{name}");
        }
    }

    #[test]
    fn paths_must_be_absolute() {
        validate_path("/users/0").unwrap();
        assert!(validate_path("users").is_err());
        assert!(validate_path("/a b").is_err());
    }
}
