//! Credential loading.
//!
//! The secret file must hold UTF-8 text, since password authentication takes a
//! string. Its contents are read once, a single trailing line ending is
//! stripped, and the value is handed to the connection layer. Nothing here
//! ever formats the value itself.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// A credential loaded from a secret file.
///
/// `Debug` and `Display` are redacted so the value cannot end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps an already-materialized credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reads the secret from `path`.
    ///
    /// The contents must be UTF-8 text; binary or host-encrypted secrets are
    /// not supported. Fails with a validation error when the file is missing,
    /// is not UTF-8, or is empty once the trailing line ending is removed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            Error::Validation(format!(
                "Failed to read secret file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut value = String::from_utf8(bytes).map_err(|_| {
            Error::Validation(format!(
                "Secret file {} is not valid UTF-8",
                path.display()
            ))
        })?;

        if value.ends_with('\n') {
            value.pop();
            if value.ends_with('\r') {
                value.pop();
            }
        }

        if value.is_empty() {
            return Err(Error::Validation(format!(
                "Secret file {} is empty",
                path.display()
            )));
        }

        Ok(Self(value))
    }

    /// Exposes the raw credential to the connection layer.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_strips_single_line_ending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, "hunter2\r\n").unwrap();

        let secret = Secret::load_from_file(&path).unwrap();
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_load_keeps_inner_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, " pass word \n\n").unwrap();

        let secret = Secret::load_from_file(&path).unwrap();
        assert_eq!(secret.expose(), " pass word \n");
    }

    #[test]
    fn test_empty_secret_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, "\n").unwrap();

        let err = Secret::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_non_utf8_secret_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, [0xff, 0xfe, b'p', b'w']).unwrap();

        let err = Secret::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_missing_secret_file() {
        let dir = TempDir::new().unwrap();
        let err = Secret::load_from_file(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_redacted_formatting() {
        let secret = Secret::new("topsecret");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
        assert!(!format!("{:?}", Some(&secret)).contains("topsecret"));
    }
}
