//! Credential file loading.
//!
//! The file holds the admin password on line 1 and the modem admin URL on
//! line 2. Surrounding whitespace is trimmed, nothing else is interpreted.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Password,
    AdminUrl,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialField::Password => write!(f, "password (line 1)"),
            CredentialField::AdminUrl => write!(f, "admin URL (line 2)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file {} not found; create it with the password on the first line and the admin URL on the second", path.display())]
    MissingFile { path: PathBuf },

    #[error("credential file {} must contain at least two lines (password and URL), found {found}", path.display())]
    InsufficientLines { path: PathBuf, found: usize },

    #[error("{field} is empty in credential file {}", path.display())]
    EmptyField { path: PathBuf, field: CredentialField },

    #[error("failed to read credential file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Modem login material. The password buffer is wiped on drop.
#[derive(Clone)]
pub struct Credentials {
    password: Zeroizing<String>,
    admin_url: String,
}

impl Credentials {
    pub fn new(password: impl Into<String>, admin_url: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
            admin_url: admin_url.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"<redacted>")
            .field("admin_url", &self.admin_url)
            .finish()
    }
}

/// Read and validate the credential file at `path`.
pub fn load(path: &Path) -> Result<Credentials, CredentialError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => Zeroizing::new(c),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CredentialError::MissingFile {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(CredentialError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(path, &contents)
}

/// Validate already-read file contents. `path` is only used for error context.
pub fn parse(path: &Path, contents: &str) -> Result<Credentials, CredentialError> {
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() < 2 {
        return Err(CredentialError::InsufficientLines {
            path: path.to_path_buf(),
            found: lines.len(),
        });
    }

    let password = lines[0].trim();
    let admin_url = lines[1].trim();

    if password.is_empty() {
        return Err(CredentialError::EmptyField {
            path: path.to_path_buf(),
            field: CredentialField::Password,
        });
    }
    if admin_url.is_empty() {
        return Err(CredentialError::EmptyField {
            path: path.to_path_buf(),
            field: CredentialField::AdminUrl,
        });
    }

    Ok(Credentials::new(password, admin_url))
}
