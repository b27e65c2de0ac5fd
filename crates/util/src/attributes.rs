//! Declarative attribute layer for the widget configuration.
//!
//! Attributes are a flat JSON object of strings keyed by the host setting
//! names (`bearerToken`, `organizationId`, `dataCenter`, `cadVarId`,
//! `canEdit`). The file lives in the standard configuration directory
//! (`~/.config/advisory/attributes.json` on most platforms) unless a path is
//! given explicitly or through [`ATTRIBUTES_PATH_ENV`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use advisory_types::Attributes;
use dirs_next::config_dir;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::expand_tilde;

/// Environment variable allowing callers to override the attributes file path.
pub const ATTRIBUTES_PATH_ENV: &str = "ADVISORY_ATTRIBUTES_PATH";

/// Default filename for the JSON payload.
pub const ATTRIBUTES_FILE_NAME: &str = "attributes.json";

/// Error surfaced when an explicitly requested attribute file cannot be used.
#[derive(Debug, Error)]
pub enum AttributesError {
    #[error("attributes I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("attributes file {path} is not valid JSON: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("attributes file {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },
}

/// Resolve where attributes are read from: the explicit path, then
/// [`ATTRIBUTES_PATH_ENV`], then the default config directory location.
pub fn attributes_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(ATTRIBUTES_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("advisory")
        .join(ATTRIBUTES_FILE_NAME)
}

/// Load attributes from an explicitly requested file. Any failure is an error.
pub fn load_attributes_file(path: &Path) -> Result<Attributes, AttributesError> {
    let data = fs::read_to_string(path).map_err(|source| AttributesError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_attributes(path, &data)
}

/// Load attributes from the implicit location. A missing file yields an empty
/// layer; an unreadable or malformed one is logged and ignored.
pub fn load_default_attributes() -> Attributes {
    let path = attributes_path(None);
    match fs::read_to_string(&path) {
        Ok(data) => match parse_attributes(&path, &data) {
            Ok(attributes) => attributes,
            Err(error) => {
                warn!(path = %path.display(), %error, "Failed to parse attributes file; ignoring it");
                Attributes::new()
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No attributes file found");
            Attributes::new()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "Failed to read attributes file; ignoring it");
            Attributes::new()
        }
    }
}

/// Attribute values are strings; scalar JSON values are stringified so that
/// `"canEdit": true` behaves like `"canEdit": "true"`. `null` entries are
/// treated as absent.
fn parse_attributes(path: &Path, data: &str) -> Result<Attributes, AttributesError> {
    let value: Value = serde_json::from_str(data).map_err(|source| AttributesError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(entries) = value else {
        return Err(AttributesError::NotAnObject { path: path.to_path_buf() });
    };

    Ok(entries
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            Value::Bool(flag) => Some((key, flag.to_string())),
            Value::Number(number) => Some((key, number.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
        .collect())
}
