//! Error types for policy loading.

use serde::Serialize;
use thiserror::Error;

/// Machine-usable classification of a policy document defect.
///
/// Carried alongside the human-readable message so a host can render
/// precise UI without parsing error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDefect {
    /// A value has the wrong structural type (e.g. object where a list
    /// was required).
    WrongType,
    /// A required field is absent.
    MissingField,
    /// A required non-empty value is empty.
    EmptyValue,
    /// A name references a key that does not exist (`defaultRole`,
    /// `@group`).
    UnknownReference,
    /// A wildcard-users role precedes a specific-users role, which
    /// first-match resolution would shadow permanently.
    RoleOrdering,
    /// A numeric value is outside its allowed range.
    OutOfRange,
    /// A string value is not one of the supported literals.
    UnsupportedValue,
}

/// Errors produced while loading a policy document.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The document failed structural validation. The engine refuses to
    /// register; the message is safe to surface to operators.
    #[error("invalid policy at `{path}`: {message}")]
    Invalid {
        /// Document path of the offending value (e.g. `roles.admin.channels`).
        path: String,
        /// Machine-usable defect classification.
        kind: PolicyDefect,
        /// Human-readable description of the defect.
        message: String,
    },

    /// A policy file could not be read.
    #[error("failed to read policy file {path}")]
    Read {
        /// Filesystem path of the policy file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A policy file exceeds the size cap.
    #[error("policy file {path} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge {
        /// Filesystem path of the policy file.
        path: String,
        /// Actual file size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        limit: u64,
    },

    /// A policy document could not be parsed as JSON.
    #[error("failed to parse policy document {path}")]
    ParseJson {
        /// Filesystem path or `<inline>` for string input.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A policy document could not be parsed as YAML.
    #[error("failed to parse policy document {path}")]
    ParseYaml {
        /// Filesystem path or `<inline>` for string input.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
}

impl PolicyError {
    /// Construct an [`PolicyError::Invalid`] for the given document path.
    pub(crate) fn invalid(
        path: impl Into<String>,
        kind: PolicyDefect,
        message: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// The defect classification, when this is a validation failure.
    #[must_use]
    pub fn defect(&self) -> Option<PolicyDefect> {
        match self {
            Self::Invalid { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
