// THEORY:
// Every failure the engine can report is one of a handful of kinds. Only two of
// them are fatal: an image that cannot be decoded aborts the report for that
// form, and a malformed template aborts startup. Region failures are isolated
// by the pipeline and never escape a single form.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable category of an `OmrError`, echoed into failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ImageLoad,
    Config,
    Region,
    Output,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OmrError {
    #[error("Could not load image '{path}': {reason}")]
    ImageLoad { path: String, reason: String },

    #[error("Invalid form template '{template}': {reason}")]
    Config { template: String, reason: String },

    #[error("Mark region for '{item}' could not be analyzed: {reason}")]
    Region { item: String, reason: String },

    #[error("Failed to write '{path}': {reason}")]
    Output { path: String, reason: String },
}

impl OmrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OmrError::ImageLoad { .. } => ErrorKind::ImageLoad,
            OmrError::Config { .. } => ErrorKind::Config,
            OmrError::Region { .. } => ErrorKind::Region,
            OmrError::Output { .. } => ErrorKind::Output,
        }
    }

    pub(crate) fn config(template: &str, reason: impl Into<String>) -> Self {
        OmrError::Config {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

pub type OmrResult<T> = Result<T, OmrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let err = OmrError::ImageLoad {
            path: "scan.png".into(),
            reason: "truncated".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ImageLoad);
        assert_eq!(err.to_string(), "Could not load image 'scan.png': truncated");

        let err = OmrError::config("menu", "duplicate selection mark for 'egg'");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("duplicate selection mark"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ImageLoad).unwrap();
        assert_eq!(json, "\"image_load\"");
    }
}
