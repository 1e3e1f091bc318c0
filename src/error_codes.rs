use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodedErrorKind {
    /// Bad keyword or flag combination on the command line.
    Usage,
    /// A conversation document that cannot be loaded or written.
    Config,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Usage,
        }
    }

    pub fn config(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Config,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error. Uncoded errors are reported as `INTERNAL`
/// with the full context chain as the message.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    let body = match find_coded_error(error) {
        Some(coded) => ErrorEnvelopeBody {
            code: coded.code.to_owned(),
            kind: match coded.kind {
                CodedErrorKind::Usage => "usage",
                CodedErrorKind::Config => "config",
            }
            .to_owned(),
            message: coded.message.clone(),
            details: coded.details.clone(),
        },
        None => ErrorEnvelopeBody {
            code: "INTERNAL".to_owned(),
            kind: "internal".to_owned(),
            message: format!("{error:#}"),
            details: None,
        },
    };
    ErrorEnvelope {
        ok: false,
        error: body,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};
    use serde_json::json;

    use super::{envelope_for, find_coded_error, CodedError};

    #[test]
    fn coded_error_survives_added_context() {
        let error = Err::<(), _>(anyhow!(CodedError::config(
            "CONFIG_PARSE",
            "bad yaml"
        )))
        .context("failed to load chat.yaml")
        .expect_err("should be an error");

        let coded = find_coded_error(&error).expect("code should be found in chain");
        assert_eq!(coded.code, "CONFIG_PARSE");

        let envelope = serde_json::to_value(envelope_for(&error)).expect("serializable");
        assert_eq!(envelope["ok"], json!(false));
        assert_eq!(envelope["error"]["code"], json!("CONFIG_PARSE"));
        assert_eq!(envelope["error"]["kind"], json!("config"));
    }

    #[test]
    fn plain_errors_become_internal() {
        let error = anyhow!("disk on fire");
        let envelope = envelope_for(&error);
        assert_eq!(envelope.error.code, "INTERNAL");
        assert!(envelope.error.message.contains("disk on fire"));
        assert!(envelope.error.details.is_none());
    }
}
