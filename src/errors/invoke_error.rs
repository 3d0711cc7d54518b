use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeErrorKind {
    Validation,
    Transport,
    Http,
    Template,
    AuthMisconfigured,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvokeError {
    pub kind: InvokeErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl InvokeError {
    pub fn new(kind: InvokeErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            retryable: matches!(kind, InvokeErrorKind::Transport),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Validation, "VALIDATION", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Transport, "TRANSPORT", message)
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Http, "HTTP", message)
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Template, "TEMPLATE", message)
    }

    pub fn auth_misconfigured(message: impl Into<String>) -> Self {
        Self::new(
            InvokeErrorKind::AuthMisconfigured,
            "AUTH_MISCONFIGURED",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Internal, "INTERNAL", message)
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for InvokeError {}

impl From<std::io::Error> for InvokeError {
    fn from(err: std::io::Error) -> Self {
        InvokeError::internal(err.to_string())
    }
}
