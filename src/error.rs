//! Error types for gatekey

use thiserror::Error;

/// Main error type for gatekey operations
#[derive(Debug, Error)]
pub enum GateKeyError {
    #[error("Bootstrap failed: {0}")]
    BootstrapFailure(Box<GateKeyError>),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("No redirect from {stage} (status {status})")]
    NoRedirect { stage: &'static str, status: u16 },

    #[error("Redirect target not found in page")]
    RedirectNotFound,

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Base64 payload not found in page")]
    Base64NotFound,

    #[error("Form data incomplete: missing {0}")]
    FormDataIncomplete(&'static str),

    #[error("Upstream rejected submission: {0}")]
    UpstreamRejected(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("Unexpected status {status} from {stage}")]
    UnexpectedStatus { stage: &'static str, status: u16 },

    #[error("keyUrl missing: {0}")]
    KeyUrlMissing(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

impl GateKeyError {
    /// Wrap an error raised while discovering the base URL.
    ///
    /// Already-wrapped errors are returned untouched so nesting stays one level deep.
    pub fn bootstrap(cause: GateKeyError) -> Self {
        match cause {
            GateKeyError::BootstrapFailure(_) => cause,
            other => GateKeyError::BootstrapFailure(Box::new(other)),
        }
    }

    /// Stable short code for reports
    pub fn kind(&self) -> &'static str {
        match self {
            GateKeyError::BootstrapFailure(_) => "bootstrap_failure",
            GateKeyError::ExtractionFailure(_) => "extraction_failure",
            GateKeyError::NoRedirect { .. } => "no_redirect",
            GateKeyError::RedirectNotFound => "redirect_not_found",
            GateKeyError::KeyNotFound(_) => "key_not_found",
            GateKeyError::Base64NotFound => "base64_not_found",
            GateKeyError::FormDataIncomplete(_) => "form_data_incomplete",
            GateKeyError::UpstreamRejected(_) => "upstream_rejected",
            GateKeyError::DecryptionFailure(_) => "decryption_failure",
            GateKeyError::UnexpectedStatus { .. } => "unexpected_status",
            GateKeyError::KeyUrlMissing(_) => "key_url_missing",
            GateKeyError::RequestFailed(_) => "request_failed",
            GateKeyError::JsonError(_) => "json_error",
            GateKeyError::UrlError(_) => "url_error",
            GateKeyError::RegexError(_) => "regex_error",
        }
    }

    /// Check if the error happened before any provider was contacted
    pub fn is_bootstrap_failure(&self) -> bool {
        matches!(self, GateKeyError::BootstrapFailure(_))
    }
}
