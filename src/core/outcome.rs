//! Resolution results and the caller-facing report

use crate::error::GateKeyError;
use crate::platform::dispatch::Provider;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of a provider resolver that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The key was recovered
    Key(String),
    /// Upstream handed off to a messaging app; a human has to continue there
    ExternalAction { deep_link: String },
}

/// Result of one full pipeline run
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Recovered key and the provider that produced it
    Key { key: String, provider: Provider },
    /// Resolution stopped at a human-interaction surface outside our control
    RequiresExternalAction { provider: Provider, deep_link: String },
    /// Any terminal error
    Failure(GateKeyError),
}

impl ResolutionOutcome {
    /// Combine a resolver result with the provider that produced it
    pub fn from_resolver(provider: Provider, result: Result<Resolved, GateKeyError>) -> Self {
        match result {
            Ok(Resolved::Key(key)) => Self::Key { key, provider },
            Ok(Resolved::ExternalAction { deep_link }) => Self::RequiresExternalAction {
                provider,
                deep_link,
            },
            Err(error) => Self::Failure(error),
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Key { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Key { .. })
    }

    /// Render the boundary report, stamped with the current time
    pub fn into_report(self) -> ResolutionReport {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        match self {
            Self::Key { key, provider } => ResolutionReport {
                success: true,
                key: Some(key),
                domain: Some(provider.domain().to_string()),
                error: None,
                error_kind: None,
                action_required: None,
                timestamp,
            },
            Self::RequiresExternalAction {
                provider,
                deep_link,
            } => ResolutionReport {
                success: false,
                key: None,
                domain: Some(provider.domain().to_string()),
                error: None,
                error_kind: None,
                action_required: Some(ActionRequired {
                    provider: provider.domain().to_string(),
                    deep_link,
                }),
                timestamp,
            },
            Self::Failure(error) => ResolutionReport {
                success: false,
                key: None,
                domain: None,
                error: Some(error.to_string()),
                error_kind: Some(error.kind().to_string()),
                action_required: None,
                timestamp,
            },
        }
    }
}

/// Caller input. `url` is accepted but does not influence routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Hand-off details for an interactive continuation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequired {
    pub provider: String,
    pub deep_link: String,
}

/// Caller-facing result shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_required: Option<ActionRequired>,
    pub timestamp: String,
}
