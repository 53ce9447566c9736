//! Base URL discovery and key URL generation
//!
//! The landing page smuggles a small JSON document through four ordinary looking
//! response headers. Their values are concatenated in a fixed order, base64 and
//! XOR decoded, and the `baseUrl` field of the embedded object is the API host
//! used to request a fresh `keyUrl`.

use crate::error::GateKeyError;
use crate::platform::cipher::xor_decode;
use crate::platform::client::{Endpoints, HttpClientConfig};
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Shared key for the header payload
pub const BOOTSTRAP_XOR_KEY: &str = "k6kW8r#Tz3f;";

/// Header names in concatenation order
pub const HEADER_NAMES: [&str; 4] = ["x-request-id", "x-payload", "authorization", "x-data"];

const BASE_URL_FIELDS: [&str; 3] = ["baseUrl", "baseurl", "base_url"];
const GENERATE_PATH: &str = "/api/v1/auth/generate?server=1";

/// Ordered header values read from the landing response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBundle {
    values: Vec<(&'static str, Option<String>)>,
}

impl HeaderBundle {
    /// Read the bootstrap headers; absent or non-ASCII headers are recorded as missing
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let values = HEADER_NAMES
            .iter()
            .map(|name| {
                let value = headers
                    .get(*name)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.trim().to_string());
                (*name, value)
            })
            .collect();
        Self { values }
    }

    /// Build a bundle from raw values, in `HEADER_NAMES` order
    pub fn from_values(values: [Option<&str>; 4]) -> Self {
        Self {
            values: HEADER_NAMES
                .iter()
                .zip(values)
                .map(|(name, value)| (*name, value.map(|v| v.trim().to_string())))
                .collect(),
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Concatenate values in order; a missing header contributes an empty segment
    pub fn combined(&self) -> String {
        self.values
            .iter()
            .map(|(_, value)| value.as_deref().unwrap_or(""))
            .collect()
    }

    /// Decode the bundle into the base URL it carries
    pub fn decode_base_url(&self) -> Result<String, GateKeyError> {
        let combined = self.combined();
        if combined.is_empty() {
            return Err(GateKeyError::ExtractionFailure(format!(
                "bootstrap headers absent: {}",
                self.missing().join(", ")
            )));
        }
        debug!("Combined header payload length: {}", combined.len());

        let decoded = xor_decode(&combined, BOOTSTRAP_XOR_KEY.as_bytes())?;
        debug!("Decoded payload preview: {}", preview(&decoded, 200));

        let fragment = json_fragment(&decoded)?;
        parse_base_url(fragment)
    }
}

/// Locate the first flat `{...}` object in decoded text
pub fn json_fragment(text: &str) -> Result<&str, GateKeyError> {
    let pattern = Regex::new(r"\{[^{}]*\}")?;
    pattern
        .find(text)
        .map(|found| found.as_str())
        .ok_or_else(|| GateKeyError::ExtractionFailure("no JSON object in decoded payload".into()))
}

/// Read the base URL field from a JSON object
pub fn parse_base_url(fragment: &str) -> Result<String, GateKeyError> {
    let value: Value = serde_json::from_str(fragment)?;
    let object = value
        .as_object()
        .ok_or_else(|| GateKeyError::ExtractionFailure("payload is not an object".into()))?;

    BASE_URL_FIELDS
        .iter()
        .find_map(|field| object.get(*field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GateKeyError::ExtractionFailure("baseUrl missing or not a string".into()))
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    data: Option<GenerateData>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    #[serde(rename = "keyUrl")]
    key_url: Option<String>,
}

/// Talks to the landing page and the generate API
pub struct Bootstrapper {
    client: Client,
    landing_url: String,
}

impl Bootstrapper {
    /// Create a bootstrapper
    pub fn new(config: &HttpClientConfig, endpoints: &Endpoints) -> Result<Self, GateKeyError> {
        Ok(Self {
            client: config.build_client(true)?,
            landing_url: endpoints.landing_url.clone(),
        })
    }

    /// Fetch the landing page and decode the base URL from its headers
    pub async fn discover_base_url(&self) -> Result<String, GateKeyError> {
        self.discover_inner().await.map_err(GateKeyError::bootstrap)
    }

    async fn discover_inner(&self) -> Result<String, GateKeyError> {
        debug!("Bootstrap -> {}", self.landing_url);
        let response = self.client.get(&self.landing_url).send().await?;
        debug!("Bootstrap status: {}", response.status());

        let bundle = HeaderBundle::from_headers(response.headers());
        for name in bundle.missing() {
            warn!("{} not present in response headers", name);
        }

        let base_url = bundle.decode_base_url()?;
        info!("baseUrl: {}", base_url);
        Ok(base_url)
    }

    /// Ask the generate API for a key URL
    pub async fn fetch_key_url(&self, base_url: &str) -> Result<String, GateKeyError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), GENERATE_PATH);
        debug!("Generate -> {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!("Generate status: {}", status);
        if !status.is_success() {
            return Err(GateKeyError::UnexpectedStatus {
                stage: "key url generation",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let key_url = parsed
            .data
            .and_then(|data| data.key_url)
            .ok_or_else(|| GateKeyError::KeyUrlMissing("data.keyUrl absent".to_string()))?;

        info!("keyUrl: {}", key_url);
        Ok(key_url)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
