//! lksfy resolver: decrypt the embedded form, replay its submission and
//! decrypt the returned destination

use crate::core::cooldown::Cooldown;
use crate::core::outcome::Resolved;
use crate::error::GateKeyError;
use crate::platform::cipher::CipherMaterial;
use crate::platform::client::{Endpoints, ResolutionContext};
use crate::platform::dispatch::{Provider, ProviderResolver};
use crate::utils::extract::{ExtractionRule, Extractor};
use crate::utils::url::{is_messaging_deep_link, last_path_segment, query_param};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};
use url::form_urlencoded;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Rules locating the encrypted form payload in the page
pub fn payload_rules() -> Result<Extractor, GateKeyError> {
    Ok(Extractor::new()
        .with_rule(ExtractionRule::new("single-quoted", r"var base64 = '([^']+)'")?)
        .with_rule(ExtractionRule::new("double-quoted", r#"var base64 = "([^"]+)""#)?))
}

fn field_rule(name: &'static str, pattern: &str) -> Result<Extractor, GateKeyError> {
    Ok(Extractor::new().with_rule(ExtractionRule::new(name, pattern)?))
}

/// Form fields scraped from the decrypted fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub csrf_token: String,
    pub ad_form_data: String,
    pub token_fields: String,
    pub token_unlocked: String,
    pub action: String,
}

impl FormSnapshot {
    /// Scrape the form. `_csrfToken`, `ad_form_data` and `action` are required;
    /// the two `_Token` fields default to empty.
    pub fn scrape(html: &str) -> Result<Self, GateKeyError> {
        let find = |name: &'static str, pattern: &str| -> Result<Option<String>, GateKeyError> {
            Ok(field_rule(name, pattern)?
                .first_match(html)
                .map(|found| found.value))
        };

        let csrf_token = find("_csrfToken", r#"name="_csrfToken"[^>]*value="([^"]+)""#)?
            .ok_or(GateKeyError::FormDataIncomplete("_csrfToken"))?;
        let ad_form_data = find("ad_form_data", r#"name="ad_form_data"[^>]*value="([^"]+)""#)?
            .ok_or(GateKeyError::FormDataIncomplete("ad_form_data"))?;
        let token_fields =
            find("_Token[fields]", r#"name="_Token\[fields\]"[^>]*value="([^"]+)""#)?
                .unwrap_or_default();
        let token_unlocked =
            find("_Token[unlocked]", r#"name="_Token\[unlocked\]"[^>]*value="([^"]+)""#)?
                .unwrap_or_default();
        let action = find("action", r#"action="([^"]+)""#)?
            .ok_or(GateKeyError::FormDataIncomplete("action"))?;

        Ok(Self {
            csrf_token,
            ad_form_data,
            token_fields,
            token_unlocked,
            action,
        })
    }

    /// Url-encoded POST body
    pub fn body(&self) -> String {
        // `_Token[fields]` is already percent-encoded in the markup
        format!(
            "_method=POST&_csrfToken={}&ad_form_data={}&_Token%5Bfields%5D={}&_Token%5Bunlocked%5D={}",
            encode(&self.csrf_token),
            encode(&self.ad_form_data),
            self.token_fields,
            encode(&self.token_unlocked),
        )
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    status: Option<String>,
    message: Option<String>,
    url: Option<String>,
}

/// Resolver for lksfy URLs
pub struct LksfyResolver {
    host: String,
    cooldown: Cooldown,
}

impl LksfyResolver {
    pub fn new(endpoints: &Endpoints, cooldown: Cooldown) -> Self {
        Self {
            host: endpoints.lksfy_host.trim_end_matches('/').to_string(),
            cooldown,
        }
    }

    async fn submit(
        &self,
        ctx: &mut ResolutionContext,
        form: &FormSnapshot,
    ) -> Result<SubmitResponse, GateKeyError> {
        let post_url = format!("{}{}", self.host, form.action);
        let referer = format!("{}/", self.host);

        ctx.clear_cookies();
        ctx.set_cookie("csrfToken", &form.csrf_token);
        ctx.set_referer(Some(referer.as_str()));

        debug!("lksfy submit -> {}", post_url);
        let response = ctx
            .request(Method::POST, &post_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header("x-requested-with", "XMLHttpRequest")
            .body(form.body())
            .send()
            .await?;
        let status = response.status();
        debug!("lksfy submit status: {}", status);

        if !status.is_success() {
            return Err(GateKeyError::UnexpectedStatus {
                stage: "lksfy submit",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl ProviderResolver for LksfyResolver {
    fn provider(&self) -> Provider {
        Provider::Lksfy
    }

    async fn resolve(
        &self,
        ctx: &mut ResolutionContext,
        key_url: &str,
    ) -> Result<Resolved, GateKeyError> {
        let alias = last_path_segment(key_url)?;
        info!("Extracted alias: {}", alias);

        ctx.set_referer(Some(key_url));
        let landing = ctx.redirect_target(key_url, "lksfy first hop").await?;
        if is_messaging_deep_link(&landing) {
            return Ok(Resolved::ExternalAction { deep_link: landing });
        }

        ctx.set_referer(Some(landing.as_str()));
        let page = ctx.fetch_page(key_url, "lksfy page").await?;
        let payload = payload_rules()?
            .first_match(&page)
            .ok_or(GateKeyError::Base64NotFound)?;
        debug!("Found base64 payload ({} chars)", payload.value.len());

        let material = CipherMaterial::derive(&alias);
        let fragment = material.decrypt(&payload.value)?;
        let form = FormSnapshot::scrape(&fragment)?;
        debug!("Form action: {}", form.action);

        self.cooldown.wait().await;

        let response = self.submit(ctx, &form).await?;
        if response.status.as_deref() != Some("success") {
            return Err(GateKeyError::UpstreamRejected(
                response
                    .message
                    .unwrap_or_else(|| "no message".to_string()),
            ));
        }

        let encrypted = response.url.ok_or_else(|| {
            GateKeyError::KeyNotFound("submission succeeded without url".to_string())
        })?;
        let final_url = material.decrypt(&encrypted)?;
        debug!("Final URL: {}", final_url);

        if is_messaging_deep_link(&final_url) {
            return Ok(Resolved::ExternalAction {
                deep_link: final_url,
            });
        }

        let key = query_param(&final_url, "key")?
            .ok_or_else(|| GateKeyError::KeyNotFound(format!("no key parameter in {}", final_url)))?;
        info!("Extracted key: {}", key);
        Ok(Resolved::Key(key))
    }
}
