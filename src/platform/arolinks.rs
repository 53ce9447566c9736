//! arolinks resolver: scrape a redirect target, then replay the page with
//! referer and cookie set to reveal the key-bearing anchor

use crate::core::outcome::Resolved;
use crate::error::GateKeyError;
use crate::platform::client::ResolutionContext;
use crate::platform::dispatch::{Provider, ProviderResolver};
use crate::utils::extract::{ExtractionRule, Extractor};
use crate::utils::url::{is_messaging_deep_link, last_path_segment, query_param};
use tracing::{debug, info};

const GATE_COOKIE: &str = "gt_uc_";

/// Rules locating the redirect target on the landing page
pub fn redirect_rules() -> Result<Extractor, GateKeyError> {
    Ok(Extractor::new()
        .with_rule(ExtractionRule::new(
            "script-redirect",
            r#"window\.location\.href = "([^"]+)""#,
        )?)
        .with_rule(ExtractionRule::new("anchor", r#"<a href="([^"]+)""#)?))
}

/// Rules locating the final anchor. Each rule is named after the query
/// parameter that holds the key.
pub fn key_anchor_rules() -> Result<Extractor, GateKeyError> {
    Ok(Extractor::new()
        .with_rule(ExtractionRule::new(
            "key",
            r#"nofollow noopener noreferrer" href="(https?://[^"]+key=[^"&]+[^"]*)""#,
        )?)
        .with_rule(ExtractionRule::new(
            "code",
            r#"nofollow noopener noreferrer" href="(https?://[^"]+code=[^"&]+[^"]*)""#,
        )?))
}

/// Resolver for arolinks URLs
pub struct ArolinksResolver;

impl ArolinksResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArolinksResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderResolver for ArolinksResolver {
    fn provider(&self) -> Provider {
        Provider::Arolinks
    }

    async fn resolve(
        &self,
        ctx: &mut ResolutionContext,
        key_url: &str,
    ) -> Result<Resolved, GateKeyError> {
        let identifier = last_path_segment(key_url)?;
        info!("Extracted identifier: {}", identifier);

        let landing = ctx.fetch_page(key_url, "arolinks landing").await?;
        let redirect = redirect_rules()?
            .first_match(&landing)
            .ok_or(GateKeyError::RedirectNotFound)?;
        debug!("Found redirect URL via {}: {}", redirect.rule, redirect.value);

        if is_messaging_deep_link(&redirect.value) {
            return Ok(Resolved::ExternalAction {
                deep_link: redirect.value,
            });
        }

        ctx.set_cookie(GATE_COOKIE, &identifier);
        ctx.set_referer(Some(redirect.value.as_str()));
        let gated = ctx.fetch_page(key_url, "arolinks gated page").await?;

        let anchor = key_anchor_rules()?.first_match(&gated).ok_or_else(|| {
            GateKeyError::KeyNotFound("no key or code anchor in gated page".to_string())
        })?;
        debug!("Found final URL: {}", anchor.value);

        let key = query_param(&anchor.value, anchor.rule)?.ok_or_else(|| {
            GateKeyError::KeyNotFound(format!("no {} parameter in {}", anchor.rule, anchor.value))
        })?;
        info!("Extracted {} as key: {}", anchor.rule, key);
        Ok(Resolved::Key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::client::HttpClientConfig;
    use mockito::Matcher;

    fn context() -> ResolutionContext {
        ResolutionContext::new(&HttpClientConfig::default()).unwrap()
    }

    fn gated_anchor(href: &str) -> String {
        format!(
            r#"<div><a class="btn" target="_blank" rel="nofollow noopener noreferrer" href="{}">Get Link</a></div>"#,
            href
        )
    }

    async fn serve(
        server: &mut mockito::ServerGuard,
        landing: &str,
        referer: &str,
        gated: &str,
    ) -> (mockito::Mock, mockito::Mock) {
        let first = server
            .mock("GET", "/AbC123")
            .match_header("cookie", Matcher::Missing)
            .with_body(landing)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/AbC123")
            .match_header("cookie", "gt_uc_=AbC123")
            .match_header("referer", referer)
            .with_body(gated)
            .create_async()
            .await;
        (first, second)
    }

    #[test]
    fn test_redirect_rules_order() {
        let rules = redirect_rules().unwrap();
        let names: Vec<_> = rules.rules().iter().map(|rule| rule.name()).collect();
        assert_eq!(names, vec!["script-redirect", "anchor"]);
    }

    #[tokio::test]
    async fn test_script_redirect_and_key_anchor() {
        let mut server = mockito::Server::new_async().await;
        let landing = r#"<script>window.location.href = "https://blog.example/step";</script>
            <a href="https://ads.example/">ad</a>"#;
        let gated = gated_anchor("https://generateed.pages.dev/?key=AROKEY&src=aro");
        let (first, second) = serve(&mut server, landing, "https://blog.example/step", &gated).await;

        let resolved = ArolinksResolver::new()
            .resolve(&mut context(), &format!("{}/AbC123", server.url()))
            .await
            .unwrap();

        assert_eq!(resolved, Resolved::Key("AROKEY".to_string()));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_anchor_redirect_fallback() {
        let mut server = mockito::Server::new_async().await;
        let landing = r#"<p>continue</p><a href="https://blog.example/anchor">next</a>"#;
        let gated = gated_anchor("https://generateed.pages.dev/?key=FROMANCHOR");
        let (_first, second) = serve(&mut server, landing, "https://blog.example/anchor", &gated).await;

        let resolved = ArolinksResolver::new()
            .resolve(&mut context(), &format!("{}/AbC123", server.url()))
            .await
            .unwrap();

        assert_eq!(resolved, Resolved::Key("FROMANCHOR".to_string()));
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_code_anchor_fallback() {
        let mut server = mockito::Server::new_async().await;
        let landing = r#"<script>window.location.href = "https://blog.example/step";</script>"#;
        let gated = gated_anchor("https://verify.example/check?code=CODE77&x=1");
        let _mocks = serve(&mut server, landing, "https://blog.example/step", &gated).await;

        let resolved = ArolinksResolver::new()
            .resolve(&mut context(), &format!("{}/AbC123", server.url()))
            .await
            .unwrap();

        assert_eq!(resolved, Resolved::Key("CODE77".to_string()));
    }

    #[tokio::test]
    async fn test_redirect_not_found() {
        let mut server = mockito::Server::new_async().await;
        let gated_page = server
            .mock("GET", "/AbC123")
            .match_header("cookie", "gt_uc_=AbC123")
            .expect(0)
            .create_async()
            .await;
        let _mock1 = server
            .mock("GET", "/AbC123")
            .match_header("cookie", Matcher::Missing)
            .with_body("<p>nothing to follow</p>")
            .create_async()
            .await;

        let err = ArolinksResolver::new()
            .resolve(&mut context(), &format!("{}/AbC123", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, GateKeyError::RedirectNotFound));
        gated_page.assert_async().await;
    }

    #[tokio::test]
    async fn test_key_not_found() {
        let mut server = mockito::Server::new_async().await;
        let landing = r#"<a href="https://blog.example/anchor">next</a>"#;
        // anchor lacks the rel attributes the gate emits
        let gated = r#"<a href="https://generateed.pages.dev/?key=NOPE">x</a>"#;
        let _mocks = serve(&mut server, landing, "https://blog.example/anchor", gated).await;

        let err = ArolinksResolver::new()
            .resolve(&mut context(), &format!("{}/AbC123", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, GateKeyError::KeyNotFound(_)));
    }
}
