//! HTTP client configuration and per-resolution request state

use crate::error::GateKeyError;
use crate::utils::url::resolve_location;
use reqwest::header::{COOKIE, LOCATION, REFERER};
use reqwest::{redirect, Client, ClientBuilder, Method, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// User agent the upstream gate expects; other agents get undecodable headers
pub const DEFAULT_USER_AGENT: &str = "Dart/3.8 (dart:io)";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy_url: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpClientConfig {
    /// Build a client; `follow_redirects = false` gives a manual-redirect client
    pub fn build_client(&self, follow_redirects: bool) -> Result<Client, GateKeyError> {
        let mut builder = ClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .brotli(true)
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if !follow_redirects {
            builder = builder.redirect(redirect::Policy::none());
        }

        if let Some(proxy_url) = &self.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(builder.build()?)
    }
}

/// Fixed upstream hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Landing page carrying the header-smuggled bootstrap payload
    pub landing_url: String,
    /// First nanolinks hop
    pub nano_first_hop: String,
    /// Second nanolinks hop
    pub nano_second_hop: String,
    /// lksfy host used for form submission
    pub lksfy_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            landing_url: "https://zoo0.pages.dev".to_string(),
            nano_first_hop: "https://nano.tackledsoul.com".to_string(),
            nano_second_hop: "https://vi-music.app".to_string(),
            lksfy_host: "https://lksfy.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every host at one base URL (handy for local mocks)
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            landing_url: base.clone(),
            nano_first_hop: base.clone(),
            nano_second_hop: base.clone(),
            lksfy_host: base,
        }
    }
}

/// Request state owned by exactly one in-flight resolution.
///
/// Cookies and referer set here are attached to every request built from the
/// context. A fresh context is created for each resolution, so nothing leaks
/// between providers or between concurrent callers.
pub struct ResolutionContext {
    client: Client,
    manual: Client,
    cookies: Vec<(String, String)>,
    referer: Option<String>,
}

impl ResolutionContext {
    /// Create a context with its own clients
    pub fn new(config: &HttpClientConfig) -> Result<Self, GateKeyError> {
        Ok(Self {
            client: config.build_client(true)?,
            manual: config.build_client(false)?,
            cookies: Vec::new(),
            referer: None,
        })
    }

    /// Set or replace a cookie
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        match self.cookies.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.cookies.push((name.to_string(), value.to_string())),
        }
    }

    /// Drop all cookies
    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    /// Set the referer for subsequent requests
    pub fn set_referer(&mut self, referer: Option<&str>) {
        self.referer = referer.map(str::to_string);
    }

    /// `Cookie` header value for the current jar, if any
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Request that follows redirects
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.apply(self.client.request(method, url))
    }

    /// GET that does not follow redirects
    pub fn manual_get(&self, url: &str) -> RequestBuilder {
        self.apply(self.manual.get(url))
    }

    /// Issue a manual-redirect GET and return the absolute `location` target.
    /// A `location` header on a non-3xx response is ignored.
    pub async fn redirect_target(
        &self,
        url: &str,
        stage: &'static str,
    ) -> Result<String, GateKeyError> {
        debug!("{} -> {}", stage, url);
        let response = self.manual_get(url).send().await?;
        let status = response.status();
        debug!("{} status: {}", stage, status);

        let location = response
            .headers()
            .get(LOCATION)
            .filter(|_| status.is_redirection())
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(GateKeyError::NoRedirect {
                stage,
                status: status.as_u16(),
            })?;

        resolve_location(url, &location)
    }

    /// GET a page following redirects; non-2xx fails with `UnexpectedStatus`
    pub async fn fetch_page(&self, url: &str, stage: &'static str) -> Result<String, GateKeyError> {
        debug!("{} -> {}", stage, url);
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        debug!("{} status: {}", stage, status);

        if !status.is_success() {
            return Err(GateKeyError::UnexpectedStatus {
                stage,
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(cookie) = self.cookie_header() {
            request = request.header(COOKIE, cookie);
        }
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_config_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.user_agent, "Dart/3.8 (dart:io)");
        assert!(!config.accept_invalid_certs);
        assert!(config.build_client(true).is_ok());
        assert!(config.build_client(false).is_ok());
    }

    #[test]
    fn test_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.landing_url, "https://zoo0.pages.dev");
        assert_eq!(endpoints.lksfy_host, "https://lksfy.com");

        let local = Endpoints::all_at("http://127.0.0.1:1234/");
        assert_eq!(local.nano_first_hop, "http://127.0.0.1:1234");
        assert_eq!(local.lksfy_host, "http://127.0.0.1:1234");
    }

    #[test]
    fn test_cookie_jar() {
        let mut ctx = ResolutionContext::new(&HttpClientConfig::default()).unwrap();
        assert_eq!(ctx.cookie_header(), None);

        ctx.set_cookie("tp", "a");
        ctx.set_cookie("open", "a");
        assert_eq!(ctx.cookie_header().as_deref(), Some("tp=a; open=a"));

        ctx.set_cookie("tp", "b");
        assert_eq!(ctx.cookie_header().as_deref(), Some("tp=b; open=a"));

        ctx.clear_cookies();
        assert_eq!(ctx.cookie_header(), None);
    }

    #[tokio::test]
    async fn test_redirect_target() {
        let mut server = mockito::Server::new_async().await;
        let hop = server
            .mock("GET", "/hop")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .match_header("cookie", "tp=1")
            .match_header("referer", "https://ref.example/")
            .with_status(302)
            .with_header("location", "/next/ID2")
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/flat")
            .with_status(200)
            .create_async()
            .await;

        let mut ctx = ResolutionContext::new(&HttpClientConfig::default()).unwrap();
        ctx.set_cookie("tp", "1");
        ctx.set_referer(Some("https://ref.example/"));

        let target = ctx
            .redirect_target(&format!("{}/hop", server.url()), "test hop")
            .await
            .unwrap();
        assert_eq!(target, format!("{}/next/ID2", server.url()));

        let err = ctx
            .redirect_target(&format!("{}/flat", server.url()), "flat hop")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateKeyError::NoRedirect {
                stage: "flat hop",
                status: 200
            }
        ));

        hop.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn test_location_on_success_is_not_a_redirect() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/landing")
            .with_status(200)
            .with_header("location", "https://x/y?key=SHOULDNOTFOLLOW")
            .with_body("<html>interstitial</html>")
            .create_async()
            .await;
        let _moved = server
            .mock("GET", "/moved")
            .with_status(307)
            .with_header("location", "https://x/y?key=OK")
            .create_async()
            .await;

        let ctx = ResolutionContext::new(&HttpClientConfig::default()).unwrap();
        let err = ctx
            .redirect_target(&format!("{}/landing", server.url()), "landing hop")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateKeyError::NoRedirect {
                stage: "landing hop",
                status: 200
            }
        ));

        let target = ctx
            .redirect_target(&format!("{}/moved", server.url()), "moved hop")
            .await
            .unwrap();
        assert_eq!(target, "https://x/y?key=OK");
    }

    #[tokio::test]
    async fn test_fetch_page_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock1 = server
            .mock("GET", "/ok")
            .match_header("cookie", Matcher::Missing)
            .with_body("<html>ok</html>")
            .create_async()
            .await;
        let _mock2 = server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let ctx = ResolutionContext::new(&HttpClientConfig::default()).unwrap();
        let body = ctx
            .fetch_page(&format!("{}/ok", server.url()), "page")
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");

        let err = ctx
            .fetch_page(&format!("{}/gone", server.url()), "page")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateKeyError::UnexpectedStatus { status: 404, .. }
        ));
    }
}
