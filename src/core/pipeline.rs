//! End-to-end key resolution
//!
//! A [`Pipeline`] runs one linear chain per call: discover the API base URL from
//! the landing page, ask it for a fresh `keyUrl`, route that URL to a provider
//! resolver and run the resolver with its own request state. Nothing is shared
//! between calls, so a single pipeline can serve concurrent callers.

use crate::core::cooldown::Cooldown;
use crate::core::outcome::{ResolutionOutcome, ResolutionReport, ResolveRequest};
use crate::error::GateKeyError;
use crate::platform::bootstrap::Bootstrapper;
use crate::platform::client::{Endpoints, HttpClientConfig, ResolutionContext};
use crate::platform::dispatch::Dispatcher;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Key resolution pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: HttpClientConfig,
    endpoints: Endpoints,
    cooldown: Cooldown,
}

impl Pipeline {
    /// Create a pipeline against the production hosts
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Override the user agent sent on every request
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Route all traffic through a proxy
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy_url = Some(proxy_url.into());
        self
    }

    /// Skip TLS certificate verification
    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.config.accept_invalid_certs = insecure;
        self
    }

    /// Replace the upstream hosts
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the wait observed before the lksfy form submission
    pub fn with_cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Discover the base URL and fetch a fresh key URL from it
    pub async fn key_url(&self) -> Result<String, GateKeyError> {
        let bootstrapper = Bootstrapper::new(&self.config, &self.endpoints)?;
        let base_url = bootstrapper.discover_base_url().await?;
        bootstrapper.fetch_key_url(&base_url).await
    }

    /// Run one full resolution
    pub async fn run(&self) -> ResolutionOutcome {
        let key_url = match self.key_url().await {
            Ok(key_url) => key_url,
            Err(err) => {
                error!("Failed to obtain keyUrl: {}", err);
                return ResolutionOutcome::Failure(err);
            }
        };

        let dispatcher = Dispatcher::new(&self.endpoints, self.cooldown);
        let resolver = dispatcher.route(&key_url);
        let provider = resolver.provider();

        let result = match ResolutionContext::new(&self.config) {
            Ok(mut ctx) => resolver.resolve(&mut ctx, &key_url).await,
            Err(err) => Err(err),
        };

        let outcome = ResolutionOutcome::from_resolver(provider, result);
        match &outcome {
            ResolutionOutcome::Key { key, provider } => {
                info!("Resolved key via {}: {}", provider.domain(), key)
            }
            ResolutionOutcome::RequiresExternalAction {
                provider,
                deep_link,
            } => warn!(
                "{} requires interaction outside the pipeline: {}",
                provider.domain(),
                deep_link
            ),
            ResolutionOutcome::Failure(err) => error!("{} resolution failed: {}", provider.domain(), err),
        }
        outcome
    }

    /// Boundary entry point: always produces a report
    pub async fn handle(&self, request: &ResolveRequest) -> ResolutionReport {
        if let Some(url) = &request.url {
            debug!("Request url {} ignored, routing follows the discovered keyUrl", url);
        }
        self.run().await.into_report()
    }
}
