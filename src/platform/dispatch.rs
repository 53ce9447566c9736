//! Provider classification and routing

use crate::core::cooldown::Cooldown;
use crate::core::outcome::Resolved;
use crate::error::GateKeyError;
use crate::platform::arolinks::ArolinksResolver;
use crate::platform::client::{Endpoints, ResolutionContext};
use crate::platform::lksfy::LksfyResolver;
use crate::platform::nanolinks::NanolinksResolver;
use serde::Serialize;
use tracing::info;

/// Supported link gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Nanolinks,
    Arolinks,
    Lksfy,
}

impl Provider {
    /// Providers in classification priority order
    pub fn all() -> [Provider; 3] {
        [Provider::Nanolinks, Provider::Arolinks, Provider::Lksfy]
    }

    /// Substring identifying the provider in a key URL
    pub fn marker(&self) -> &'static str {
        match self {
            Provider::Nanolinks => "nanolinks",
            Provider::Arolinks => "arolinks",
            Provider::Lksfy => "lksfy",
        }
    }

    /// Domain label used in reports
    pub fn domain(&self) -> &'static str {
        self.marker()
    }
}

/// Classification of a key URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderHint {
    Known(Provider),
    /// No marker matched
    Unknown,
}

impl ProviderHint {
    /// Classify a key URL; the first marker in priority order wins
    pub fn classify(key_url: &str) -> Self {
        Provider::all()
            .into_iter()
            .find(|provider| key_url.contains(provider.marker()))
            .map(ProviderHint::Known)
            .unwrap_or(ProviderHint::Unknown)
    }

    /// Provider that handles this hint. Unknown shapes go to nanolinks.
    pub fn provider(self) -> Provider {
        match self {
            ProviderHint::Known(provider) => provider,
            ProviderHint::Unknown => Provider::Nanolinks,
        }
    }
}

/// A provider-specific resolution flow
#[async_trait::async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Provider this resolver handles
    fn provider(&self) -> Provider;

    /// Run the flow for `key_url` using request state owned by `ctx`
    async fn resolve(
        &self,
        ctx: &mut ResolutionContext,
        key_url: &str,
    ) -> Result<Resolved, GateKeyError>;
}

/// Routes key URLs to resolvers
pub struct Dispatcher {
    nanolinks: Box<dyn ProviderResolver>,
    arolinks: Box<dyn ProviderResolver>,
    lksfy: Box<dyn ProviderResolver>,
}

impl Dispatcher {
    /// Dispatcher with the built-in resolvers
    pub fn new(endpoints: &Endpoints, cooldown: Cooldown) -> Self {
        Self {
            nanolinks: Box::new(NanolinksResolver::new(endpoints)),
            arolinks: Box::new(ArolinksResolver::new()),
            lksfy: Box::new(LksfyResolver::new(endpoints, cooldown)),
        }
    }

    /// Replace the resolver for its provider
    pub fn with_resolver(mut self, resolver: Box<dyn ProviderResolver>) -> Self {
        match resolver.provider() {
            Provider::Nanolinks => self.nanolinks = resolver,
            Provider::Arolinks => self.arolinks = resolver,
            Provider::Lksfy => self.lksfy = resolver,
        }
        self
    }

    /// Pick the resolver for a key URL
    pub fn route(&self, key_url: &str) -> &dyn ProviderResolver {
        let hint = ProviderHint::classify(key_url);
        let provider = hint.provider();
        match hint {
            ProviderHint::Known(_) => info!("Detected {} domain", provider.domain()),
            ProviderHint::Unknown => info!(
                "Unknown domain, using {} resolver as fallback",
                provider.domain()
            ),
        }

        match provider {
            Provider::Nanolinks => self.nanolinks.as_ref(),
            Provider::Arolinks => self.arolinks.as_ref(),
            Provider::Lksfy => self.lksfy.as_ref(),
        }
    }
}
