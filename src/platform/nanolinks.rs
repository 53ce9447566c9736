//! nanolinks resolver: a two-hop cookie-gated redirect chain

use crate::core::outcome::Resolved;
use crate::error::GateKeyError;
use crate::platform::client::{Endpoints, ResolutionContext};
use crate::platform::dispatch::{Provider, ProviderResolver};
use crate::utils::url::{is_messaging_deep_link, last_path_segment, query_param};
use tracing::{debug, info};
use url::Url;

const OPEN_PATH: &str = "/includes/open.php";

/// Resolver for nanolinks URLs
pub struct NanolinksResolver {
    first_hop: String,
    second_hop: String,
}

impl NanolinksResolver {
    pub fn new(endpoints: &Endpoints) -> Self {
        Self {
            first_hop: endpoints.nano_first_hop.trim_end_matches('/').to_string(),
            second_hop: endpoints.nano_second_hop.trim_end_matches('/').to_string(),
        }
    }

    /// Hit `open.php` on `host` with the id as query and cookies; return the redirect target
    async fn hop(
        &self,
        ctx: &mut ResolutionContext,
        host: &str,
        id: &str,
        stage: &'static str,
    ) -> Result<String, GateKeyError> {
        let mut url = Url::parse(&format!("{}{}", host, OPEN_PATH))?;
        url.query_pairs_mut().append_pair("id", id);

        ctx.clear_cookies();
        ctx.set_cookie("tp", id);
        ctx.set_cookie("open", id);

        let target = ctx.redirect_target(url.as_str(), stage).await?;
        debug!("{} redirect: {}", stage, target);
        Ok(target)
    }
}

#[async_trait::async_trait]
impl ProviderResolver for NanolinksResolver {
    fn provider(&self) -> Provider {
        Provider::Nanolinks
    }

    async fn resolve(
        &self,
        ctx: &mut ResolutionContext,
        key_url: &str,
    ) -> Result<Resolved, GateKeyError> {
        let id = last_path_segment(key_url)?;
        info!("Extracted ID from URL: {}", id);

        let first = self
            .hop(ctx, &self.first_hop, &id, "nanolinks first hop")
            .await?;
        if is_messaging_deep_link(&first) {
            return Ok(Resolved::ExternalAction { deep_link: first });
        }

        let new_id = last_path_segment(&first)?;
        info!("Extracted new ID: {}", new_id);

        let second = self
            .hop(ctx, &self.second_hop, &new_id, "nanolinks second hop")
            .await?;
        if is_messaging_deep_link(&second) {
            return Ok(Resolved::ExternalAction { deep_link: second });
        }

        let key = query_param(&second, "key")?.ok_or_else(|| {
            GateKeyError::KeyNotFound(format!("no key parameter in {}", second))
        })?;
        info!("Extracted key from nanolinks: {}", key);
        Ok(Resolved::Key(key))
    }
}
