//! Builds the resolver stack from settings.

use std::sync::Arc;

use geoscope_bundle::BundleResolver;
use geoscope_config::Settings;
use geoscope_filter::{FilterBuilder, SocrataClient, socrata::DEFAULT_DOMAIN};
use geoscope_geocoder::{GeoclientClient, GeoclientConfig};
use geoscope_resolve::Resolver;
use geoscope_spatial::GeoIndex;

/// Everything a subcommand may need, built once.
pub struct Services {
    pub settings: Settings,
    pub bundles: BundleResolver,
    pub filters: FilterBuilder,
}

impl Services {
    /// Loads the geodata layers and wires up the geocoder when a key is
    /// configured.
    ///
    /// # Errors
    ///
    /// Fails if a geodata source is unset or unreadable, or the geocoder
    /// client cannot be built.
    pub async fn load(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let sources = settings.geo_sources()?;
        let policy = settings.buffer;
        let index = tokio::task::spawn_blocking(move || GeoIndex::load(&sources, policy)).await??;

        let mut resolver = Resolver::new(Arc::new(index));
        if let Some(api_key) = &settings.geoclient.api_key {
            let mut config = GeoclientConfig::new(api_key.clone());
            if let Some(base_url) = &settings.geoclient.base_url {
                config.base_url.clone_from(base_url);
            }
            config.timeout = settings.geoclient.timeout();
            resolver = resolver.with_geocoder(Arc::new(GeoclientClient::new(config)?));
        } else {
            log::warn!("GEOCLIENT_API_KEY not set; address and intersection lookups are disabled");
        }

        let bundles = BundleResolver::new(resolver.clone())
            .with_cache_capacity(settings.cache_capacity)
            .with_workers(settings.workers);
        let filters =
            FilterBuilder::new(resolver).with_limits(settings.limits.rows, settings.limits.preview);

        Ok(Self {
            settings,
            bundles,
            filters,
        })
    }

    /// Dataset service client for the configured portal.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn socrata(&self) -> Result<SocrataClient, Box<dyn std::error::Error>> {
        let socrata = &self.settings.socrata;
        Ok(SocrataClient::new(
            socrata.domain.as_deref().unwrap_or(DEFAULT_DOMAIN),
            socrata.app_token.clone(),
            self.settings.geoclient.timeout(),
        )?)
    }
}
