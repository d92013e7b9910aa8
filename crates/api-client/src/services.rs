//! Service descriptor resolution.
//!
//! Descriptors are fetched from `<endpoint>/services.json` as a JSON
//! array and cached. Resolution substitutes the `:format` suffix and any
//! named path placeholders by exact-match string replacement.

use crate::error::{ApiError, Result};
use crate::request::ApiRequest;
use crate::transport::Transport;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Bound on a single descriptor fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata describing how to call one named remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub method: String,
    /// URI template with a `:format` suffix and named `:placeholder`s
    pub uri: String,
    #[serde(default)]
    pub anonymous: bool,
}

impl ServiceDescriptor {
    /// Substitute the `:format` placeholder.
    pub fn apply_format(&mut self, format: &str) {
        self.uri = self.uri.replace(":format", format);
    }

    /// Substitute named placeholders by exact-match replacement.
    ///
    /// Keys carry their leading `:`, e.g. `":id" -> "42"`.
    pub fn interpolate(&mut self, params: &HashMap<String, String>) {
        for (placeholder, value) in params {
            self.uri = self.uri.replace(placeholder.as_str(), value);
        }
    }
}

/// State of the descriptor cache.
///
/// An empty-but-successful fetch is deliberately distinct from a fetch
/// that never succeeded: `Empty` means the remote answered with zero
/// services, `Unfetched` means we have nothing trustworthy at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Unfetched,
    Empty,
    Loaded(Vec<ServiceDescriptor>),
}

/// Resolves symbolic service names into concrete request descriptors.
pub struct ServiceResolver {
    endpoint: String,
    transport: Arc<dyn Transport>,
    cache: RwLock<CacheState>,
}

impl std::fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResolver")
            .field("endpoint", &self.endpoint)
            .field("valid", &self.valid())
            .finish()
    }
}

impl ServiceResolver {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        ServiceResolver {
            endpoint: endpoint.into(),
            transport,
            cache: RwLock::new(CacheState::Unfetched),
        }
    }

    /// Seed the cache directly, bypassing the remote fetch.
    ///
    /// Intended for tests and offline operation.
    pub fn preload(&self, descriptors: Vec<ServiceDescriptor>) {
        let mut cache = self.cache.write();
        *cache = if descriptors.is_empty() {
            CacheState::Empty
        } else {
            CacheState::Loaded(descriptors)
        };
    }

    /// Fetch and cache the descriptor set, bounded by [`FETCH_TIMEOUT`].
    pub async fn fetch(&self) -> Result<()> {
        let uri = format!("{}/services.json", self.endpoint);
        tracing::debug!(%uri, "fetching service descriptors");
        let request = ApiRequest::new("GET", uri);

        let response = tokio::time::timeout(FETCH_TIMEOUT, self.transport.execute(&request))
            .await
            .map_err(|_| ApiError::Network("service descriptor fetch timed out".into()))??;

        if !response.is_success() {
            return Err(ApiError::Network(format!(
                "descriptor fetch failed with status {}",
                response.status
            )));
        }

        let descriptors: Vec<ServiceDescriptor> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Network(format!("malformed descriptor document: {}", e)))?;

        tracing::debug!(count = descriptors.len(), "service descriptors cached");
        let mut cache = self.cache.write();
        *cache = if descriptors.is_empty() {
            CacheState::Empty
        } else {
            CacheState::Loaded(descriptors)
        };
        Ok(())
    }

    /// Whether a non-empty descriptor set is cached.
    pub fn valid(&self) -> bool {
        matches!(*self.cache.read(), CacheState::Loaded(_))
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.read().clone()
    }

    /// Resolve a service by name, substituting format and parameters.
    ///
    /// Triggers an implicit [`fetch`](Self::fetch) when the cache is not
    /// valid; if the refresh also fails to produce a usable set the call
    /// fails with [`ApiError::DescriptorUnavailable`].
    pub async fn resolve(
        &self,
        name: &str,
        format: &str,
        params: &HashMap<String, String>,
    ) -> Result<ServiceDescriptor> {
        if !self.valid() {
            if let Err(e) = self.fetch().await {
                tracing::debug!(error = %e, "implicit descriptor refresh failed");
            }
        }

        let cache = self.cache.read();
        let descriptors = match &*cache {
            CacheState::Loaded(descriptors) => descriptors,
            CacheState::Unfetched | CacheState::Empty => {
                return Err(ApiError::DescriptorUnavailable)
            }
        };

        let mut service = descriptors
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| ApiError::UnknownService(name.to_string()))?;

        service.apply_format(format);
        service.interpolate(params);
        tracing::debug!(service = %service.name, uri = %service.uri, "service resolved");
        Ok(service)
    }
}
