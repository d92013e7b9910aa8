//! The API client.
//!
//! `ApiClient` is the registry for transaction entities: it resolves
//! service names, constructs and signs requests, tracks each spawned
//! transaction, deregisters it when its completion event arrives, and
//! cancels everything left at shutdown.

use crate::error::{ApiError, Result};
use crate::request::{ApiRequest, Credentials};
use crate::services::ServiceResolver;
use crate::transaction::ApiTransaction;
use crate::transport::{HttpContext, HttpTransport, Transport};
use parking_lot::RwLock;
use peerkit_infra_common::lifecycle::{CompletionEvent, EntityRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint for the remote API, e.g. `https://api.example.com`
    pub endpoint: String,
    /// Per-request timeout applied by the HTTP transport
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: "https://api.example.com".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

/// Authenticated API client tracking its in-flight transactions.
pub struct ApiClient {
    credentials: RwLock<Credentials>,
    services: Arc<ServiceResolver>,
    transactions: EntityRegistry<ApiTransaction>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("active_transactions", &self.transactions.len())
            .field("services_valid", &self.services.valid())
            .finish()
    }
}

impl ApiClient {
    /// Create a client backed by the bundled HTTP transport.
    ///
    /// Builds the TLS-capable HTTP context once. Must be called from
    /// within a Tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let context = Arc::new(HttpContext::new(config.request_timeout)?);
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(context));
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let services = Arc::new(ServiceResolver::new(
            config.endpoint.clone(),
            Arc::clone(&transport),
        ));
        ApiClient {
            credentials: RwLock::new(Credentials::default()),
            services,
            transactions: EntityRegistry::new(),
            transport,
        }
    }

    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        let mut credentials = self.credentials.write();
        credentials.username = username.into();
        credentials.password = password.into();
    }

    /// The service resolver backing this client.
    pub fn services(&self) -> &Arc<ServiceResolver> {
        &self.services
    }

    /// Fetch (or refresh) the service descriptor set.
    ///
    /// In whiny mode a fetch failure propagates; otherwise it is logged
    /// and swallowed. Either way the return value reports whether a
    /// usable descriptor set is now cached.
    pub async fn load_services(&self, whiny: bool) -> Result<bool> {
        match self.services.fetch().await {
            Ok(()) => {}
            Err(e) if whiny => return Err(e),
            Err(e) => tracing::debug!(error = %e, "descriptor fetch failed"),
        }
        Ok(self.services.valid())
    }

    /// Resolve a service and build the signed request for it.
    pub async fn create_request(
        &self,
        service: &str,
        format: &str,
        params: &HashMap<String, String>,
    ) -> Result<ApiRequest> {
        let descriptor = self.services.resolve(service, format, params).await?;
        let credentials = self.credentials.read().clone();
        let mut request = ApiRequest::from_service(descriptor);
        request.prepare(&credentials);
        Ok(request)
    }

    /// Resolve, build and dispatch a call to a named service.
    ///
    /// Resolution may touch the network (implicit descriptor refresh);
    /// the call itself is dispatched asynchronously and this method
    /// returns as soon as the transaction is tracked.
    pub async fn call(
        &self,
        service: &str,
        format: &str,
        params: &HashMap<String, String>,
    ) -> Result<Arc<ApiTransaction>> {
        let request = self.create_request(service, format, params).await?;
        self.call_request(request)
    }

    /// Dispatch a pre-built request as a tracked transaction.
    ///
    /// Never blocks on network I/O; returns a non-owning handle. The
    /// transaction removes itself from the client when it completes,
    /// fails or is cancelled.
    pub fn call_request(&self, request: ApiRequest) -> Result<Arc<ApiTransaction>> {
        let transaction = ApiTransaction::new(request);
        self.dispatch(&transaction)?;
        Ok(transaction)
    }

    /// Track and dispatch an already constructed transaction.
    ///
    /// Lets callers subscribe to the transaction's domain events before
    /// anything is put on the wire. A transaction whose id is already
    /// tracked is refused. A transaction cancelled before this call is
    /// tracked and immediately deregistered through its completion
    /// event, never left behind in the registry.
    pub fn dispatch(&self, transaction: &Arc<ApiTransaction>) -> Result<()> {
        let notifier = self
            .transactions
            .track(Arc::clone(transaction))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        transaction.bind_notifier(notifier);
        transaction.spawn(Arc::clone(&self.transport));
        tracing::debug!(transaction = %transaction.id(), "transaction dispatched");
        Ok(())
    }

    /// Number of transactions still tracked.
    pub fn active_transactions(&self) -> usize {
        self.transactions.len()
    }

    /// Subscribe to transaction deregistration events.
    pub fn subscribe_removals(&self) -> broadcast::Receiver<CompletionEvent> {
        self.transactions.subscribe_removals()
    }

    /// Cancel every in-flight transaction and clear the registry.
    ///
    /// Safe to call while transactions are concurrently completing; by
    /// the time it returns no previously tracked transaction will touch
    /// the client again.
    pub fn cancel_all(&self) {
        tracing::debug!("cancelling all transactions");
        self.transactions.cancel_all();
    }
}
