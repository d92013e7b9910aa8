//! # API-Client - Authenticated Remote Calls for Peerkit
//!
//! An HTTP API client built around tracked transactions. Each call is a
//! lifecycle entity: created, dispatched asynchronously, driven through a
//! small state machine, and deregistered exactly once when it completes,
//! fails, or is cancelled. Service endpoints are resolved against a
//! remotely fetched descriptor set; non-anonymous services get a signed
//! `Authorization` header.

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod services;
pub mod transaction;
pub mod transport;

pub use client::{ApiClient, ClientConfig};
pub use error::{ApiError, Result};
pub use request::{ApiRequest, Credentials};
pub use services::{CacheState, ServiceDescriptor, ServiceResolver, FETCH_TIMEOUT};
pub use transaction::{ApiTransaction, TransactionEvent, TransactionState};
pub use transport::{ApiResponse, HttpContext, HttpTransport, Transport};

// The registry contract for transaction handles.
pub use peerkit_infra_common::lifecycle::{EntityId, EntityOutcome, TrackedEntity};
