//! Outbound request descriptors.

use crate::auth::generate_auth_header;
use crate::services::ServiceDescriptor;
use chrono::Utc;

/// Account credentials used to sign non-anonymous requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// A fully described outbound request: method, target URI, headers and an
/// optional body. When built from a [`ServiceDescriptor`] the descriptor
/// travels along so completion events can name the service.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub service: Option<ServiceDescriptor>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        ApiRequest {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            body: None,
            service: None,
        }
    }

    /// Build a request from a resolved service descriptor.
    pub fn from_service(service: ServiceDescriptor) -> Self {
        let mut request = ApiRequest::new(service.method.clone(), service.uri.clone());
        request.service = Some(service);
        request
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            existing.1 = value;
        } else {
            self.headers.push((name.to_string(), value));
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Finalize the request for dispatch.
    ///
    /// Sets `User-Agent` and `Date`, defaults `Content-Type` for POST and
    /// PUT, and attaches a signed `Authorization` header unless the
    /// underlying service is anonymous.
    pub fn prepare(&mut self, credentials: &Credentials) {
        self.set_header(
            "User-Agent",
            concat!("peerkit-api-client/", env!("CARGO_PKG_VERSION")),
        );

        if self.header("Date").is_none() {
            let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
            self.set_header("Date", date);
        }

        let method = self.method.to_ascii_uppercase();
        if (method == "POST" || method == "PUT") && self.header("Content-Type").is_none() {
            self.set_header("Content-Type", "application/json");
        }

        let anonymous = self.service.as_ref().map(|s| s.anonymous).unwrap_or(true);
        if !anonymous {
            let content_type = self.header("Content-Type").unwrap_or("").to_string();
            let date = self.header("Date").unwrap_or("").to_string();
            let authorization = generate_auth_header(
                &credentials.username,
                &credentials.password,
                &self.method,
                &self.uri,
                &content_type,
                &date,
            );
            self.set_header("Authorization", authorization);
            tracing::debug!(uri = %self.uri, "request signed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(anonymous: bool) -> ServiceDescriptor {
        ServiceDescriptor {
            name: "GetAccount".into(),
            method: "GET".into(),
            uri: "/account/1/json".into(),
            anonymous,
        }
    }

    #[test]
    fn prepare_signs_non_anonymous_requests() {
        let mut request = ApiRequest::from_service(descriptor(false));
        request.prepare(&Credentials::new("alice", "secret"));
        assert!(request.header("Authorization").is_some());
        assert!(request.header("Date").is_some());
        assert!(request.header("User-Agent").is_some());
    }

    #[test]
    fn prepare_leaves_anonymous_requests_unsigned() {
        let mut request = ApiRequest::from_service(descriptor(true));
        request.prepare(&Credentials::default());
        assert!(request.header("Authorization").is_none());
    }

    #[test]
    fn post_requests_default_their_content_type() {
        let mut request = ApiRequest::new("POST", "/events");
        request.prepare(&Credentials::default());
        assert_eq!(request.header("Content-Type"), Some("application/json"));

        let mut request = ApiRequest::new("GET", "/events");
        request.prepare(&Credentials::default());
        assert_eq!(request.header("Content-Type"), None);
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut request = ApiRequest::new("GET", "/");
        request.set_header("content-type", "text/plain");
        request.set_header("Content-Type", "application/json");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    }
}
