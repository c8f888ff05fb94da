//! Configuration for the HTTP transport.

use std::time::Duration;

/// Configuration for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Service root, e.g. `https://demo.cytomine.com`.
    pub base_url: String,
    /// Prefix between the root and resource paths.
    pub api_prefix: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl HttpConfig {
    /// Creates a configuration for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: "/api/".into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("cytomine-rs/{}", env!("CARGO_PKG_VERSION")),
            headers: Vec::new(),
        }
    }

    /// Sets the API prefix.
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a default header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Joins the base URL, the API prefix and `path`.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{prefix}/{path}")
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
