use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::GatewayError;

/// HTTP client for reissuing requests against upstream relays.
///
/// One pooled client serves both buffered and streaming reads; the caller
/// decides how to consume the response body. There is no retry here: the
/// failover walk is the only retry mechanism, and an inner retry would
/// change the attempt accounting it relies on.
pub struct HttpTransport {
    client: OnceLock<Arc<reqwest::Client>>,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Duration,
}

impl HttpTransport {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };
        Self {
            client: OnceLock::new(),
            pool_max_idle_per_host: config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            timeout: Duration::from_secs(config.timeout),
        }
    }

    fn build_client(&self) -> Result<reqwest::Client, GatewayError> {
        reqwest::Client::builder()
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.timeout)
            .build()
            .map_err(|err| GatewayError::Transport(format!("Failed to build HTTP client: {err}")))
    }

    fn client(&self) -> Arc<reqwest::Client> {
        if let Some(existing) = self.client.get() {
            return existing.clone();
        }
        let built = match self.build_client() {
            Ok(client) => Arc::new(client),
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured HTTP client, falling back to default");
                Arc::new(reqwest::Client::new())
            }
        };
        let _ = self.client.set(built.clone());
        self.client.get().cloned().unwrap_or(built)
    }

    /// Perform one upstream request. The returned response is untouched;
    /// status interpretation and body consumption are the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the URL is invalid or the
    /// request fails at the network level.
    pub async fn send(
        &self,
        method: http::Method,
        url: &str,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, GatewayError> {
        self.client()
            .request(method, url)
            .headers(headers.clone())
            .body(body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_lazy() {
        let transport = HttpTransport::new(&ServerConfig::default());
        assert!(transport.client.get().is_none());
        let _ = transport.client();
        assert!(transport.client.get().is_some());
    }

    #[test]
    fn test_zero_idle_timeout_disables_expiry() {
        let transport = HttpTransport::new(&ServerConfig {
            http_pool_idle_timeout_secs: 0,
            ..ServerConfig::default()
        });
        assert!(transport.pool_idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_transport_error() {
        let transport = HttpTransport::new(&ServerConfig::default());
        let err = transport
            .send(
                http::Method::GET,
                "not-a-url",
                &http::HeaderMap::new(),
                bytes::Bytes::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
