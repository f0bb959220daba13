//! reqwest-backed `HttpClient` for native hosts
//!
//! Available behind the `native-http` feature. Web hosts implement the
//! bridge over `fetch` instead; the provider itself never assumes either.

use async_trait::async_trait;

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};

/// `HttpClient` implementation over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (key.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("HTTP body read failed: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
